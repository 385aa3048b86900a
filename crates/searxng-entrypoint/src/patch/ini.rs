//! Line-preserving INI document used to edit the uWSGI configuration.
//!
//! Only assignments that are explicitly set change; comments, blank lines,
//! ordering and unrelated options survive untouched.

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct IniDocument {
    lines: Vec<String>,
    trailing_newline: bool,
}

impl IniDocument {
    pub(crate) fn parse(text: &str) -> Self {
        Self {
            lines: text.lines().map(str::to_owned).collect(),
            trailing_newline: text.is_empty() || text.ends_with('\n'),
        }
    }

    /// Returns the value of the last assignment to `key` inside `section`.
    pub(crate) fn get(&self, section: &str, key: &str) -> Option<&str> {
        let mut current: Option<&str> = None;
        let mut found = None;
        for line in &self.lines {
            if let Some(name) = section_name(line) {
                current = Some(name);
                continue;
            }
            if current == Some(section) {
                if let Some(value) = assignment_value(line, key) {
                    found = Some(value);
                }
            }
        }
        found
    }

    /// Assigns `value` to every occurrence of `key` inside `section`.
    ///
    /// When the key is absent it is added after the last option of the
    /// section; when the section is absent it is appended to the document.
    pub(crate) fn set(&mut self, section: &str, key: &str, value: &str) {
        let rendered = format!("{key} = {value}");
        let mut current: Option<String> = None;
        let mut replaced = false;
        let mut insert_at: Option<usize> = None;

        for (index, line) in self.lines.iter_mut().enumerate() {
            if let Some(name) = section_name(line) {
                current = Some(name.to_owned());
                if name == section {
                    insert_at = Some(index + 1);
                }
                continue;
            }
            if current.as_deref() != Some(section) {
                continue;
            }
            if assignment_value(line, key).is_some() {
                line.clone_from(&rendered);
                replaced = true;
            }
            if !is_blank_or_comment(line) {
                insert_at = Some(index + 1);
            }
        }

        if replaced {
            return;
        }
        match insert_at {
            Some(index) => self.lines.insert(index, rendered),
            None => {
                if self.lines.last().is_some_and(|line| !line.trim().is_empty()) {
                    self.lines.push(String::new());
                }
                self.lines.push(format!("[{section}]"));
                self.lines.push(rendered);
            }
        }
    }

    pub(crate) fn render(&self) -> String {
        let mut output = self.lines.join("\n");
        if self.trailing_newline && !self.lines.is_empty() {
            output.push('\n');
        }
        output
    }
}

fn section_name(line: &str) -> Option<&str> {
    line.trim()
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .map(str::trim)
}

fn is_blank_or_comment(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';')
}

fn assignment_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    if is_blank_or_comment(line) {
        return None;
    }
    let (name, value) = line.split_once('=')?;
    (name.trim() == key).then(|| value.trim())
}
