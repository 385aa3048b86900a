//! Structured patching of the SearXNG `settings.yml`.
//!
//! The document is loaded into an insertion-ordered mapping, the fields
//! driven by the environment are set, and the mapping is serialised back.
//! The result proxy block is appended as text after the serialised document
//! because its key carries the YAML `!!binary` tag, which a plain mapping
//! cannot express.
//!
//! Comments in the operator's file are not preserved: the serialised
//! document carries only keys and values.

use std::path::{Path, PathBuf};

use entrypoint_config::{ResultProxy, SettingsValues};
use serde_json::{Map, Value};
use tracing::debug;

use super::secret::{SECRET_KEY_PLACEHOLDER, generate_secret_key};
use super::{PatchError, Patcher, read_document, write_document};

const ROOT: &str = "<root>";
const RESULT_PROXY: &str = "result_proxy";
pub(crate) const RESULT_PROXY_MARKER: &str = "# Morty configuration";

/// Substitutes environment-driven values into `settings.yml`.
#[derive(Debug, Clone, Copy)]
pub struct SettingsPatcher<'a> {
    values: &'a SettingsValues,
}

impl<'a> SettingsPatcher<'a> {
    /// Builds a patcher over the resolved settings values.
    #[must_use]
    pub const fn new(values: &'a SettingsValues) -> Self {
        Self { values }
    }
}

impl Patcher for SettingsPatcher<'_> {
    fn patch(&self, path: &Path) -> Result<(), PatchError> {
        let text = read_document(path)?;
        let patched = apply(&text, self.values, generate_secret_key)
            .map_err(|error| error.at(path))?;
        debug!(
            target: crate::STARTUP_TARGET,
            path = %path.display(),
            result_proxy = self.values.result_proxy.is_some(),
            "patched settings"
        );
        write_document(path, &patched)
    }
}

/// Failure modes of [`apply`] before a path is attached.
#[derive(Debug)]
pub(crate) enum DocumentError {
    Parse(String),
    Serialise(String),
    NotAMapping(&'static str),
}

impl DocumentError {
    fn at(self, path: &Path) -> PatchError {
        let path: PathBuf = path.to_path_buf();
        match self {
            Self::Parse(message) => PatchError::Parse { path, message },
            Self::Serialise(message) => PatchError::Serialise { path, message },
            Self::NotAMapping(field) => PatchError::NotAMapping {
                path,
                field: field.to_owned(),
            },
        }
    }
}

/// Applies `values` to the YAML `text`, calling `secret` when the template
/// still carries the placeholder secret key.
pub(crate) fn apply<S>(
    text: &str,
    values: &SettingsValues,
    secret: S,
) -> Result<String, DocumentError>
where
    S: FnOnce() -> String,
{
    let mut document = parse(text)?;
    let root = document
        .as_object_mut()
        .ok_or(DocumentError::NotAMapping(ROOT))?;

    if let Some(name) = &values.instance_name {
        section(root, "general")?.insert("instance_name".to_owned(), Value::from(name.as_str()));
    }
    if let Some(backend) = &values.autocomplete {
        section(root, "search")?.insert("autocomplete".to_owned(), Value::from(backend.as_str()));
    }

    let server = section(root, "server")?;
    if let Some(base_url) = &values.base_url {
        if is_unset(server.get("base_url")) {
            server.insert("base_url".to_owned(), Value::from(base_url.as_str()));
        }
    }
    if server.get("secret_key").and_then(Value::as_str) == Some(SECRET_KEY_PLACEHOLDER) {
        server.insert("secret_key".to_owned(), Value::from(secret()));
    }
    if values.result_proxy.is_some() {
        server.insert("image_proxy".to_owned(), Value::Bool(true));
        root.remove(RESULT_PROXY);
    }

    let mut output = serde_saphyr::to_string(&document)
        .map_err(|error| DocumentError::Serialise(error.to_string()))?;
    if let Some(proxy) = &values.result_proxy {
        append_result_proxy(&mut output, proxy)?;
    }
    Ok(output)
}

fn parse(text: &str) -> Result<Value, DocumentError> {
    if text.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    let document: Value =
        serde_saphyr::from_str(text).map_err(|error| DocumentError::Parse(error.to_string()))?;
    match document {
        Value::Null => Ok(Value::Object(Map::new())),
        other => Ok(other),
    }
}

/// Returns the mapping stored under `name`, creating it when absent.
fn section<'m>(
    root: &'m mut Map<String, Value>,
    name: &'static str,
) -> Result<&'m mut Map<String, Value>, DocumentError> {
    let entry = root
        .entry(name)
        .or_insert_with(|| Value::Object(Map::new()));
    if entry.is_null() {
        *entry = Value::Object(Map::new());
    }
    entry.as_object_mut().ok_or(DocumentError::NotAMapping(name))
}

/// The template ships `base_url: false`; anything else is operator data.
fn is_unset(value: Option<&Value>) -> bool {
    matches!(value, None | Some(Value::Null | Value::Bool(false)))
}

fn append_result_proxy(output: &mut String, proxy: &ResultProxy) -> Result<(), DocumentError> {
    let quote = |text: &str| {
        serde_json::to_string(text).map_err(|error| DocumentError::Serialise(error.to_string()))
    };
    if !output.is_empty() && !output.ends_with('\n') {
        output.push('\n');
    }
    output.push_str(RESULT_PROXY_MARKER);
    output.push('\n');
    output.push_str(RESULT_PROXY);
    output.push_str(":\n");
    output.push_str(&format!("  url: {}\n", quote(proxy.url())?));
    output.push_str(&format!("  key: !!binary {}\n", quote(proxy.key())?));
    Ok(())
}

#[cfg(test)]
mod tests {
    use entrypoint_config::{BaseUrl, ResultProxy};
    use rstest::{fixture, rstest};

    use super::*;

    const TEMPLATE: &str = r#"general:
  debug: false
  instance_name: "searxng"

search:
  safe_search: 0
  autocomplete: ""

server:
  port: 8888
  bind_address: "127.0.0.1"
  base_url: false
  secret_key: "ultrasecretkey"
  image_proxy: false

engines:
  - name: wikipedia
    engine: wikipedia
    shortcut: wp
"#;

    #[fixture]
    fn values() -> SettingsValues {
        SettingsValues::default()
    }

    fn reload(text: &str) -> Value {
        let document = text
            .split(RESULT_PROXY_MARKER)
            .next()
            .unwrap_or_default();
        serde_saphyr::from_str(document).expect("patched settings parse")
    }

    fn fixed_secret() -> String {
        "ab".repeat(32)
    }

    #[rstest]
    #[case("http://example.com")]
    #[case("http://example.com/")]
    fn base_url_is_written_with_one_trailing_slash(
        mut values: SettingsValues,
        #[case] raw: &str,
    ) {
        values.base_url = Some(BaseUrl::new(raw));

        let patched = apply(TEMPLATE, &values, fixed_secret).expect("patch applies");

        assert_eq!(
            reload(&patched)["server"]["base_url"],
            Value::from("http://example.com/")
        );
    }

    #[rstest]
    fn unset_base_url_keeps_placeholder(values: SettingsValues) {
        let patched = apply(TEMPLATE, &values, fixed_secret).expect("patch applies");

        assert_eq!(reload(&patched)["server"]["base_url"], Value::Bool(false));
    }

    #[rstest]
    fn instance_name_and_autocomplete_are_substituted(mut values: SettingsValues) {
        values.instance_name = Some("my search".to_owned());
        values.autocomplete = Some("duckduckgo".to_owned());

        let patched = apply(TEMPLATE, &values, fixed_secret).expect("patch applies");
        let document = reload(&patched);

        assert_eq!(document["general"]["instance_name"], Value::from("my search"));
        assert_eq!(document["search"]["autocomplete"], Value::from("duckduckgo"));
        assert_eq!(document["search"]["safe_search"], Value::from(0));
        assert_eq!(document["engines"][0]["shortcut"], Value::from("wp"));
    }

    #[rstest]
    fn unset_instance_name_keeps_template_value(values: SettingsValues) {
        let patched = apply(TEMPLATE, &values, fixed_secret).expect("patch applies");

        assert_eq!(
            reload(&patched)["general"]["instance_name"],
            Value::from("searxng")
        );
    }

    #[rstest]
    fn placeholder_secret_is_replaced(values: SettingsValues) {
        let patched = apply(TEMPLATE, &values, generate_secret_key).expect("patch applies");

        assert!(!patched.contains(SECRET_KEY_PLACEHOLDER));
        let secret = reload(&patched)["server"]["secret_key"]
            .as_str()
            .map(str::to_owned)
            .expect("secret key is a string");
        assert_eq!(secret.len(), 64);
        assert!(secret.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[rstest]
    fn comments_are_dropped_and_ambiguous_strings_survive(values: SettingsValues) {
        let template = "\
# Top comment
general:
  # commented option
  instance_name: searxng
flags:
  a: \"on\"
  b: \"yes\"
  c: \"off\"
  d: \"no\"
  e: \"~\"
  f: \"\"
";

        let patched = apply(template, &values, fixed_secret).expect("patch applies");
        let document = reload(&patched);

        assert!(!patched.contains("# Top comment"));
        assert!(!patched.contains("# commented option"));
        let expected = [
            ("a", "on"),
            ("b", "yes"),
            ("c", "off"),
            ("d", "no"),
            ("e", "~"),
            ("f", ""),
        ];
        for (key, expected) in expected {
            assert_eq!(document["flags"][key], Value::from(expected), "flags.{key}");
        }
    }

    #[rstest]
    fn operator_secret_is_not_replaced(values: SettingsValues) {
        let template = TEMPLATE.replace("ultrasecretkey", "operator-chosen");

        let patched = apply(&template, &values, || panic!("secret must not be minted"))
            .expect("patch applies");

        assert_eq!(
            reload(&patched)["server"]["secret_key"],
            Value::from("operator-chosen")
        );
    }

    #[rstest]
    fn result_proxy_enables_image_proxy_and_appends_block(mut values: SettingsValues) {
        values.result_proxy =
            ResultProxy::from_parts(Some("https://morty.example.org"), Some("c2VjcmV0"));

        let patched = apply(TEMPLATE, &values, fixed_secret).expect("patch applies");

        assert_eq!(reload(&patched)["server"]["image_proxy"], Value::Bool(true));
        let block = patched
            .split(RESULT_PROXY_MARKER)
            .nth(1)
            .expect("result proxy block appended");
        assert_eq!(
            block,
            "\nresult_proxy:\n  url: \"https://morty.example.org\"\n  key: !!binary \"c2VjcmV0\"\n"
        );
    }

    #[rstest]
    fn without_result_proxy_nothing_is_appended(values: SettingsValues) {
        let patched = apply(TEMPLATE, &values, fixed_secret).expect("patch applies");

        assert!(!patched.contains(RESULT_PROXY));
        assert_eq!(reload(&patched)["server"]["image_proxy"], Value::Bool(false));
    }

    #[rstest]
    fn missing_sections_are_created(mut values: SettingsValues) {
        values.instance_name = Some("bare".to_owned());

        let patched = apply("use_default_settings: true\n", &values, fixed_secret)
            .expect("patch applies");
        let document = reload(&patched);

        assert_eq!(document["use_default_settings"], Value::Bool(true));
        assert_eq!(document["general"]["instance_name"], Value::from("bare"));
    }

    #[rstest]
    fn scalar_section_is_rejected(mut values: SettingsValues) {
        values.instance_name = Some("x".to_owned());

        let error = apply("general: 3\n", &values, fixed_secret).expect_err("not a mapping");

        assert!(matches!(error, DocumentError::NotAMapping("general")));
    }

    #[rstest]
    fn malformed_yaml_is_reported(values: SettingsValues) {
        let error = apply("server: [unclosed\n", &values, fixed_secret).expect_err("bad yaml");

        assert!(matches!(error, DocumentError::Parse(_)));
    }
}
