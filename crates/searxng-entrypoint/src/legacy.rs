//! Compatibility shim for the deprecated `/etc/searx` volume.
//!
//! Older images read their configuration from `/etc/searx`. When that volume
//! is still mounted, the shim carries `settings.yml` forward once, refuses to
//! reuse the old `uwsgi.ini` (its options must be merged by hand), and leaves
//! a note in the old volume. Nothing here aborts startup: failures are
//! reported and the pipeline continues.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::reporter::StartupReporter;

/// Settings file name inside a configuration volume.
pub const SETTINGS_FILE: &str = "settings.yml";

/// uWSGI configuration file name inside a configuration volume.
pub const UWSGI_FILE: &str = "uwsgi.ini";

/// Note left in the deprecated volume.
pub const NOTE_FILE: &str = "deprecated_volume_read_me.txt";

const UWSGI_TEMPLATE_URL: &str =
    "https://github.com/searxng/searxng/blob/master/dockerfiles/uwsgi.ini";

/// Errors raised while migrating the deprecated volume.
#[derive(Debug, Error)]
pub enum LegacyError {
    /// Copying the legacy settings forward failed.
    #[error("failed to copy legacy settings '{from}' to '{to}': {source}")]
    CopySettings {
        /// Legacy settings file.
        from: PathBuf,
        /// New settings location.
        to: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Writing the migration note failed.
    #[error("failed to write migration note '{path}': {source}")]
    WriteNote {
        /// Note path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Files found in the deprecated configuration volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyVolume {
    dir: PathBuf,
    settings: Option<PathBuf>,
    uwsgi: Option<PathBuf>,
}

/// Summary of a migration run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LegacyMigration {
    /// The legacy settings were copied to the new volume.
    pub settings_copied: bool,
    /// A legacy `uwsgi.ini` was found and ignored.
    pub uwsgi_ignored: bool,
    /// The migration note was written by this run.
    pub note_written: bool,
}

impl LegacyVolume {
    /// Inspects `dir` for deprecated configuration files.
    #[must_use]
    pub fn detect(dir: &Path) -> Self {
        let present = |name: &str| {
            let path = dir.join(name);
            path.is_file().then_some(path)
        };
        Self {
            dir: dir.to_path_buf(),
            settings: present(SETTINGS_FILE),
            uwsgi: present(UWSGI_FILE),
        }
    }

    /// Returns true when either deprecated file is present.
    #[must_use]
    pub const fn is_mounted(&self) -> bool {
        self.settings.is_some() || self.uwsgi.is_some()
    }

    /// Migrates the deprecated volume towards `settings_target`.
    ///
    /// Legacy settings are copied only when `settings_target` does not exist
    /// yet, so an operator's file in the new volume always wins.
    #[must_use]
    pub fn migrate(
        &self,
        settings_target: &Path,
        reporter: &dyn StartupReporter,
    ) -> LegacyMigration {
        let mut migration = LegacyMigration::default();
        if !self.is_mounted() {
            return migration;
        }

        if let Some(legacy_settings) = &self.settings {
            if !settings_target.exists() {
                match copy_settings(legacy_settings, settings_target) {
                    Ok(()) => {
                        reporter.legacy_settings_copied(legacy_settings, settings_target);
                        migration.settings_copied = true;
                    }
                    Err(error) => reporter.legacy_step_failed(&error),
                }
            }
        }

        if let Some(legacy_uwsgi) = &self.uwsgi {
            reporter.legacy_uwsgi_ignored(legacy_uwsgi);
            migration.uwsgi_ignored = true;
        }

        let new_dir = settings_target.parent().unwrap_or_else(|| Path::new("/"));
        let note = self.dir.join(NOTE_FILE);
        match write_note(&note, &self.dir, new_dir) {
            Ok(written) => migration.note_written = written,
            Err(error) => reporter.legacy_step_failed(&error),
        }
        reporter.legacy_volume_mounted(&self.dir, new_dir);
        migration
    }
}

fn copy_settings(from: &Path, to: &Path) -> Result<(), LegacyError> {
    let copy_error = |source| LegacyError::CopySettings {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(copy_error)?;
    }
    fs::copy(from, to).map(drop).map_err(copy_error)
}

/// Writes the note unless one already exists; returns whether it was written.
fn write_note(note: &Path, legacy_dir: &Path, new_dir: &Path) -> Result<bool, LegacyError> {
    let note_error = |source| LegacyError::WriteNote {
        path: note.to_path_buf(),
        source,
    };
    let mut file = match OpenOptions::new().write(true).create_new(true).open(note) {
        Ok(file) => file,
        Err(error) if error.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
        Err(error) => return Err(note_error(error)),
    };
    file.write_all(note_text(legacy_dir, new_dir).as_bytes())
        .map_err(note_error)?;
    Ok(true)
}

fn note_text(legacy_dir: &Path, new_dir: &Path) -> String {
    let legacy = legacy_dir.display();
    let new = new_dir.display();
    format!(
        "This Docker image uses the volume {new}\n\
         Update your configuration:\n\
         * remove {UWSGI_FILE} (or very carefully update your existing {UWSGI_FILE} using {UWSGI_TEMPLATE_URL} )\n\
         * mount {new} instead of {legacy}\n"
    )
}
