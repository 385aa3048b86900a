//! Patch functions applied to configuration files freshly copied from their
//! templates.
//!
//! Each [`Patcher`] rewrites one file format in place: the uWSGI ini through
//! a line-preserving [`ini`] document and `settings.yml` through a structured
//! YAML round trip. Patchers are not idempotent (the settings patcher mints a
//! new secret and appends the result proxy block) so the reconciler only
//! runs them once, on a file it has just copied.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::files::atomic_write;

mod ini;
mod secret;
mod settings;
mod uwsgi;

pub use secret::{SECRET_KEY_PLACEHOLDER, generate_secret_key};
pub use settings::SettingsPatcher;
pub use uwsgi::UwsgiPatcher;

/// Rewrites a configuration file in place using resolved startup values.
pub trait Patcher {
    /// Patches the file at `path`.
    fn patch(&self, path: &Path) -> Result<(), PatchError>;
}

impl<F> Patcher for F
where
    F: Fn(&Path) -> Result<(), PatchError>,
{
    fn patch(&self, path: &Path) -> Result<(), PatchError> {
        self(path)
    }
}

/// Errors raised while patching a configuration file.
#[derive(Debug, Error)]
pub enum PatchError {
    /// The file could not be read.
    #[error("failed to read '{path}': {source}")]
    Read {
        /// File being patched.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The patched contents could not be written back.
    #[error("failed to write '{path}': {source}")]
    Write {
        /// File being patched.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The document could not be parsed.
    #[error("failed to parse '{path}': {message}")]
    Parse {
        /// File being patched.
        path: PathBuf,
        /// Parser diagnostic.
        message: String,
    },
    /// The patched document could not be serialised.
    #[error("failed to serialise '{path}': {message}")]
    Serialise {
        /// File being patched.
        path: PathBuf,
        /// Serialiser diagnostic.
        message: String,
    },
    /// A section the patch writes into holds something other than a mapping.
    #[error("'{field}' in '{path}' is not a mapping")]
    NotAMapping {
        /// File being patched.
        path: PathBuf,
        /// Offending section (`<root>` for the document itself).
        field: String,
    },
}

pub(crate) fn read_document(path: &Path) -> Result<String, PatchError> {
    fs::read_to_string(path).map_err(|source| PatchError::Read {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn write_document(path: &Path, contents: &str) -> Result<(), PatchError> {
    atomic_write(path, contents.as_bytes()).map_err(|source| PatchError::Write {
        path: path.to_path_buf(),
        source,
    })
}
