//! Informational probe for the installed SearXNG version.

use std::io;
use std::process::{Command, Stdio};

use thiserror::Error;

use crate::account::{Identity, run_as};

const VERSION_SCRIPT: &str = "from searx.version import VERSION_STRING; print(VERSION_STRING)";

/// Errors raised while probing the application version.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The interpreter could not be started.
    #[error("failed to run '{program}': {source}")]
    Spawn {
        /// Interpreter command.
        program: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The interpreter exited unsuccessfully.
    #[error("'{program}' exited with {status}")]
    Status {
        /// Interpreter command.
        program: String,
        /// Exit status description.
        status: String,
    },
}

/// Source of the application version string.
pub trait VersionProbe {
    /// Returns the raw version output.
    fn probe(&self) -> Result<String, ProbeError>;
}

/// Asks the Python interpreter for `searx.version.VERSION_STRING`.
#[derive(Debug, Clone)]
pub struct PythonVersionProbe {
    python: String,
    identity: Option<Identity>,
}

impl PythonVersionProbe {
    /// Runs `python` as `identity` when one is given.
    #[must_use]
    pub fn new(python: impl Into<String>, identity: Option<Identity>) -> Self {
        Self {
            python: python.into(),
            identity,
        }
    }
}

impl VersionProbe for PythonVersionProbe {
    fn probe(&self) -> Result<String, ProbeError> {
        let mut command = Command::new(&self.python);
        command
            .args(["-c", VERSION_SCRIPT])
            .stdin(Stdio::null())
            .stderr(Stdio::null());
        run_as(&mut command, self.identity);
        let output = command.output().map_err(|source| ProbeError::Spawn {
            program: self.python.clone(),
            source,
        })?;
        if !output.status.success() {
            return Err(ProbeError::Status {
                program: self.python.clone(),
                status: output.status.to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Runs `probe` and reduces its output to a printable version string.
///
/// Probe failures are logged at debug level and yield an empty string.
#[must_use]
pub fn probe_version(probe: &dyn VersionProbe) -> String {
    match probe.probe() {
        Ok(raw) => printable_first_line(&raw),
        Err(error) => {
            tracing::debug!(target: crate::STARTUP_TARGET, error = %error, "version probe failed");
            String::new()
        }
    }
}

fn printable_first_line(raw: &str) -> String {
    raw.lines()
        .next()
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .to_owned()
}
