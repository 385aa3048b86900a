//! Top-level error type and its exit code mapping.

use std::process::ExitCode;

use thiserror::Error;

use crate::startup::StartupError;

/// Exit status for unknown or malformed command-line arguments.
pub const USAGE_EXIT_CODE: u8 = 42;

/// Errors that end an entrypoint run.
#[derive(Debug, Error)]
pub enum AppError {
    /// The command line could not be parsed.
    #[error("{0}")]
    CliUsage(clap::Error),
    /// The startup pipeline failed.
    #[error(transparent)]
    Startup(#[from] StartupError),
}

impl AppError {
    /// Exit status reported for this error.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::CliUsage(_) => ExitCode::from(USAGE_EXIT_CODE),
            Self::Startup(_) => ExitCode::FAILURE,
        }
    }
}
