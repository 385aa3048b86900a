use thiserror::Error;

use crate::logging::{LogFormat, LogFormatParseError};

/// Environment values that were ignored in favour of a default.
///
/// Invalid values never abort startup; the loader records them so the
/// entrypoint can log them once telemetry is available.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigWarning {
    /// A numeric variable could not be parsed as a positive integer.
    #[error("{variable}={value:?} is not a positive integer; using {fallback}")]
    InvalidCount {
        /// Environment variable name.
        variable: &'static str,
        /// Rejected value.
        value: String,
        /// Value used instead.
        fallback: usize,
    },
    /// The log format was not recognised.
    #[error("{variable}={value:?} is not a known log format; using {fallback}")]
    InvalidLogFormat {
        /// Environment variable name.
        variable: &'static str,
        /// Rejected value.
        value: String,
        /// Format used instead.
        fallback: LogFormat,
        /// Parser rejection.
        #[source]
        source: LogFormatParseError,
    },
    /// Only one half of the result proxy configuration was supplied.
    #[error("result proxy disabled: both MORTY_URL and MORTY_KEY must be set")]
    IncompleteResultProxy,
}
