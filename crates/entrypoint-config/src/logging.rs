//! Output formats for the entrypoint's own log lines.

use strum::{Display, EnumString};

/// How startup events are rendered on stderr.
///
/// Parsed from `ENTRYPOINT_LOG_FORMAT` without regard to case.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One line per event, suited to `docker logs`.
    #[default]
    Compact,
    /// One JSON object per event for log shippers.
    Json,
}

/// Rejection raised when `ENTRYPOINT_LOG_FORMAT` names no known format.
pub type LogFormatParseError = strum::ParseError;
