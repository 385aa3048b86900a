//! Resolution of the unprivileged service account.

use std::process::Command;

use entrypoint_config::ServiceAccount;
use thiserror::Error;

/// Numeric identity a child process switches to before running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    /// User id.
    pub uid: u32,
    /// Group id.
    pub gid: u32,
}

/// Errors raised while resolving the service account.
#[derive(Debug, Error)]
pub enum AccountError {
    /// The user database lookup failed.
    #[error("failed to look up {kind} '{name}': {message}")]
    Lookup {
        /// `user` or `group`.
        kind: &'static str,
        /// Name being resolved.
        name: String,
        /// System error description.
        message: String,
    },
    /// The account does not exist.
    #[error("unknown {kind} '{name}'")]
    Unknown {
        /// `user` or `group`.
        kind: &'static str,
        /// Name being resolved.
        name: String,
    },
}

/// Returns the identity to drop to, or `None` when no switch is needed.
///
/// Privileges are only dropped when the entrypoint runs as root; any other
/// user keeps its own identity.
#[cfg(unix)]
pub fn resolve(account: &ServiceAccount) -> Result<Option<Identity>, AccountError> {
    use nix::unistd::{Group, User, geteuid};

    if !geteuid().is_root() {
        return Ok(None);
    }
    let lookup_error = |kind: &'static str, name: &str, error: nix::Error| AccountError::Lookup {
        kind,
        name: name.to_owned(),
        message: error.to_string(),
    };
    let unknown = |kind: &'static str, name: &str| AccountError::Unknown {
        kind,
        name: name.to_owned(),
    };

    let user = User::from_name(&account.user)
        .map_err(|error| lookup_error("user", &account.user, error))?
        .ok_or_else(|| unknown("user", &account.user))?;
    let group = Group::from_name(&account.group)
        .map_err(|error| lookup_error("group", &account.group, error))?
        .ok_or_else(|| unknown("group", &account.group))?;

    Ok(Some(Identity {
        uid: user.uid.as_raw(),
        gid: group.gid.as_raw(),
    }))
}

/// Returns `None`: identities are not switched outside Unix.
#[cfg(not(unix))]
pub fn resolve(_account: &ServiceAccount) -> Result<Option<Identity>, AccountError> {
    Ok(None)
}

/// Makes `command` run as `identity`, when one is given.
#[cfg(unix)]
pub(crate) fn run_as(command: &mut Command, identity: Option<Identity>) {
    use std::os::unix::process::CommandExt;

    if let Some(identity) = identity {
        command.gid(identity.gid).uid(identity.uid);
    }
}

#[cfg(not(unix))]
pub(crate) fn run_as(_command: &mut Command, _identity: Option<Identity>) {}
