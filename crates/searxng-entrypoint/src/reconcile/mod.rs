//! Reconciles a deployed configuration file against the template shipped in
//! the image.
//!
//! The policy never discards operator edits silently:
//!
//! | deployed file | template newer | force | action                                   |
//! |---------------|----------------|-------|------------------------------------------|
//! | missing       | n/a            | n/a   | copy template, patch it                  |
//! | present       | no             | n/a   | keep the deployed file                   |
//! | present       | yes            | no    | stage a patched copy as `<file>.new`     |
//! | present       | yes            | yes   | back up to `<file>.old` once, replace    |
//!
//! "Newer" compares modification times. A `<file>.old` backup is written at
//! most once, so repeated forced updates keep the original operator file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use thiserror::Error;

use crate::files::sibling;
use crate::patch::{PatchError, Patcher};

/// Suffix of a staged update written next to an up-to-date deployed file.
pub const STAGED_SUFFIX: &str = ".new";

/// Suffix of the one-time backup taken before a forced update.
pub const BACKUP_SUFFIX: &str = ".old";

/// Deployed configuration file and the template it derives from.
#[derive(Debug, Clone, Copy)]
pub struct ConfigPair<'a> {
    /// Live file read by the application.
    pub current: &'a Path,
    /// Template shipped with the image.
    pub reference: &'a Path,
}

impl<'a> ConfigPair<'a> {
    /// Pairs a deployed file with its template.
    #[must_use]
    pub const fn new(current: &'a Path, reference: &'a Path) -> Self {
        Self { current, reference }
    }

    /// Path of the staged update (`<current>.new`).
    #[must_use]
    pub fn staged(&self) -> PathBuf {
        sibling(self.current, STAGED_SUFFIX)
    }

    /// Path of the one-time backup (`<current>.old`).
    #[must_use]
    pub fn backup(&self) -> PathBuf {
        sibling(self.current, BACKUP_SUFFIX)
    }
}

/// How a stale deployed file is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdatePolicy {
    /// Leave the deployed file alone and stage the update beside it.
    #[default]
    Stage,
    /// Replace the deployed file, keeping a one-time backup.
    Force,
}

impl UpdatePolicy {
    /// Maps the `-f` flag onto a policy.
    #[must_use]
    pub const fn from_force_flag(force: bool) -> Self {
        if force { Self::Force } else { Self::Stage }
    }
}

/// What the reconciler did to a configuration pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The deployed file was missing and has been created from the template.
    Created {
        /// Created file.
        path: PathBuf,
    },
    /// The deployed file is at least as new as the template.
    Kept {
        /// Untouched file.
        path: PathBuf,
    },
    /// The template is newer; a patched copy was staged for inspection.
    Staged {
        /// Untouched deployed file.
        path: PathBuf,
        /// Staged `.new` file.
        staged: PathBuf,
    },
    /// The template is newer and the deployed file was replaced.
    Replaced {
        /// Replaced file.
        path: PathBuf,
        /// Backup written by this run, if no earlier backup existed.
        backup: Option<PathBuf>,
        /// Stale `.new` file removed because it no longer describes a pending update.
        discarded_stage: Option<PathBuf>,
    },
}

/// Errors raised while reconciling a configuration pair.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Reading file metadata failed.
    #[error("failed to inspect '{path}': {source}")]
    Inspect {
        /// File being inspected.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Copying the template failed.
    #[error("failed to copy '{from}' to '{to}': {source}")]
    Copy {
        /// Template path.
        from: PathBuf,
        /// Destination path.
        to: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Moving the deployed file to its backup failed.
    #[error("failed to back up '{from}' to '{to}': {source}")]
    Backup {
        /// Deployed file.
        from: PathBuf,
        /// Backup path.
        to: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Removing a stale staged update failed.
    #[error("failed to remove stale '{path}': {source}")]
    DiscardStaged {
        /// Stale `.new` file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The patch function failed on the freshly copied file.
    #[error("failed to patch '{path}': {source}")]
    Patch {
        /// File being patched.
        path: PathBuf,
        /// Underlying patch error.
        #[source]
        source: PatchError,
    },
}

/// Applies the reconciliation policy to `pair`.
///
/// The patcher runs at most once, always on a file this call has just
/// copied from the template.
pub fn reconcile(
    pair: ConfigPair<'_>,
    policy: UpdatePolicy,
    patcher: &dyn Patcher,
) -> Result<ReconcileOutcome, ReconcileError> {
    if !exists(pair.current)? {
        install(pair.reference, pair.current, patcher)?;
        return Ok(ReconcileOutcome::Created {
            path: pair.current.to_path_buf(),
        });
    }

    if !is_newer(pair.reference, pair.current)? {
        return Ok(ReconcileOutcome::Kept {
            path: pair.current.to_path_buf(),
        });
    }

    match policy {
        UpdatePolicy::Stage => {
            let staged = pair.staged();
            install(pair.reference, &staged, patcher)?;
            Ok(ReconcileOutcome::Staged {
                path: pair.current.to_path_buf(),
                staged,
            })
        }
        UpdatePolicy::Force => {
            let backup_path = pair.backup();
            let backup = if exists(&backup_path)? {
                None
            } else {
                fs::rename(pair.current, &backup_path).map_err(|source| {
                    ReconcileError::Backup {
                        from: pair.current.to_path_buf(),
                        to: backup_path.clone(),
                        source,
                    }
                })?;
                Some(backup_path)
            };
            install(pair.reference, pair.current, patcher)?;
            let discarded_stage = discard_staged(&pair.staged())?;
            Ok(ReconcileOutcome::Replaced {
                path: pair.current.to_path_buf(),
                backup,
                discarded_stage,
            })
        }
    }
}

fn install(reference: &Path, target: &Path, patcher: &dyn Patcher) -> Result<(), ReconcileError> {
    fs::copy(reference, target).map_err(|source| ReconcileError::Copy {
        from: reference.to_path_buf(),
        to: target.to_path_buf(),
        source,
    })?;
    patcher
        .patch(target)
        .map_err(|source| ReconcileError::Patch {
            path: target.to_path_buf(),
            source,
        })
}

fn discard_staged(staged: &Path) -> Result<Option<PathBuf>, ReconcileError> {
    match fs::remove_file(staged) {
        Ok(()) => Ok(Some(staged.to_path_buf())),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ReconcileError::DiscardStaged {
            path: staged.to_path_buf(),
            source,
        }),
    }
}

fn exists(path: &Path) -> Result<bool, ReconcileError> {
    path.try_exists().map_err(|source| ReconcileError::Inspect {
        path: path.to_path_buf(),
        source,
    })
}

/// Strict modification-time comparison; a missing template is never newer.
fn is_newer(reference: &Path, current: &Path) -> Result<bool, ReconcileError> {
    let Some(reference_time) = modified(reference)? else {
        return Ok(false);
    };
    let current_time = modified(current)?.unwrap_or(SystemTime::UNIX_EPOCH);
    Ok(reference_time > current_time)
}

fn modified(path: &Path) -> Result<Option<SystemTime>, ReconcileError> {
    let inspect = |source| ReconcileError::Inspect {
        path: path.to_path_buf(),
        source,
    };
    match fs::metadata(path) {
        Ok(metadata) => metadata.modified().map(Some).map_err(inspect),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(error) => Err(inspect(error)),
    }
}
