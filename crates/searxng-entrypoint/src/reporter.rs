//! Operator-facing startup reporting.

use std::path::Path;

use entrypoint_config::ConfigWarning;

use crate::STARTUP_TARGET;
use crate::legacy::LegacyError;
use crate::reconcile::ReconcileOutcome;

/// Observer for the events the startup pipeline surfaces to operators.
pub trait StartupReporter {
    /// An environment value was rejected and its default used instead.
    fn config_warning(&self, warning: &ConfigWarning);

    /// The application version probe finished; `version` may be empty.
    fn version_detected(&self, version: &str);

    /// Legacy settings were copied into the new volume.
    fn legacy_settings_copied(&self, from: &Path, to: &Path);

    /// A legacy `uwsgi.ini` was found and not carried forward.
    fn legacy_uwsgi_ignored(&self, path: &Path);

    /// The deprecated volume is still mounted.
    fn legacy_volume_mounted(&self, legacy_dir: &Path, new_dir: &Path);

    /// A legacy migration step failed; startup continues.
    fn legacy_step_failed(&self, error: &LegacyError);

    /// A configuration pair was reconciled.
    fn reconciled(&self, outcome: &ReconcileOutcome);

    /// The run stops before launching the process server.
    fn dry_run(&self);

    /// The process server is about to replace the entrypoint.
    fn launching(&self, program: &str, bind_address: &str);
}

/// Default reporter that records startup events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredReporter;

impl StructuredReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl StartupReporter for StructuredReporter {
    fn config_warning(&self, warning: &ConfigWarning) {
        tracing::warn!(
            target: STARTUP_TARGET,
            event = "config_warning",
            warning = %warning,
            "ignoring environment value"
        );
    }

    fn version_detected(&self, version: &str) {
        tracing::info!(
            target: STARTUP_TARGET,
            event = "version_detected",
            version,
            "SearXNG version {version}"
        );
    }

    fn legacy_settings_copied(&self, from: &Path, to: &Path) {
        tracing::info!(
            target: STARTUP_TARGET,
            event = "legacy_settings_copied",
            from = %from.display(),
            to = %to.display(),
            "copied legacy settings"
        );
    }

    fn legacy_uwsgi_ignored(&self, path: &Path) {
        tracing::warn!(
            target: STARTUP_TARGET,
            event = "legacy_uwsgi_ignored",
            path = %path.display(),
            "{} is ignored; merge its options into the new uwsgi.ini by hand",
            path.display()
        );
    }

    fn legacy_volume_mounted(&self, legacy_dir: &Path, new_dir: &Path) {
        tracing::warn!(
            target: STARTUP_TARGET,
            event = "legacy_volume_mounted",
            legacy_dir = %legacy_dir.display(),
            new_dir = %new_dir.display(),
            "this image uses the volume {}; mount it instead of {}",
            new_dir.display(),
            legacy_dir.display()
        );
    }

    fn legacy_step_failed(&self, error: &LegacyError) {
        tracing::warn!(
            target: STARTUP_TARGET,
            event = "legacy_step_failed",
            error = %error,
            "legacy volume migration step failed"
        );
    }

    fn reconciled(&self, outcome: &ReconcileOutcome) {
        match outcome {
            ReconcileOutcome::Created { path } => tracing::info!(
                target: STARTUP_TARGET,
                event = "config_created",
                path = %path.display(),
                "Create {}",
                path.display()
            ),
            ReconcileOutcome::Kept { path } => tracing::info!(
                target: STARTUP_TARGET,
                event = "config_kept",
                path = %path.display(),
                "Use existing {}",
                path.display()
            ),
            ReconcileOutcome::Staged { path, staged } => tracing::warn!(
                target: STARTUP_TARGET,
                event = "config_staged",
                path = %path.display(),
                staged = %staged.display(),
                "Check new version {} to make sure SearXNG is working properly",
                staged.display()
            ),
            ReconcileOutcome::Replaced {
                path,
                backup,
                discarded_stage,
            } => {
                tracing::warn!(
                    target: STARTUP_TARGET,
                    event = "config_replaced",
                    path = %path.display(),
                    "Automatically update {} to the new version",
                    path.display()
                );
                if let Some(backup) = backup {
                    tracing::warn!(
                        target: STARTUP_TARGET,
                        event = "config_backed_up",
                        backup = %backup.display(),
                        "The previous configuration is saved to {}",
                        backup.display()
                    );
                }
                if let Some(stale) = discarded_stage {
                    tracing::info!(
                        target: STARTUP_TARGET,
                        event = "stale_stage_removed",
                        path = %stale.display(),
                        "removed stale staged update"
                    );
                }
            }
        }
    }

    fn dry_run(&self) {
        tracing::info!(target: STARTUP_TARGET, event = "dry_run", "Dry run");
    }

    fn launching(&self, program: &str, bind_address: &str) {
        tracing::info!(
            target: STARTUP_TARGET,
            event = "launching",
            program,
            bind_address,
            "Listen on {bind_address}"
        );
    }
}
