//! The linear startup pipeline run at every container start.

use std::process::ExitCode;

use entrypoint_config::EntrypointConfig;
use thiserror::Error;

use crate::account::{AccountError, Identity};
use crate::cli::Cli;
use crate::launch::{LaunchError, LaunchPlan, Launcher};
use crate::legacy::LegacyVolume;
use crate::patch::{SettingsPatcher, UwsgiPatcher};
use crate::probe::{VersionProbe, probe_version};
use crate::reconcile::{ConfigPair, ReconcileError, UpdatePolicy, reconcile};
use crate::reporter::StartupReporter;

/// Behaviour selected by the command-line flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunMode {
    /// Stop after reconciliation.
    pub dry_run: bool,
    /// Policy for configuration files older than their templates.
    pub policy: UpdatePolicy,
}

impl From<Cli> for RunMode {
    fn from(cli: Cli) -> Self {
        Self {
            dry_run: cli.dry_run,
            policy: UpdatePolicy::from_force_flag(cli.force_update),
        }
    }
}

/// Side-effecting collaborators of the pipeline.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    /// Operator-facing event sink.
    pub reporter: &'a dyn StartupReporter,
    /// Application version source.
    pub probe: &'a dyn VersionProbe,
    /// Process server hand-off.
    pub launcher: &'a dyn Launcher,
}

/// Fatal startup failures.
#[derive(Debug, Error)]
pub enum StartupError {
    /// A configuration file could not be reconciled.
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
    /// The service account could not be resolved for the process server.
    #[error(transparent)]
    Account(#[from] AccountError),
    /// The process server could not be started.
    #[error(transparent)]
    Launch(#[from] LaunchError),
}

/// Runs the pipeline: warnings, version probe, legacy migration, uWSGI and
/// settings reconciliation, then dry-run exit or launch.
///
/// `identity` is the outcome of resolving the service account. A failed
/// resolution skips the version probe and is only fatal at launch, so dry
/// runs still succeed on hosts without the account.
pub fn run_startup(
    config: &EntrypointConfig,
    mode: RunMode,
    identity: Result<Option<Identity>, AccountError>,
    collaborators: Collaborators<'_>,
) -> Result<ExitCode, StartupError> {
    let Collaborators {
        reporter,
        probe,
        launcher,
    } = collaborators;

    for warning in config.warnings() {
        reporter.config_warning(warning);
    }

    let version = match &identity {
        Ok(_) => probe_version(probe),
        Err(error) => {
            tracing::debug!(
                target: crate::STARTUP_TARGET,
                error = %error,
                "skipping version probe"
            );
            String::new()
        }
    };
    reporter.version_detected(&version);

    let paths = config.paths();
    let migration = LegacyVolume::detect(paths.legacy_dir.as_std_path())
        .migrate(paths.settings.as_std_path(), reporter);
    tracing::debug!(
        target: crate::STARTUP_TARGET,
        settings_copied = migration.settings_copied,
        uwsgi_ignored = migration.uwsgi_ignored,
        note_written = migration.note_written,
        "legacy volume checked"
    );

    let uwsgi = ConfigPair::new(paths.uwsgi.as_std_path(), paths.reference_uwsgi.as_std_path());
    let outcome = reconcile(uwsgi, mode.policy, &UwsgiPatcher::new(config.uwsgi()))?;
    reporter.reconciled(&outcome);

    let settings = ConfigPair::new(
        paths.settings.as_std_path(),
        paths.reference_settings.as_std_path(),
    );
    let outcome = reconcile(
        settings,
        mode.policy,
        &SettingsPatcher::new(config.settings()),
    )?;
    reporter.reconciled(&outcome);

    if mode.dry_run {
        reporter.dry_run();
        return Ok(ExitCode::SUCCESS);
    }

    let plan = LaunchPlan::from_config(config, identity?);
    reporter.launching(plan.program(), config.bind_address());
    Ok(launcher.launch(&plan)?)
}
