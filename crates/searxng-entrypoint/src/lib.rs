//! Container entrypoint for SearXNG.
//!
//! At every container start the entrypoint reads its environment once,
//! carries a deprecated `/etc/searx` volume forward, reconciles `uwsgi.ini`
//! and `settings.yml` against the templates shipped in the image, and then
//! either stops (`-d`) or replaces itself with uWSGI.
//!
//! Reconciliation never overwrites an operator's file silently. A template
//! that is newer than the deployed file is staged as `<file>.new`; with `-f`
//! the deployed file is replaced after a one-time `<file>.old` backup. Files
//! copied from a template are patched from the environment (base URL,
//! instance name, autocomplete backend, result proxy, a fresh secret key and
//! the uWSGI worker and thread counts).

mod account;
mod cli;
mod errors;
mod files;
mod launch;
mod legacy;
mod patch;
mod probe;
mod reconcile;
mod reporter;
mod startup;
mod telemetry;

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;
use entrypoint_config::EntrypointConfig;

pub use account::{AccountError, Identity};
pub use cli::Cli;
pub use errors::{AppError, USAGE_EXIT_CODE};
pub use launch::{ExecLauncher, LaunchError, LaunchPlan, Launcher};
pub use legacy::{LegacyError, LegacyMigration, LegacyVolume};
pub use patch::{
    PatchError, Patcher, SECRET_KEY_PLACEHOLDER, SettingsPatcher, UwsgiPatcher,
    generate_secret_key,
};
pub use probe::{ProbeError, PythonVersionProbe, VersionProbe, probe_version};
pub use reconcile::{
    BACKUP_SUFFIX, ConfigPair, ReconcileError, ReconcileOutcome, STAGED_SUFFIX, UpdatePolicy,
    reconcile,
};
pub use reporter::{StartupReporter, StructuredReporter};
pub use startup::{Collaborators, RunMode, StartupError, run_startup};
pub use telemetry::TelemetryError;

pub(crate) const STARTUP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::startup");

/// Runs the entrypoint with the provided arguments and IO handles.
///
/// Help goes to `stdout` and exits successfully; usage errors go to `stderr`
/// and exit with [`USAGE_EXIT_CODE`]. Without `-d` a successful run does not
/// return on Unix because the process image is replaced by uWSGI.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) if error.kind() == ErrorKind::DisplayHelp => {
            let _ = write!(stdout, "{}", error.render());
            return ExitCode::SUCCESS;
        }
        Err(error) => {
            let error = AppError::CliUsage(error);
            let _ = write!(stderr, "{error}");
            return error.exit_code();
        }
    };

    let config = EntrypointConfig::from_env();
    if let Err(error) = telemetry::initialise(&config) {
        let _ = writeln!(stderr, "{error}");
    }

    match execute(&config, RunMode::from(cli)) {
        Ok(exit_code) => exit_code,
        Err(error) => {
            let _ = writeln!(stderr, "{error}");
            error.exit_code()
        }
    }
}

fn execute(config: &EntrypointConfig, mode: RunMode) -> Result<ExitCode, AppError> {
    let identity = account::resolve(config.account());
    let probe = PythonVersionProbe::new(
        config.python(),
        identity.as_ref().ok().copied().flatten(),
    );
    let reporter = StructuredReporter::new();
    let collaborators = Collaborators {
        reporter: &reporter,
        probe: &probe,
        launcher: &ExecLauncher,
    };
    Ok(run_startup(config, mode, identity, collaborators)?)
}

#[cfg(test)]
mod tests;
