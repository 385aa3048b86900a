//! Hand-off to the uWSGI process server.

use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::{Command, ExitCode};

use entrypoint_config::{EntrypointConfig, vars};
use thiserror::Error;

use crate::account::{Identity, run_as};

/// Errors raised while starting the process server.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Replacing the process image failed.
    #[error("failed to exec '{program}': {source}")]
    Exec {
        /// Process server binary.
        program: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Fully resolved process server invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    program: String,
    args: Vec<OsString>,
    settings_path: PathBuf,
    identity: Option<Identity>,
}

impl LaunchPlan {
    /// Builds `uwsgi --master --http-socket <bind> <uwsgi.ini>` from `config`.
    #[must_use]
    pub fn from_config(config: &EntrypointConfig, identity: Option<Identity>) -> Self {
        let args = vec![
            OsString::from("--master"),
            OsString::from("--http-socket"),
            OsString::from(config.bind_address()),
            OsString::from(config.paths().uwsgi.as_str()),
        ];
        Self {
            program: config.uwsgi_binary().to_owned(),
            args,
            settings_path: config.settings_path().as_std_path().to_path_buf(),
            identity,
        }
    }

    /// Process server binary.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments passed to the process server.
    #[must_use]
    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Identity the process server runs as, if it is switched.
    #[must_use]
    pub const fn identity(&self) -> Option<Identity> {
        self.identity
    }

    /// Builds the command with the child environment applied.
    ///
    /// The result proxy key never reaches the process server; the settings
    /// location does.
    #[must_use]
    pub fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .env(vars::SEARXNG_SETTINGS_PATH, &self.settings_path)
            .env_remove(vars::MORTY_KEY);
        run_as(&mut command, self.identity);
        command
    }
}

/// Starts the process server described by a [`LaunchPlan`].
pub trait Launcher {
    /// Runs `plan`. Process-replacing launchers only return on failure.
    fn launch(&self, plan: &LaunchPlan) -> Result<ExitCode, LaunchError>;
}

/// Replaces the current process with the process server.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExecLauncher;

impl Launcher for ExecLauncher {
    #[cfg(unix)]
    fn launch(&self, plan: &LaunchPlan) -> Result<ExitCode, LaunchError> {
        use std::os::unix::process::CommandExt;

        let source = plan.command().exec();
        Err(LaunchError::Exec {
            program: plan.program.clone(),
            source,
        })
    }

    #[cfg(not(unix))]
    fn launch(&self, plan: &LaunchPlan) -> Result<ExitCode, LaunchError> {
        let status = plan
            .command()
            .status()
            .map_err(|source| LaunchError::Exec {
                program: plan.program.clone(),
                source,
            })?;
        Ok(status
            .code()
            .and_then(|code| u8::try_from(code).ok())
            .map_or(ExitCode::FAILURE, ExitCode::from))
    }
}
