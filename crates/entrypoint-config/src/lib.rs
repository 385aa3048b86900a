//! Startup configuration for the SearXNG container entrypoint.
//!
//! The entrypoint reads its environment exactly once. [`EntrypointConfig`]
//! captures every value the startup pipeline needs (the settings
//! substitutions, uWSGI tuning, file locations and launch parameters) with
//! defaults already applied, so later steps never consult the ambient
//! environment again.
//!
//! Loading cannot fail. Values that do not parse fall back to their defaults
//! and are reported through [`EntrypointConfig::warnings`].

mod defaults;
mod logging;
mod settings;
mod warning;

use std::num::NonZeroUsize;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};

pub use defaults::{
    DEFAULT_BIND_ADDRESS, DEFAULT_LEGACY_DIR, DEFAULT_LOG_FILTER, DEFAULT_PYTHON,
    DEFAULT_REFERENCE_SETTINGS, DEFAULT_REFERENCE_UWSGI, DEFAULT_SEARXNG_SETTINGS_PATH,
    DEFAULT_SERVICE_GROUP, DEFAULT_SERVICE_USER, DEFAULT_UWSGI_BINARY,
    DEFAULT_UWSGI_SETTINGS_PATH, DEFAULT_UWSGI_THREADS, default_log_filter, default_log_format,
    default_uwsgi_threads, default_uwsgi_workers,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use settings::{BaseUrl, ResultProxy, SettingsValues};
pub use warning::ConfigWarning;

use defaults::default_path;

/// Environment variable names understood by the entrypoint.
pub mod vars {
    /// `general.instance_name`.
    pub const INSTANCE_NAME: &str = "INSTANCE_NAME";
    /// `search.autocomplete`.
    pub const AUTOCOMPLETE: &str = "AUTOCOMPLETE";
    /// `server.base_url`.
    pub const BASE_URL: &str = "BASE_URL";
    /// `result_proxy.url`.
    pub const MORTY_URL: &str = "MORTY_URL";
    /// `result_proxy.key`; removed from the process server environment.
    pub const MORTY_KEY: &str = "MORTY_KEY";
    /// uWSGI HTTP socket.
    pub const BIND_ADDRESS: &str = "BIND_ADDRESS";
    /// uWSGI worker processes.
    pub const UWSGI_WORKERS: &str = "UWSGI_WORKERS";
    /// uWSGI threads per worker.
    pub const UWSGI_THREADS: &str = "UWSGI_THREADS";
    /// Live uWSGI configuration.
    pub const UWSGI_SETTINGS_PATH: &str = "UWSGI_SETTINGS_PATH";
    /// Live application settings; also exported to the process server.
    pub const SEARXNG_SETTINGS_PATH: &str = "SEARXNG_SETTINGS_PATH";
    /// Settings template shipped with the image.
    pub const SEARXNG_REFERENCE_SETTINGS: &str = "SEARXNG_REFERENCE_SETTINGS";
    /// uWSGI template shipped with the image.
    pub const SEARXNG_REFERENCE_UWSGI: &str = "SEARXNG_REFERENCE_UWSGI";
    /// Deprecated configuration volume.
    pub const SEARXNG_LEGACY_DIR: &str = "SEARXNG_LEGACY_DIR";
    /// Interpreter used for the version probe.
    pub const SEARXNG_PYTHON: &str = "SEARXNG_PYTHON";
    /// Process server binary.
    pub const SEARXNG_UWSGI: &str = "SEARXNG_UWSGI";
    /// Service account user.
    pub const SEARXNG_USER: &str = "SEARXNG_USER";
    /// Service account group.
    pub const SEARXNG_GROUP: &str = "SEARXNG_GROUP";
    /// Log filter directive.
    pub const ENTRYPOINT_LOG: &str = "ENTRYPOINT_LOG";
    /// Log output format.
    pub const ENTRYPOINT_LOG_FORMAT: &str = "ENTRYPOINT_LOG_FORMAT";
}

/// Locations of the live configuration files and their templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    /// Live uWSGI configuration.
    pub uwsgi: Utf8PathBuf,
    /// uWSGI template shipped with the image.
    pub reference_uwsgi: Utf8PathBuf,
    /// Live application settings.
    pub settings: Utf8PathBuf,
    /// Settings template shipped with the image.
    pub reference_settings: Utf8PathBuf,
    /// Deprecated configuration volume.
    pub legacy_dir: Utf8PathBuf,
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self {
            uwsgi: default_path(DEFAULT_UWSGI_SETTINGS_PATH),
            reference_uwsgi: default_path(DEFAULT_REFERENCE_UWSGI),
            settings: default_path(DEFAULT_SEARXNG_SETTINGS_PATH),
            reference_settings: default_path(DEFAULT_REFERENCE_SETTINGS),
            legacy_dir: default_path(DEFAULT_LEGACY_DIR),
        }
    }
}

/// Unprivileged identity used for the version probe and the process server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceAccount {
    /// User name.
    pub user: String,
    /// Group name.
    pub group: String,
}

impl Default for ServiceAccount {
    fn default() -> Self {
        Self {
            user: DEFAULT_SERVICE_USER.to_owned(),
            group: DEFAULT_SERVICE_GROUP.to_owned(),
        }
    }
}

/// uWSGI tuning written into the process server configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UwsgiTuning {
    /// Worker processes.
    pub workers: NonZeroUsize,
    /// Threads per worker.
    pub threads: NonZeroUsize,
}

impl Default for UwsgiTuning {
    fn default() -> Self {
        Self {
            workers: default_uwsgi_workers(),
            threads: default_uwsgi_threads(),
        }
    }
}

/// Immutable configuration resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrypointConfig {
    settings: SettingsValues,
    uwsgi: UwsgiTuning,
    bind_address: String,
    paths: ConfigPaths,
    account: ServiceAccount,
    python: String,
    uwsgi_binary: String,
    log_filter: String,
    log_format: LogFormat,
    warnings: Vec<ConfigWarning>,
}

impl Default for EntrypointConfig {
    fn default() -> Self {
        Self {
            settings: SettingsValues::default(),
            uwsgi: UwsgiTuning::default(),
            bind_address: DEFAULT_BIND_ADDRESS.to_owned(),
            paths: ConfigPaths::default(),
            account: ServiceAccount::default(),
            python: DEFAULT_PYTHON.to_owned(),
            uwsgi_binary: DEFAULT_UWSGI_BINARY.to_owned(),
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
            log_format: default_log_format(),
            warnings: Vec::new(),
        }
    }
}

impl EntrypointConfig {
    /// Reads the process environment.
    ///
    /// Variables that are not valid Unicode are treated as unset.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// Empty values count as unset for every variable that has a default,
    /// mirroring the shell's `${VAR:-default}` expansion. `INSTANCE_NAME` and
    /// `AUTOCOMPLETE` are the exception: an explicitly empty value is written
    /// to the settings file as an empty string.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let mut warnings = Vec::new();

        let morty_url = non_empty(vars::MORTY_URL);
        let morty_key = non_empty(vars::MORTY_KEY);
        let result_proxy = ResultProxy::from_parts(morty_url.as_deref(), morty_key.as_deref());
        if result_proxy.is_none() && (morty_url.is_some() || morty_key.is_some()) {
            warnings.push(ConfigWarning::IncompleteResultProxy);
        }

        let settings = SettingsValues {
            instance_name: lookup(vars::INSTANCE_NAME),
            autocomplete: lookup(vars::AUTOCOMPLETE),
            base_url: non_empty(vars::BASE_URL).map(|raw| BaseUrl::new(&raw)),
            result_proxy,
        };

        let uwsgi = UwsgiTuning {
            workers: parse_count(
                vars::UWSGI_WORKERS,
                non_empty(vars::UWSGI_WORKERS),
                default_uwsgi_workers(),
                &mut warnings,
            ),
            threads: parse_count(
                vars::UWSGI_THREADS,
                non_empty(vars::UWSGI_THREADS),
                default_uwsgi_threads(),
                &mut warnings,
            ),
        };

        let path_or = |name: &str, default: &str| {
            non_empty(name).map_or_else(|| default_path(default), Utf8PathBuf::from)
        };
        let paths = ConfigPaths {
            uwsgi: path_or(vars::UWSGI_SETTINGS_PATH, DEFAULT_UWSGI_SETTINGS_PATH),
            reference_uwsgi: path_or(vars::SEARXNG_REFERENCE_UWSGI, DEFAULT_REFERENCE_UWSGI),
            settings: path_or(vars::SEARXNG_SETTINGS_PATH, DEFAULT_SEARXNG_SETTINGS_PATH),
            reference_settings: path_or(
                vars::SEARXNG_REFERENCE_SETTINGS,
                DEFAULT_REFERENCE_SETTINGS,
            ),
            legacy_dir: path_or(vars::SEARXNG_LEGACY_DIR, DEFAULT_LEGACY_DIR),
        };

        let text_or =
            |name: &str, default: &str| non_empty(name).unwrap_or_else(|| default.to_owned());

        let log_format = match non_empty(vars::ENTRYPOINT_LOG_FORMAT) {
            None => default_log_format(),
            Some(raw) => LogFormat::from_str(raw.trim()).unwrap_or_else(|source| {
                warnings.push(ConfigWarning::InvalidLogFormat {
                    variable: vars::ENTRYPOINT_LOG_FORMAT,
                    value: raw.clone(),
                    fallback: default_log_format(),
                    source,
                });
                default_log_format()
            }),
        };

        Self {
            settings,
            uwsgi,
            bind_address: text_or(vars::BIND_ADDRESS, DEFAULT_BIND_ADDRESS),
            paths,
            account: ServiceAccount {
                user: text_or(vars::SEARXNG_USER, DEFAULT_SERVICE_USER),
                group: text_or(vars::SEARXNG_GROUP, DEFAULT_SERVICE_GROUP),
            },
            python: text_or(vars::SEARXNG_PYTHON, DEFAULT_PYTHON),
            uwsgi_binary: text_or(vars::SEARXNG_UWSGI, DEFAULT_UWSGI_BINARY),
            log_filter: text_or(vars::ENTRYPOINT_LOG, DEFAULT_LOG_FILTER),
            log_format,
            warnings,
        }
    }

    /// Values substituted into the settings file.
    #[must_use]
    pub fn settings(&self) -> &SettingsValues {
        &self.settings
    }

    /// uWSGI worker and thread counts.
    #[must_use]
    pub fn uwsgi(&self) -> UwsgiTuning {
        self.uwsgi
    }

    /// Address the process server binds its HTTP socket to.
    #[must_use]
    pub fn bind_address(&self) -> &str {
        &self.bind_address
    }

    /// Live configuration and template locations.
    #[must_use]
    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    /// Live application settings path.
    #[must_use]
    pub fn settings_path(&self) -> &Utf8Path {
        &self.paths.settings
    }

    /// Unprivileged account for the probe and the process server.
    #[must_use]
    pub fn account(&self) -> &ServiceAccount {
        &self.account
    }

    /// Interpreter used for the version probe.
    #[must_use]
    pub fn python(&self) -> &str {
        &self.python
    }

    /// Process server binary.
    #[must_use]
    pub fn uwsgi_binary(&self) -> &str {
        &self.uwsgi_binary
    }

    /// Log filter directive.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Values that were rejected while loading.
    #[must_use]
    pub fn warnings(&self) -> &[ConfigWarning] {
        &self.warnings
    }
}

fn parse_count(
    variable: &'static str,
    raw: Option<String>,
    fallback: NonZeroUsize,
    warnings: &mut Vec<ConfigWarning>,
) -> NonZeroUsize {
    let Some(value) = raw else {
        return fallback;
    };
    value.trim().parse::<NonZeroUsize>().unwrap_or_else(|_| {
        warnings.push(ConfigWarning::InvalidCount {
            variable,
            value,
            fallback: fallback.get(),
        });
        fallback
    })
}
