use std::num::NonZeroUsize;
use std::thread;

use camino::Utf8PathBuf;

/// Address the process server listens on when `BIND_ADDRESS` is unset.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Threads per uWSGI worker when `UWSGI_THREADS` is unset.
pub const DEFAULT_UWSGI_THREADS: usize = 4;

/// Live uWSGI configuration inside the mounted volume.
pub const DEFAULT_UWSGI_SETTINGS_PATH: &str = "/etc/searxng/uwsgi.ini";

/// Live application settings inside the mounted volume.
pub const DEFAULT_SEARXNG_SETTINGS_PATH: &str = "/etc/searxng/settings.yml";

/// uWSGI template shipped with the image.
pub const DEFAULT_REFERENCE_UWSGI: &str = "/usr/local/searxng/dockerfiles/uwsgi.ini";

/// Settings template shipped with the image.
pub const DEFAULT_REFERENCE_SETTINGS: &str = "/usr/local/searxng/searx/settings.yml";

/// Deprecated configuration volume.
pub const DEFAULT_LEGACY_DIR: &str = "/etc/searx";

/// Interpreter used to query the application version.
pub const DEFAULT_PYTHON: &str = "python3";

/// Process server binary.
pub const DEFAULT_UWSGI_BINARY: &str = "uwsgi";

/// Unprivileged account the application runs as.
pub const DEFAULT_SERVICE_USER: &str = "searxng";

/// Group of the unprivileged account.
pub const DEFAULT_SERVICE_GROUP: &str = "searxng";

/// Default log filter expression used by the entrypoint.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default log filter expression used by the entrypoint.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default logging format for the entrypoint.
#[must_use]
pub const fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Compact
}

/// Worker count used when `UWSGI_WORKERS` is unset: one per available core.
///
/// Falls back to a single worker when the parallelism of the host cannot be
/// determined.
#[must_use]
pub fn default_uwsgi_workers() -> NonZeroUsize {
    thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
}

/// Threads per worker used when `UWSGI_THREADS` is unset.
#[must_use]
pub const fn default_uwsgi_threads() -> NonZeroUsize {
    match NonZeroUsize::new(DEFAULT_UWSGI_THREADS) {
        Some(threads) => threads,
        None => NonZeroUsize::MIN,
    }
}

pub(crate) fn default_path(path: &str) -> Utf8PathBuf {
    Utf8PathBuf::from(path)
}
