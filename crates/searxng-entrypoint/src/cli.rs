//! Command-line flags for the container entrypoint.

use clap::Parser;

const ENVIRONMENT_HELP: &str = "\
Environment variables:
  INSTANCE_NAME          settings.yml : general.instance_name
  AUTOCOMPLETE           settings.yml : search.autocomplete
  BASE_URL               settings.yml : server.base_url
  MORTY_URL              settings.yml : result_proxy.url
  MORTY_KEY              settings.yml : result_proxy.key
  BIND_ADDRESS           uwsgi bind to the specified TCP socket using HTTP protocol.
                         Default value: 0.0.0.0:8080
  UWSGI_WORKERS          uwsgi.ini : workers (default: number of CPU cores)
  UWSGI_THREADS          uwsgi.ini : threads (default: 4)
  UWSGI_SETTINGS_PATH    live uwsgi.ini (default: /etc/searxng/uwsgi.ini)
  SEARXNG_SETTINGS_PATH  live settings.yml (default: /etc/searxng/settings.yml)
  ENTRYPOINT_LOG         log filter (default: info)
  ENTRYPOINT_LOG_FORMAT  compact or json (default: compact)

Volume:
  /etc/searxng           the docker entry point copies settings.yml and uwsgi.ini in
                         this directory (see the -f option)";

/// Flags accepted by `docker-entrypoint`.
#[derive(Parser, Debug, Clone, Copy, PartialEq, Eq)]
#[command(
    name = "docker-entrypoint",
    about = "Prepare the SearXNG configuration and start uWSGI.",
    disable_version_flag = true,
    after_help = ENVIRONMENT_HELP
)]
pub struct Cli {
    /// Dry run: update the configuration files and exit without starting uWSGI.
    #[arg(short = 'd', long = "dry-run")]
    pub dry_run: bool,
    /// Always update the configuration files; existing files are renamed
    /// with the `.old` suffix. Without this option, new configuration files
    /// are written with the `.new` suffix.
    #[arg(short = 'f', long = "force-update")]
    pub force_update: bool,
}
