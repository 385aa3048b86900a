//! `docker-entrypoint` binary for the SearXNG container image.
//!
//! Delegates to [`searxng_entrypoint::run`], which prepares the configuration
//! volume and hands the process over to uWSGI.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    searxng_entrypoint::run(std::env::args_os(), &mut stdout, &mut stderr)
}
