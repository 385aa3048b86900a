use std::path::Path;

use entrypoint_config::UwsgiTuning;
use tracing::debug;

use super::ini::IniDocument;
use super::{PatchError, Patcher, read_document, write_document};

const UWSGI_SECTION: &str = "uwsgi";

/// Writes the worker and thread counts into the `[uwsgi]` section.
#[derive(Debug, Clone, Copy)]
pub struct UwsgiPatcher {
    tuning: UwsgiTuning,
}

impl UwsgiPatcher {
    /// Builds a patcher for the resolved tuning.
    #[must_use]
    pub const fn new(tuning: UwsgiTuning) -> Self {
        Self { tuning }
    }
}

impl Patcher for UwsgiPatcher {
    fn patch(&self, path: &Path) -> Result<(), PatchError> {
        let mut document = IniDocument::parse(&read_document(path)?);
        document.set(UWSGI_SECTION, "workers", &self.tuning.workers.to_string());
        document.set(UWSGI_SECTION, "threads", &self.tuning.threads.to_string());
        debug!(
            target: crate::STARTUP_TARGET,
            path = %path.display(),
            workers = %self.tuning.workers,
            threads = %self.tuning.threads,
            "patched uwsgi configuration"
        );
        write_document(path, &document.render())
    }
}
