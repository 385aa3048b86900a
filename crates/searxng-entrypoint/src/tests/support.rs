//! Test doubles and filesystem helpers shared by the unit and behaviour suites.

use std::cell::RefCell;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use entrypoint_config::{ConfigWarning, EntrypointConfig, vars};
use tempfile::TempDir;

use crate::launch::{LaunchError, LaunchPlan, Launcher};
use crate::legacy::LegacyError;
use crate::patch::{PatchError, Patcher};
use crate::probe::{ProbeError, VersionProbe};
use crate::reconcile::ReconcileOutcome;
use crate::reporter::StartupReporter;

/// uWSGI template shipped by [`Sandbox`].
pub const UWSGI_TEMPLATE: &str = "\
[uwsgi]
uid = searxng
gid = searxng

# Number of workers (usually CPU count)
workers = %k
threads = 4

master = true
lazy-apps = true
module = searx.webapp
";

/// Settings template shipped by [`Sandbox`].
pub const SETTINGS_TEMPLATE: &str = "\
use_default_settings: true
general:
  instance_name: searxng
search:
  autocomplete: ''
server:
  base_url: false
  secret_key: ultrasecretkey
  image_proxy: false
";

/// Temporary image layout: templates, the live volume and the legacy volume.
pub struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    /// Creates the layout with both templates and an empty live volume.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let sandbox = Self { dir };
        fs::create_dir_all(sandbox.path("templates")).expect("templates dir");
        fs::create_dir_all(sandbox.path("searxng")).expect("live volume");
        fs::create_dir_all(sandbox.path("searx")).expect("legacy volume");
        fs::write(sandbox.reference_uwsgi(), UWSGI_TEMPLATE).expect("uwsgi template");
        fs::write(sandbox.reference_settings(), SETTINGS_TEMPLATE).expect("settings template");
        sandbox
    }

    /// Path relative to the sandbox root.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// Live `uwsgi.ini`.
    pub fn uwsgi(&self) -> PathBuf {
        self.path("searxng/uwsgi.ini")
    }

    /// Live `settings.yml`.
    pub fn settings(&self) -> PathBuf {
        self.path("searxng/settings.yml")
    }

    /// Shipped `uwsgi.ini` template.
    pub fn reference_uwsgi(&self) -> PathBuf {
        self.path("templates/uwsgi.ini")
    }

    /// Shipped `settings.yml` template.
    pub fn reference_settings(&self) -> PathBuf {
        self.path("templates/settings.yml")
    }

    /// Deprecated volume.
    pub fn legacy_dir(&self) -> PathBuf {
        self.path("searx")
    }

    /// Configuration pointing at the sandbox, plus `extra` variables.
    pub fn config(&self, extra: &[(&str, &str)]) -> EntrypointConfig {
        let paths = [
            (vars::UWSGI_SETTINGS_PATH, self.uwsgi()),
            (vars::SEARXNG_SETTINGS_PATH, self.settings()),
            (vars::SEARXNG_REFERENCE_UWSGI, self.reference_uwsgi()),
            (vars::SEARXNG_REFERENCE_SETTINGS, self.reference_settings()),
            (vars::SEARXNG_LEGACY_DIR, self.legacy_dir()),
        ];
        EntrypointConfig::from_lookup(|name| {
            extra
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value).to_owned())
                .or_else(|| {
                    paths
                        .iter()
                        .find(|(key, _)| *key == name)
                        .map(|(_, path)| path.display().to_string())
                })
        })
    }
}

/// Line appended by [`RecordingPatcher`].
pub const PATCH_MARKER: &str = "# patched\n";

/// Patcher that appends [`PATCH_MARKER`] and records every patched path.
#[derive(Debug, Default)]
pub struct RecordingPatcher {
    calls: RefCell<Vec<PathBuf>>,
}

impl RecordingPatcher {
    /// Paths patched so far, in order.
    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.borrow().clone()
    }
}

impl Patcher for RecordingPatcher {
    fn patch(&self, path: &Path) -> Result<(), PatchError> {
        self.calls.borrow_mut().push(path.to_path_buf());
        let mut contents = fs::read_to_string(path).map_err(|source| PatchError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        contents.push_str(PATCH_MARKER);
        fs::write(path, contents).map_err(|source| PatchError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Sets the modification time of `path` to `secs` seconds ago.
pub fn age(path: &Path, secs: u64) {
    let when = SystemTime::now() - Duration::from_secs(secs);
    File::options()
        .write(true)
        .open(path)
        .and_then(|file| file.set_modified(when))
        .expect("set modification time");
}

/// Makes `newer` strictly more recent than `older`.
pub fn make_newer(newer: &Path, older: &Path) {
    age(older, 600);
    age(newer, 60);
}

/// Startup events captured by [`RecordingReporter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEvent {
    /// A configuration warning was surfaced.
    ConfigWarning(ConfigWarning),
    /// The version probe finished.
    VersionDetected(String),
    /// Legacy settings were copied forward.
    LegacySettingsCopied,
    /// A legacy `uwsgi.ini` was ignored.
    LegacyUwsgiIgnored,
    /// The deprecated volume banner was emitted.
    LegacyVolumeMounted,
    /// A legacy step failed.
    LegacyStepFailed,
    /// A configuration pair was reconciled.
    Reconciled(ReconcileOutcome),
    /// The run stopped before launch.
    DryRun,
    /// The process server was about to launch.
    Launching {
        /// Binary name.
        program: String,
        /// HTTP socket.
        bind_address: String,
    },
}

/// Records startup events for assertions.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<ReportEvent>>,
}

impl RecordingReporter {
    /// Captures a copy of the recorded events.
    pub fn events(&self) -> Vec<ReportEvent> {
        self.events
            .lock()
            .expect("startup reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: ReportEvent) {
        self.events
            .lock()
            .expect("startup reporter mutex poisoned")
            .push(event);
    }
}

impl StartupReporter for RecordingReporter {
    fn config_warning(&self, warning: &ConfigWarning) {
        self.record(ReportEvent::ConfigWarning(warning.clone()));
    }

    fn version_detected(&self, version: &str) {
        self.record(ReportEvent::VersionDetected(version.to_owned()));
    }

    fn legacy_settings_copied(&self, _from: &Path, _to: &Path) {
        self.record(ReportEvent::LegacySettingsCopied);
    }

    fn legacy_uwsgi_ignored(&self, _path: &Path) {
        self.record(ReportEvent::LegacyUwsgiIgnored);
    }

    fn legacy_volume_mounted(&self, _legacy_dir: &Path, _new_dir: &Path) {
        self.record(ReportEvent::LegacyVolumeMounted);
    }

    fn legacy_step_failed(&self, _error: &LegacyError) {
        self.record(ReportEvent::LegacyStepFailed);
    }

    fn reconciled(&self, outcome: &ReconcileOutcome) {
        self.record(ReportEvent::Reconciled(outcome.clone()));
    }

    fn dry_run(&self) {
        self.record(ReportEvent::DryRun);
    }

    fn launching(&self, program: &str, bind_address: &str) {
        self.record(ReportEvent::Launching {
            program: program.to_owned(),
            bind_address: bind_address.to_owned(),
        });
    }
}

/// Version probe returning canned output.
#[derive(Debug, Clone)]
pub struct StubProbe {
    output: Option<String>,
}

impl StubProbe {
    /// Probe that prints `raw`.
    pub fn output(raw: &str) -> Self {
        Self {
            output: Some(raw.to_owned()),
        }
    }

    /// Probe whose interpreter exits unsuccessfully.
    pub fn failing() -> Self {
        Self { output: None }
    }
}

impl VersionProbe for StubProbe {
    fn probe(&self) -> Result<String, ProbeError> {
        self.output.clone().ok_or_else(|| ProbeError::Status {
            program: "python3".to_owned(),
            status: "exit status: 1".to_owned(),
        })
    }
}

/// Launcher that records plans instead of replacing the process.
#[derive(Debug, Default)]
pub struct RecordingLauncher {
    plans: RefCell<Vec<LaunchPlan>>,
}

impl RecordingLauncher {
    /// Plans launched so far.
    pub fn plans(&self) -> Vec<LaunchPlan> {
        self.plans.borrow().clone()
    }
}

impl Launcher for RecordingLauncher {
    fn launch(&self, plan: &LaunchPlan) -> Result<ExitCode, LaunchError> {
        self.plans.borrow_mut().push(plan.clone());
        Ok(ExitCode::SUCCESS)
    }
}
