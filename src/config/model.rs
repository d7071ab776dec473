// src/config/model.rs

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::descriptor::ApplicationDescriptor;
use crate::supervisor::SupervisorTiming;
use crate::types::HostKind;

/// Configuration exactly as read from `Appvisor.toml`.
///
/// ```toml
/// [supervisor]
/// host = "process"
/// shared_dir = "lib"
///
/// [timing]
/// missing_retry_min = "5m"
/// missing_retry_max = "10m"
///
/// [[application]]
/// name = "Orders"
/// path = "/apps/orders"
/// watch = true
/// ```
///
/// Everything except the application list is optional. Turn it into a
/// [`ConfigFile`] with `ConfigFile::try_from`, which validates it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub supervisor: SupervisorSection,

    #[serde(default)]
    pub timing: TimingSection,

    /// `[[application]]` entries, in declaration order.
    #[serde(default)]
    pub application: Vec<ApplicationConfig>,
}

/// `[supervisor]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SupervisorSection {
    #[serde(default)]
    pub host: HostKind,

    /// Directory the dependency bridge resolves shared modules from.
    /// Defaults to the directory of the running executable.
    #[serde(default)]
    pub shared_dir: Option<PathBuf>,
}

/// `[timing]` section. Durations use `ms`, `s`, `m` or `h` suffixes; any
/// key left out keeps its default.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimingSection {
    #[serde(default)]
    pub first_attempt: Option<String>,
    #[serde(default)]
    pub missing_retry_min: Option<String>,
    #[serde(default)]
    pub missing_retry_max: Option<String>,
    #[serde(default)]
    pub fault_retry_min: Option<String>,
    #[serde(default)]
    pub fault_retry_max: Option<String>,
    #[serde(default)]
    pub reload_delay_min: Option<String>,
    #[serde(default)]
    pub reload_delay_max: Option<String>,
    #[serde(default)]
    pub debounce: Option<String>,
    #[serde(default)]
    pub teardown_attempts: Option<u32>,
    #[serde(default)]
    pub teardown_pause: Option<String>,
}

/// `[[application]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApplicationConfig {
    pub name: String,

    /// Application directory. Relative paths are relative to the config
    /// file's directory.
    pub path: PathBuf,

    /// Components config; relative to `path`. Defaults to
    /// `Components.config`.
    #[serde(default)]
    pub config: Option<PathBuf>,

    #[serde(default)]
    pub watch: bool,

    #[serde(default)]
    pub shadow_copy: bool,
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub supervisor: SupervisorSection,
    pub timing: SupervisorTiming,
    pub application: Vec<ApplicationConfig>,
}

impl ConfigFile {
    /// Assemble an already validated configuration.
    pub(crate) fn new_unchecked(
        supervisor: SupervisorSection,
        timing: SupervisorTiming,
        application: Vec<ApplicationConfig>,
    ) -> Self {
        Self {
            supervisor,
            timing,
            application,
        }
    }

    /// Resolve relative application paths and `shared_dir` against `base`.
    pub fn rebase(mut self, base: &Path) -> Self {
        for app in &mut self.application {
            if app.path.is_relative() {
                app.path = base.join(&app.path);
            }
        }
        if let Some(dir) = self.supervisor.shared_dir.as_mut() {
            if dir.is_relative() {
                *dir = base.join(&*dir);
            }
        }
        self
    }

    pub fn descriptors(&self) -> Vec<ApplicationDescriptor> {
        self.application
            .iter()
            .map(|app| {
                let d = ApplicationDescriptor::new(app.name.clone(), app.path.clone())
                    .with_watch(app.watch)
                    .with_shadow_copy(app.shadow_copy);
                match &app.config {
                    Some(config) => d.with_config_path(config),
                    None => d,
                }
            })
            .collect()
    }

    /// The configured shared directory, or the executable's directory.
    pub fn shared_dir(&self) -> PathBuf {
        if let Some(dir) = &self.supervisor.shared_dir {
            return dir.clone();
        }
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}
