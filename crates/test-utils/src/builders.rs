#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use tempfile::TempDir;

use appvisor::descriptor::{ApplicationDescriptor, DEFAULT_COMPONENTS_CONFIG};
use appvisor::supervisor::{JitterRange, SupervisorTiming};

/// Builder for an application directory on disk.
pub struct AppDirBuilder {
    components: Option<String>,
    files: Vec<(String, Vec<u8>)>,
}

impl AppDirBuilder {
    /// An application directory with an empty `Components.config`.
    pub fn new() -> Self {
        Self {
            components: Some(String::new()),
            files: Vec::new(),
        }
    }

    /// Point the in-process host at catalog entry `key`.
    pub fn locator(self, key: &str) -> Self {
        self.components(&format!("[entry]\nlocator = \"{key}\"\n"))
    }

    pub fn components(mut self, toml: &str) -> Self {
        self.components = Some(toml.to_string());
        self
    }

    /// Leave `Components.config` out.
    pub fn without_config(mut self) -> Self {
        self.components = None;
        self
    }

    pub fn file(mut self, rel: &str, contents: impl Into<Vec<u8>>) -> Self {
        self.files.push((rel.to_string(), contents.into()));
        self
    }

    pub fn build(self) -> TempDir {
        let dir = tempfile::tempdir().expect("create app dir");
        if let Some(components) = &self.components {
            write_components(dir.path(), components);
        }
        for (rel, contents) in &self.files {
            let path = dir.path().join(rel);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).expect("create parent dir");
            }
            std::fs::write(path, contents).expect("write app file");
        }
        dir
    }
}

impl Default for AppDirBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn write_components(dir: &Path, toml: &str) {
    std::fs::write(dir.join(DEFAULT_COMPONENTS_CONFIG), toml).expect("write Components.config");
}

pub fn descriptor(name: &str, dir: &Path) -> ApplicationDescriptor {
    ApplicationDescriptor::new(name, dir)
}

/// Default timing with a negligible teardown pause; for tests on a paused
/// clock.
pub fn paused_timing() -> SupervisorTiming {
    SupervisorTiming {
        teardown_pause: Duration::from_millis(5),
        ..SupervisorTiming::default()
    }
}

/// Sub-second timing for tests on the real clock.
pub fn fast_timing() -> SupervisorTiming {
    SupervisorTiming {
        first_attempt: Duration::from_millis(20),
        missing_retry: JitterRange::new(Duration::from_millis(200), Duration::from_millis(400)),
        fault_retry: JitterRange::new(Duration::from_millis(100), Duration::from_millis(200)),
        reload_delay: JitterRange::new(Duration::from_millis(100), Duration::from_millis(200)),
        debounce: Duration::from_millis(300),
        teardown_attempts: 3,
        teardown_pause: Duration::from_millis(5),
    }
}
