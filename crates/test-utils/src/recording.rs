use std::sync::Mutex;

use appvisor::group::{HostControl, LifecycleHooks};
use appvisor::relay::DiagnosticsSink;

/// Collects relayed diagnostics lines.
#[derive(Debug, Default)]
pub struct RecordingSink {
    lines: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.lock().unwrap().iter().any(|l| l.contains(needle))
    }
}

impl DiagnosticsSink for RecordingSink {
    fn write_line(&self, line: &str) {
        self.lines.lock().unwrap().push(line.to_string());
    }
}

/// Records which lifecycle hooks ran, in order.
#[derive(Debug, Default)]
pub struct RecordingHooks {
    events: Mutex<Vec<&'static str>>,
}

impl RecordingHooks {
    pub fn events(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: &'static str) {
        self.events.lock().unwrap().push(event);
    }
}

impl LifecycleHooks for RecordingHooks {
    fn on_starting(&self, _control: &HostControl) {
        self.push("starting");
    }

    fn on_started(&self, _control: &HostControl) {
        self.push("started");
    }

    fn on_stopping(&self, _control: &HostControl) {
        self.push("stopping");
    }

    fn on_stopped(&self, _control: &HostControl) {
        self.push("stopped");
    }
}
