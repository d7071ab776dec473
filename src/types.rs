use std::fmt;

use serde::Deserialize;

/// Lifecycle state of a single [`crate::supervisor::ModuleSupervisor`].
///
/// A boundary and its peer are alive only in `Loaded`. `AwaitingRetry` means
/// the last attempt failed (or a reload was requested) and a timer is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupervisorState {
    Unloaded,
    Loading,
    Loaded,
    AwaitingRetry,
    Unloading,
}

impl Default for SupervisorState {
    fn default() -> Self {
        SupervisorState::Unloaded
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SupervisorState::Unloaded => "unloaded",
            SupervisorState::Loading => "loading",
            SupervisorState::Loaded => "loaded",
            SupervisorState::AwaitingRetry => "awaiting-retry",
            SupervisorState::Unloading => "unloading",
        };
        f.write_str(s)
    }
}

/// Which isolation host the service binary uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostKind {
    /// Every boundary runs the application's `[entry].command` as a child process.
    Process,
    /// In-process boundaries backed by a compiled-in workload catalog.
    Local,
}

impl Default for HostKind {
    fn default() -> Self {
        HostKind::Process
    }
}
