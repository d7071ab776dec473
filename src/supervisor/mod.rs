// src/supervisor/mod.rs

//! Per-application supervision.
//!
//! This module is responsible for:
//! - The [`ModuleSupervisor`] state machine: load into a fresh boundary,
//!   retry with jittered backoff, reload on debounced file changes, and
//!   stop with bounded teardown ([`core`]).
//! - Retry and debounce timing ([`timing`]).
//! - Bounded-attempt boundary teardown ([`teardown`]).

pub mod core;
pub mod teardown;
pub mod timing;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::boundary::IsolationHost;
use crate::fs::{FileSystem, RealFileSystem};
use crate::relay::{DiagnosticsSink, TracingSink};

pub use self::core::ModuleSupervisor;
pub use teardown::destroy_with_retry;
pub use timing::{duration_millis, JitterRange, SupervisorTiming};

/// What every supervisor in a host shares.
#[derive(Clone)]
pub struct SupervisorSettings {
    pub host: Arc<dyn IsolationHost>,
    /// Directory the dependency bridge resolves shared modules from.
    pub shared_dir: PathBuf,
    pub timing: SupervisorTiming,
    /// Used for the directory and config existence checks.
    pub fs: Arc<dyn FileSystem>,
    pub sink: Arc<dyn DiagnosticsSink>,
}

impl fmt::Debug for SupervisorSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupervisorSettings")
            .field("host", &self.host)
            .field("shared_dir", &self.shared_dir)
            .field("timing", &self.timing)
            .finish_non_exhaustive()
    }
}

impl SupervisorSettings {
    /// Default timing, the real filesystem, and relayed diagnostics going to
    /// `tracing`.
    pub fn new(host: Arc<dyn IsolationHost>, shared_dir: impl Into<PathBuf>) -> Self {
        Self {
            host,
            shared_dir: shared_dir.into(),
            timing: SupervisorTiming::default(),
            fs: Arc::new(RealFileSystem),
            sink: Arc::new(TracingSink),
        }
    }

    pub fn with_timing(mut self, timing: SupervisorTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticsSink>) -> Self {
        self.sink = sink;
        self
    }
}
