// src/relay/sink.rs

use tracing::info;

/// Host-side destination for relayed boundary diagnostics.
pub trait DiagnosticsSink: Send + Sync + 'static {
    fn write_line(&self, line: &str);
}

/// Re-emits relayed lines as `tracing` events under `appvisor::relay`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn write_line(&self, line: &str) {
        info!(target: "appvisor::relay", "{line}");
    }
}
