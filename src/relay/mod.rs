// src/relay/mod.rs

//! Diagnostics relay.
//!
//! Carries text written to a boundary's [`BoundaryLog`](crate::boundary::BoundaryLog)
//! out to the host's logging sink:
//!
//! - an [`InsideRelay`] is instantiated inside the boundary and listens on
//!   its log; it only holds the sending half of a channel;
//! - a [`RelayReceiver`] task outside drains the channel, prefixes each line
//!   with the boundary's identity, and writes it to a [`DiagnosticsSink`].
//!
//! Order is preserved and each message is delivered once. When the boundary
//! closes, its log drops the inside relay, the channel drains, and the
//! receiver task ends.

pub mod sink;

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::boundary::{BoundaryContext, BoundaryHandle, InsideObject, LogListener};
use crate::errors::BoundaryError;

pub use sink::{DiagnosticsSink, TracingSink};

/// Lives inside the boundary; forwards every log message over a channel.
#[derive(Debug)]
pub struct InsideRelay {
    tx: mpsc::UnboundedSender<String>,
}

impl InsideObject for InsideRelay {
    type Args = mpsc::UnboundedSender<String>;
    const TYPE_NAME: &'static str = "InsideRelay";

    fn construct(_ctx: &Arc<BoundaryContext>, tx: Self::Args) -> anyhow::Result<Self> {
        Ok(Self { tx })
    }
}

impl LogListener for InsideRelay {
    fn on_message(&self, text: &str) {
        // Receiver gone: the message is dropped.
        let _ = self.tx.send(text.to_string());
    }
}

/// Host-side half of a relay.
#[derive(Debug)]
pub struct RelayReceiver {
    identity: String,
    task: JoinHandle<()>,
}

impl RelayReceiver {
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Wait until every message written before the boundary closed has been
    /// handed to the sink.
    pub async fn finished(self) {
        let _ = self.task.await;
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

pub struct DiagnosticsRelay;

impl DiagnosticsRelay {
    /// Relay `boundary`'s log to `sink`. Called once, right after the
    /// boundary is created.
    pub fn listen_to(
        boundary: &BoundaryHandle,
        sink: Arc<dyn DiagnosticsSink>,
        runtime: &Handle,
    ) -> Result<RelayReceiver, BoundaryError> {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let inside = boundary.instantiate::<InsideRelay>(tx)?;
        boundary.context().log().add_listener(inside);

        let identity = boundary.name().to_string();
        let prefix = format!("[{identity}] ");
        let task = runtime.spawn(async move {
            while let Some(text) = rx.recv().await {
                sink.write_line(&format!("{prefix}{text}"));
            }
        });

        debug!(boundary = %identity, "diagnostics relay attached");
        Ok(RelayReceiver { identity, task })
    }
}
