// src/group/control.rs

use tokio::sync::mpsc;
use tracing::debug;

/// What the host process is asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlRequest {
    Stop,
    Restart,
}

/// Handed to lifecycle hooks so host-level code can stop or restart the
/// whole process. Requests are delivered to whoever owns the receiver
/// returned by [`HostControl::channel`].
#[derive(Debug, Clone)]
pub struct HostControl {
    tx: mpsc::UnboundedSender<ControlRequest>,
}

impl HostControl {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ControlRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// `false` if the host loop is no longer listening.
    pub fn stop(&self) -> bool {
        self.send(ControlRequest::Stop)
    }

    /// `false` if the host loop is no longer listening.
    pub fn restart(&self) -> bool {
        self.send(ControlRequest::Restart)
    }

    fn send(&self, request: ControlRequest) -> bool {
        debug!(?request, "host control request");
        self.tx.send(request).is_ok()
    }
}
