// src/group/hooks.rs

use std::sync::Arc;

use tracing::info;

use crate::group::control::HostControl;

/// Observe the aggregate lifecycle of a [`SupervisorGroup`](super::SupervisorGroup).
///
/// All methods default to doing nothing.
pub trait LifecycleHooks: Send + Sync {
    fn on_starting(&self, _control: &HostControl) {}
    fn on_started(&self, _control: &HostControl) {}
    fn on_stopping(&self, _control: &HostControl) {}
    fn on_stopped(&self, _control: &HostControl) {}
}

impl<T: LifecycleHooks + ?Sized> LifecycleHooks for Arc<T> {
    fn on_starting(&self, control: &HostControl) {
        (**self).on_starting(control)
    }

    fn on_started(&self, control: &HostControl) {
        (**self).on_started(control)
    }

    fn on_stopping(&self, control: &HostControl) {
        (**self).on_stopping(control)
    }

    fn on_stopped(&self, control: &HostControl) {
        (**self).on_stopped(control)
    }
}

/// Logs each lifecycle step.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingHooks;

impl LifecycleHooks for LoggingHooks {
    fn on_starting(&self, _control: &HostControl) {
        info!("supervisor group starting");
    }

    fn on_started(&self, _control: &HostControl) {
        info!("supervisor group started");
    }

    fn on_stopping(&self, _control: &HostControl) {
        info!("supervisor group stopping");
    }

    fn on_stopped(&self, _control: &HostControl) {
        info!("supervisor group stopped");
    }
}
