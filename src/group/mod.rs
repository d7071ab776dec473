// src/group/mod.rs

//! A host's set of supervisors.
//!
//! This module is responsible for:
//! - Building one [`ModuleSupervisor`] per descriptor, rejecting empty and
//!   duplicate names.
//! - Fanning `start` / `stop` out to every member and ANDing the results;
//!   a failing member never prevents the others from being attempted.
//! - Running [`LifecycleHooks`] around both, with a [`HostControl`] that
//!   lets host code stop or restart the process.

pub mod control;
pub mod hooks;

use std::collections::HashSet;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{error, info};

use crate::descriptor::ApplicationDescriptor;
use crate::errors::{AppvisorError, Result};
use crate::supervisor::{ModuleSupervisor, SupervisorSettings};

pub use control::{ControlRequest, HostControl};
pub use hooks::{LifecycleHooks, LoggingHooks};

pub struct SupervisorGroup {
    supervisors: Vec<ModuleSupervisor>,
    hooks: Vec<Arc<dyn LifecycleHooks>>,
    control: HostControl,
}

impl std::fmt::Debug for SupervisorGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupervisorGroup")
            .field("supervisors", &self.supervisors)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

impl SupervisorGroup {
    /// Must be called from within a Tokio runtime.
    pub fn new(
        descriptors: Vec<ApplicationDescriptor>,
        settings: SupervisorSettings,
        control: HostControl,
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        for d in &descriptors {
            if d.name().trim().is_empty() {
                return Err(AppvisorError::ConfigError(
                    "application name must not be empty".to_string(),
                ));
            }
            if !seen.insert(d.name().to_string()) {
                return Err(AppvisorError::DuplicateApplication(d.name().to_string()));
            }
        }

        let supervisors = descriptors
            .into_iter()
            .map(|d| ModuleSupervisor::new(d, settings.clone()))
            .collect();

        Ok(Self {
            supervisors,
            hooks: Vec::new(),
            control,
        })
    }

    pub fn with_hooks(mut self, hooks: impl LifecycleHooks + 'static) -> Self {
        self.hooks.push(Arc::new(hooks));
        self
    }

    pub fn supervisors(&self) -> &[ModuleSupervisor] {
        &self.supervisors
    }

    pub fn get(&self, name: &str) -> Option<&ModuleSupervisor> {
        self.supervisors.iter().find(|s| s.name() == name)
    }

    pub fn control(&self) -> &HostControl {
        &self.control
    }

    /// Start every supervisor. `true` only if all of them started.
    pub fn start(&self) -> bool {
        for h in &self.hooks {
            h.on_starting(&self.control);
        }

        let mut ok = true;
        for supervisor in &self.supervisors {
            if let Err(e) = supervisor.start() {
                error!(app = %supervisor.name(), error = %e, "supervisor failed to start");
                ok = false;
            }
        }

        for h in &self.hooks {
            h.on_started(&self.control);
        }
        info!(applications = self.supervisors.len(), ok, "group start complete");
        ok
    }

    /// Stop every supervisor concurrently. `true` only if all of them
    /// stopped cleanly.
    pub async fn stop(&self) -> bool {
        for h in &self.hooks {
            h.on_stopping(&self.control);
        }

        let mut set = JoinSet::new();
        for supervisor in &self.supervisors {
            let supervisor = supervisor.clone();
            set.spawn(async move {
                let result = supervisor.stop().await;
                (supervisor, result)
            });
        }

        let mut ok = true;
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((_, Ok(()))) => {}
                Ok((supervisor, Err(e))) => {
                    error!(app = %supervisor.name(), error = %e, "supervisor failed to stop");
                    ok = false;
                }
                Err(e) => {
                    error!(error = %e, "supervisor stop task failed");
                    ok = false;
                }
            }
        }

        for h in &self.hooks {
            h.on_stopped(&self.control);
        }
        info!(applications = self.supervisors.len(), ok, "group stop complete");
        ok
    }
}
