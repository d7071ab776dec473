// src/boundary/local.rs

//! In-process boundaries.
//!
//! Workloads are compiled into the host binary and registered in a
//! [`WorkloadCatalog`]. Creating a boundary runs the workload's factory
//! against the fresh [`BoundaryContext`], which is where the workload
//! publishes its service locator.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::info;

use crate::boundary::context::BoundaryContext;
use crate::boundary::{BoundaryHandle, BoundaryRequest, IsolationHost};
use crate::errors::BoundaryError;

/// Populates a boundary with one workload's entry points.
pub type WorkloadFactory = Arc<dyn Fn(&Arc<BoundaryContext>) -> anyhow::Result<()> + Send + Sync>;

#[derive(Clone, Default)]
pub struct WorkloadCatalog {
    factories: HashMap<String, WorkloadFactory>,
}

impl fmt::Debug for WorkloadCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}

impl WorkloadCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&Arc<BoundaryContext>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    pub fn get(&self, name: &str) -> Option<WorkloadFactory> {
        self.factories.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LocalHost {
    catalog: WorkloadCatalog,
}

impl LocalHost {
    pub fn new(catalog: WorkloadCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &WorkloadCatalog {
        &self.catalog
    }
}

impl IsolationHost for LocalHost {
    fn create_boundary(&self, request: &BoundaryRequest) -> Result<BoundaryHandle, BoundaryError> {
        let handle = BoundaryHandle::open(request)?;
        let key = handle
            .context()
            .components()
            .entry
            .locator
            .clone()
            .unwrap_or_else(|| request.name.clone());

        let Some(factory) = self.catalog.get(&key) else {
            handle.close();
            return Err(BoundaryError::Create {
                name: request.name.clone(),
                reason: format!("no workload named '{key}' in the catalog"),
            });
        };

        if let Err(err) = factory(handle.context()) {
            handle.close();
            return Err(BoundaryError::Create {
                name: request.name.clone(),
                reason: format!("workload '{key}' failed to initialise: {err:#}"),
            });
        }

        info!(boundary = %handle.name(), id = handle.id(), workload = %key, "local boundary created");
        Ok(handle)
    }

    fn destroy_boundary(&self, boundary: &BoundaryHandle) -> Result<(), BoundaryError> {
        boundary.close();
        info!(boundary = %boundary.name(), id = boundary.id(), "local boundary destroyed");
        Ok(())
    }
}
