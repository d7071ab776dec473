// src/modules/loader.rs

//! Per-boundary module loader.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use tracing::warn;

use crate::modules::directory::ModuleDirectory;
use crate::modules::identity::ModuleIdentity;
use crate::modules::{LoadedModule, ModuleResolver};

/// Resolves module references for code running inside one boundary.
///
/// The boundary's own directory is consulted first; installed resolvers are
/// then tried in installation order. A resolver that panics counts as
/// "not found" and the next one is tried.
#[derive(Debug)]
pub struct ModuleLoader {
    local: ModuleDirectory,
    resolvers: RwLock<Vec<Arc<dyn ModuleResolver>>>,
}

impl std::fmt::Debug for dyn ModuleResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleResolver")
            .field("directory", &self.directory())
            .finish()
    }
}

impl ModuleLoader {
    pub fn new(local: ModuleDirectory) -> Self {
        Self {
            local,
            resolvers: RwLock::new(Vec::new()),
        }
    }

    pub fn add_resolver(&self, resolver: Arc<dyn ModuleResolver>) {
        self.resolvers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(resolver);
    }

    pub fn load(&self, request: &ModuleIdentity) -> Option<Arc<LoadedModule>> {
        if let Some(found) = self.local.resolve(request) {
            return Some(found);
        }

        let resolvers = self.resolvers.read().unwrap_or_else(|e| e.into_inner()).clone();
        for resolver in resolvers {
            match catch_unwind(AssertUnwindSafe(|| resolver.resolve(request))) {
                Ok(Some(found)) => return Some(found),
                Ok(None) => {}
                Err(_) => warn!(request = %request, "module resolver panicked; treating as not found"),
            }
        }
        None
    }

    /// The boundary directory followed by every resolver directory.
    pub fn search_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = vec![self.local.dir().to_path_buf()];
        let resolvers = self.resolvers.read().unwrap_or_else(|e| e.into_inner());
        dirs.extend(
            resolvers
                .iter()
                .filter_map(|r| r.directory().map(|d| d.to_path_buf())),
        );
        dirs
    }

    /// Drop every installed resolver.
    pub(crate) fn clear(&self) {
        self.resolvers.write().unwrap_or_else(|e| e.into_inner()).clear();
    }
}
