// src/modules/bridge.rs

//! Resolution of module references from the host's shared directory.
//!
//! Shared framework binaries live once next to the supervisor instead of in
//! every application directory. A bridge is created inside each boundary and
//! registered with that boundary's [`ModuleLoader`](super::ModuleLoader), which
//! consults it only after the boundary's own directory came up empty.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::boundary::{BoundaryContext, BoundaryHandle, InsideObject};
use crate::errors::BoundaryError;
use crate::fs::FileSystem;
use crate::modules::directory::ModuleDirectory;
use crate::modules::identity::{FileNameProbe, ModuleIdentity};
use crate::modules::{LoadedModule, ModuleResolver};

#[derive(Debug)]
pub struct DependencyResolutionBridge {
    directory: ModuleDirectory,
}

/// Construction arguments when instantiating the bridge inside a boundary.
#[derive(Debug, Clone)]
pub struct BridgeArgs {
    pub dir: PathBuf,
    pub fs: Arc<dyn FileSystem>,
}

impl DependencyResolutionBridge {
    /// Eagerly enumerate and identify every module binary in `dir`.
    pub fn new(dir: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            directory: ModuleDirectory::scan(dir, fs, &FileNameProbe),
        }
    }

    /// Create a bridge inside `boundary` over `dir` and register it with the
    /// boundary's module loader.
    pub fn install(
        boundary: &BoundaryHandle,
        dir: &Path,
        fs: Arc<dyn FileSystem>,
    ) -> std::result::Result<Arc<Self>, BoundaryError> {
        let bridge = boundary.instantiate::<Self>(BridgeArgs {
            dir: dir.to_path_buf(),
            fs,
        })?;
        boundary.context().modules().add_resolver(bridge.clone());
        info!(
            boundary = %boundary.name(),
            dir = ?dir,
            candidates = bridge.directory.entries().len(),
            "dependency resolution bridge installed"
        );
        Ok(bridge)
    }

    pub fn candidates(&self) -> &[(PathBuf, ModuleIdentity)] {
        self.directory.entries()
    }
}

impl ModuleResolver for DependencyResolutionBridge {
    fn resolve(&self, request: &ModuleIdentity) -> Option<Arc<LoadedModule>> {
        let resolved = self.directory.resolve(request);
        if resolved.is_none() {
            debug!(request = %request, dir = ?self.directory.dir(), "bridge could not resolve module");
        }
        resolved
    }

    fn directory(&self) -> Option<&Path> {
        Some(self.directory.dir())
    }
}

impl InsideObject for DependencyResolutionBridge {
    type Args = BridgeArgs;
    const TYPE_NAME: &'static str = "DependencyResolutionBridge";

    fn construct(_ctx: &Arc<BoundaryContext>, args: BridgeArgs) -> Result<Self> {
        Ok(Self::new(args.dir, args.fs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn bridge_over(files: &[&str]) -> (MockFileSystem, DependencyResolutionBridge) {
        let fs = MockFileSystem::new();
        for f in files {
            fs.add_file(format!("/host/{f}"), f.as_bytes().to_vec());
        }
        let bridge = DependencyResolutionBridge::new("/host", Arc::new(fs.clone()));
        (fs, bridge)
    }

    #[test]
    fn resolves_known_and_rejects_unknown() {
        let (_fs, bridge) = bridge_over(&["A-1.0.0.dll", "B-2.0.0.dll"]);

        let a = bridge.resolve(&"A-1.0.0".parse().unwrap());
        assert!(a.is_some());
        assert_eq!(a.unwrap().identity().name, "A");

        assert!(bridge.resolve(&"C-1.0.0".parse().unwrap()).is_none());
        assert!(bridge.resolve(&"B-1.0.0".parse().unwrap()).is_none());
    }

    #[test]
    fn repeated_resolution_returns_the_cached_handle() {
        let (fs, bridge) = bridge_over(&["A-1.0.0.dll", "B-2.0.0.dll"]);
        let request: ModuleIdentity = "A-1.0.0".parse().unwrap();

        let first = bridge.resolve(&request).unwrap();
        let second = bridge.resolve(&request).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(fs.read_count("/host/A-1.0.0.dll"), 1);
    }

    #[test]
    fn exposes_its_directory_to_the_loader() {
        let (_fs, bridge) = bridge_over(&[]);
        assert_eq!(ModuleResolver::directory(&bridge), Some(Path::new("/host")));
        assert!(bridge.candidates().is_empty());
    }
}
