// src/boundary/mod.rs

//! Isolation-boundary capability.
//!
//! The supervisor only needs three things from a sandboxing primitive:
//! create a boundary from a directory and a config file, instantiate objects
//! inside it, and destroy it. [`IsolationHost`] is that contract;
//! [`BoundaryHandle::instantiate`] is the "create inside" primitive shared by
//! every host.
//!
//! - [`context`] holds the per-boundary state code inside the boundary sees
//!   (log, module loader, entry points).
//! - [`components`] is the `Components.config` model.
//! - [`local`] runs workloads in-process from a compiled-in catalog.
//! - [`process`] runs each workload as a child process.
//! - [`shadow`] copies an application directory before it is loaded.

pub mod components;
pub mod context;
pub mod local;
pub mod process;
pub mod shadow;

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tempfile::TempDir;
use tracing::debug;

use crate::errors::BoundaryError;
use crate::fs::RealFileSystem;
use crate::modules::{FileNameProbe, ModuleDirectory, ModuleLoader};

pub use components::ComponentsConfig;
pub use context::{BoundaryContext, BoundaryLog, EntryPoints, Lifecycle, LogListener, ServiceLocator};
pub use local::{LocalHost, WorkloadCatalog};
pub use process::ProcessHost;

/// What to sandbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryRequest {
    pub name: String,
    pub base_path: PathBuf,
    pub config_path: PathBuf,
    pub shadow_copy: bool,
}

/// A sandboxing primitive.
///
/// Both calls may block for a long time. `destroy_boundary` may be retried by
/// the caller after a failure.
pub trait IsolationHost: Send + Sync + fmt::Debug {
    fn create_boundary(&self, request: &BoundaryRequest) -> Result<BoundaryHandle, BoundaryError>;
    fn destroy_boundary(&self, boundary: &BoundaryHandle) -> Result<(), BoundaryError>;
}

/// A type that can be created inside a boundary.
pub trait InsideObject: Send + Sync + Sized + 'static {
    type Args;
    const TYPE_NAME: &'static str;

    fn construct(ctx: &Arc<BoundaryContext>, args: Self::Args) -> anyhow::Result<Self>;
}

static NEXT_BOUNDARY_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque reference to a live boundary.
pub struct BoundaryHandle {
    id: u64,
    ctx: Arc<BoundaryContext>,
    _shadow: Option<TempDir>,
}

impl fmt::Debug for BoundaryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundaryHandle")
            .field("id", &self.id)
            .field("name", &self.ctx.name())
            .finish_non_exhaustive()
    }
}

impl BoundaryHandle {
    /// Wrap an already-built context. Hosts that need custom setup use this;
    /// most use [`BoundaryHandle::open`].
    pub fn new(ctx: Arc<BoundaryContext>) -> Self {
        Self {
            id: NEXT_BOUNDARY_ID.fetch_add(1, Ordering::Relaxed),
            ctx,
            _shadow: None,
        }
    }

    /// Common boundary setup: read `Components.config`, shadow-copy the
    /// directory if asked to, and scan the effective base directory for
    /// modules.
    pub fn open(request: &BoundaryRequest) -> Result<Self, BoundaryError> {
        let components = ComponentsConfig::load(&request.config_path)?;

        let (base_path, shadow) = if request.shadow_copy {
            let dir = shadow::shadow_copy(&request.base_path, &request.name).map_err(|e| {
                BoundaryError::Create {
                    name: request.name.clone(),
                    reason: format!("shadow copy of {:?} failed: {e}", request.base_path),
                }
            })?;
            (dir.path().to_path_buf(), Some(dir))
        } else {
            (request.base_path.clone(), None)
        };

        let modules = ModuleLoader::new(ModuleDirectory::scan(
            base_path.clone(),
            Arc::new(RealFileSystem),
            &FileNameProbe,
        ));

        let ctx = Arc::new(BoundaryContext::new(
            request.name.clone(),
            base_path,
            request.config_path.clone(),
            components,
            modules,
        ));

        let mut handle = Self::new(ctx);
        handle._shadow = shadow;
        debug!(boundary = %handle.name(), id = handle.id, base = ?handle.ctx.base_path(), "boundary opened");
        Ok(handle)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Friendly name; used as the identity prefix for relayed diagnostics.
    pub fn name(&self) -> &str {
        self.ctx.name()
    }

    pub fn context(&self) -> &Arc<BoundaryContext> {
        &self.ctx
    }

    pub fn is_closed(&self) -> bool {
        self.ctx.is_closed()
    }

    /// Create a `T` inside this boundary.
    pub fn instantiate<T: InsideObject>(&self, args: T::Args) -> Result<Arc<T>, BoundaryError> {
        if self.ctx.is_closed() {
            return Err(BoundaryError::Closed(self.name().to_string()));
        }
        T::construct(&self.ctx, args)
            .map(Arc::new)
            .map_err(|e| BoundaryError::Instantiate {
                boundary: self.name().to_string(),
                type_name: T::TYPE_NAME,
                reason: format!("{e:#}"),
            })
    }

    /// Close the boundary's context: run close hooks, detach log listeners,
    /// resolvers and entry points. Idempotent.
    pub fn close(&self) {
        self.ctx.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    struct Probe {
        name: String,
    }

    impl InsideObject for Probe {
        type Args = ();
        const TYPE_NAME: &'static str = "Probe";

        fn construct(ctx: &Arc<BoundaryContext>, _args: ()) -> anyhow::Result<Self> {
            Ok(Self {
                name: ctx.name().to_string(),
            })
        }
    }

    fn detached(name: &str) -> BoundaryHandle {
        let modules = ModuleLoader::new(ModuleDirectory::scan(
            "/nonexistent",
            Arc::new(RealFileSystem),
            &FileNameProbe,
        ));
        BoundaryHandle::new(Arc::new(BoundaryContext::new(
            name.to_string(),
            PathBuf::from("/nonexistent"),
            PathBuf::from("/nonexistent/Components.config"),
            ComponentsConfig::default(),
            modules,
        )))
    }

    #[test]
    fn instantiate_constructs_against_the_boundary_context() {
        let b = detached("Orders");
        let p = b.instantiate::<Probe>(()).unwrap();
        assert_eq!(p.name, "Orders");
    }

    #[test]
    fn instantiate_in_closed_boundary_fails() {
        let b = detached("Orders");
        b.close();
        assert!(matches!(b.instantiate::<Probe>(()), Err(BoundaryError::Closed(_))));
    }

    #[test]
    fn handles_get_distinct_ids() {
        assert_ne!(detached("a").id(), detached("b").id());
    }

    #[test]
    fn open_with_shadow_copy_uses_a_private_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Components.config"), "[entry]\nlocator = \"x\"\n").unwrap();
        std::fs::write(dir.path().join("lib-1.0.0.so"), b"lib").unwrap();

        let handle = BoundaryHandle::open(&BoundaryRequest {
            name: "Orders".into(),
            base_path: dir.path().to_path_buf(),
            config_path: dir.path().join("Components.config"),
            shadow_copy: true,
        })
        .unwrap();

        let base = handle.context().base_path().to_path_buf();
        assert_ne!(base, dir.path());
        assert!(base.join("lib-1.0.0.so").is_file());
        assert!(handle.context().modules().load(&"lib-1.0.0".parse().unwrap()).is_some());

        drop(handle);
        assert!(!Path::new(&base).exists());
    }
}
