// src/modules/mod.rs

//! Module binaries: identity, loading, and resolution.
//!
//! This module is responsible for:
//! - Probing the identity (name, version, public key token) of binaries in a
//!   directory ([`identity`]).
//! - Loading a binary into memory once and caching the handle
//!   ([`directory::ModuleDirectory`]).
//! - Resolving module references that a boundary cannot satisfy from its own
//!   directory, from the host's shared directory ([`bridge`]).
//! - The per-boundary loader that chains its own directory with installed
//!   resolvers ([`loader`]).

pub mod bridge;
pub mod directory;
pub mod identity;
pub mod loader;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use blake3::Hasher;

use crate::fs::FileSystem;

pub use bridge::DependencyResolutionBridge;
pub use directory::ModuleDirectory;
pub use identity::{FileNameProbe, IdentityProbe, ModuleIdentity, ModuleVersion, MODULE_EXTENSIONS};
pub use loader::ModuleLoader;

/// A module binary read into memory.
///
/// Handles are shared as `Arc<LoadedModule>`; two requests that resolve to the
/// same file within one boundary get the same `Arc`.
#[derive(Debug)]
pub struct LoadedModule {
    identity: ModuleIdentity,
    path: PathBuf,
    bytes: Arc<[u8]>,
    digest: String,
}

impl LoadedModule {
    /// Read `path` fully and compute its blake3 digest.
    pub fn load(fs: &dyn FileSystem, path: &Path, identity: ModuleIdentity) -> Result<Self> {
        let mut reader = fs
            .open_read(path)
            .with_context(|| format!("opening module {:?}", path))?;
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .with_context(|| format!("reading module {:?}", path))?;

        let mut hasher = Hasher::new();
        hasher.update(&bytes);
        let digest = hasher.finalize().to_hex().to_string();

        Ok(Self {
            identity,
            path: path.to_path_buf(),
            bytes: Arc::from(bytes),
            digest,
        })
    }

    pub fn identity(&self) -> &ModuleIdentity {
        &self.identity
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Hex blake3 digest of the module contents.
    pub fn digest(&self) -> &str {
        &self.digest
    }
}

/// Something that can satisfy a module reference a boundary failed to find.
///
/// Implementations must not panic; "not found" is `None`.
pub trait ModuleResolver: Send + Sync {
    fn resolve(&self, request: &ModuleIdentity) -> Option<Arc<LoadedModule>>;

    /// Directory this resolver draws from, if it has one. Exported to
    /// out-of-process workloads as part of their module search path.
    fn directory(&self) -> Option<&Path> {
        None
    }
}
