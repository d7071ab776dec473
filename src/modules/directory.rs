// src/modules/directory.rs

//! A scanned directory of module binaries with a load cache.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::fs::FileSystem;
use crate::modules::identity::{IdentityProbe, ModuleIdentity};
use crate::modules::LoadedModule;

/// The `(file, identity)` pairs found in one directory, plus the handles
/// loaded from it so far.
///
/// The entry list is fixed at scan time. The cache is append-only and lives
/// exactly as long as this value; a new boundary builds a new directory.
pub struct ModuleDirectory {
    dir: PathBuf,
    fs: Arc<dyn FileSystem>,
    entries: Vec<(PathBuf, ModuleIdentity)>,
    cache: Mutex<HashMap<PathBuf, Arc<LoadedModule>>>,
}

impl std::fmt::Debug for ModuleDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleDirectory")
            .field("dir", &self.dir)
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl ModuleDirectory {
    /// Enumerate `dir` (non-recursively) and probe every file.
    ///
    /// An unreadable directory yields an empty listing; files the probe cannot
    /// identify are skipped.
    pub fn scan(dir: impl Into<PathBuf>, fs: Arc<dyn FileSystem>, probe: &dyn IdentityProbe) -> Self {
        let dir = dir.into();
        let mut files = match fs.read_dir(&dir) {
            Ok(files) => files,
            Err(err) => {
                warn!(dir = ?dir, error = %err, "could not enumerate module directory");
                Vec::new()
            }
        };
        // read_dir order is platform dependent; keep resolution deterministic.
        files.sort();

        let entries: Vec<(PathBuf, ModuleIdentity)> = files
            .into_iter()
            .filter_map(|path| {
                let identity = probe.probe(fs.as_ref(), &path)?;
                Some((path, identity))
            })
            .collect();

        debug!(dir = ?dir, modules = entries.len(), "scanned module directory");

        Self {
            dir,
            fs,
            entries,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn entries(&self) -> &[(PathBuf, ModuleIdentity)] {
        &self.entries
    }

    /// First entry whose identity satisfies `request`.
    pub fn find(&self, request: &ModuleIdentity) -> Option<&(PathBuf, ModuleIdentity)> {
        self.entries.iter().find(|(_, id)| id.satisfies(request))
    }

    /// Resolve `request` to a loaded handle, loading the file at most once.
    ///
    /// Returns `None` when nothing matches or the load fails.
    pub fn resolve(&self, request: &ModuleIdentity) -> Option<Arc<LoadedModule>> {
        let (path, identity) = self.find(request)?;

        // Held across the load so concurrent requests for one file read it once.
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(hit) = cache.get(path) {
            return Some(Arc::clone(hit));
        }

        match LoadedModule::load(self.fs.as_ref(), path, identity.clone()) {
            Ok(module) => {
                debug!(request = %request, file = ?path, "loaded module");
                let module = Arc::new(module);
                cache.insert(path.clone(), Arc::clone(&module));
                Some(module)
            }
            Err(err) => {
                warn!(request = %request, file = ?path, error = %err, "failed to load module");
                None
            }
        }
    }

    /// Number of files loaded so far.
    pub fn cached(&self) -> usize {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
