// src/boundary/context.rs

//! State owned by one boundary and visible to code running inside it.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use crate::boundary::components::ComponentsConfig;
use crate::modules::ModuleLoader;

/// Receives every message written to a [`BoundaryLog`].
pub trait LogListener: Send + Sync {
    /// Must not block for long or write back to the same log; panics are
    /// contained by the log.
    fn on_message(&self, text: &str);
}

/// Messages kept while a log has no listener yet.
const PENDING_LIMIT: usize = 1024;

/// The boundary-local logging sink.
///
/// Code inside the boundary writes plain text here; listeners (the diagnostics
/// relay) carry it elsewhere. Messages written before the first listener is
/// attached, e.g. by a workload initialising while its boundary is created,
/// are held (up to 1024, oldest dropped first) and handed to that
/// listener in order when it arrives.
#[derive(Default)]
pub struct BoundaryLog {
    state: Mutex<LogState>,
}

#[derive(Default)]
struct LogState {
    listeners: Vec<Arc<dyn LogListener>>,
    pending: VecDeque<String>,
    dropped: usize,
    closed: bool,
}

impl fmt::Debug for BoundaryLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundaryLog")
            .field("listeners", &self.listener_count())
            .field("pending", &self.pending_count())
            .finish()
    }
}

impl BoundaryLog {
    /// Attach `listener`. The first listener receives everything written
    /// so far.
    pub fn add_listener(&self, listener: Arc<dyn LogListener>) {
        let mut state = self.lock();
        if state.closed {
            return;
        }
        if state.dropped > 0 {
            let note = format!("({} earlier messages dropped)", state.dropped);
            deliver(listener.as_ref(), &note);
            state.dropped = 0;
        }
        for text in state.pending.drain(..) {
            deliver(listener.as_ref(), &text);
        }
        state.listeners.push(listener);
    }

    pub fn write(&self, text: impl AsRef<str>) {
        let text = text.as_ref();
        let mut state = self.lock();
        if state.closed {
            return;
        }
        if state.listeners.is_empty() {
            if state.pending.len() == PENDING_LIMIT {
                state.pending.pop_front();
                state.dropped += 1;
            }
            state.pending.push_back(text.to_string());
            return;
        }
        for listener in state.listeners.iter() {
            deliver(listener.as_ref(), text);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    /// Messages waiting for a first listener.
    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }

    fn lock(&self) -> MutexGuard<'_, LogState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        state.listeners.clear();
        state.pending.clear();
    }
}

/// A broken listener loses this message; the writer carries on.
fn deliver(listener: &dyn LogListener, text: &str) {
    let _ = catch_unwind(AssertUnwindSafe(|| listener.on_message(text)));
}

/// Top-level start/stop of a hosted workload.
pub trait Lifecycle: Send + Sync {
    fn start(&self) -> anyhow::Result<()>;
    fn stop(&self) -> anyhow::Result<()>;
}

/// The workload's own service locator, published under a well-known name.
pub trait ServiceLocator: Send + Sync {
    fn lifecycle(&self) -> anyhow::Result<Arc<dyn Lifecycle>>;
}

/// Named service locators a workload publishes when it is loaded into a
/// boundary.
#[derive(Default)]
pub struct EntryPoints {
    locators: RwLock<HashMap<String, Arc<dyn ServiceLocator>>>,
}

impl fmt::Debug for EntryPoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let locators = self.locators.read().unwrap_or_else(|e| e.into_inner());
        f.debug_set().entries(locators.keys()).finish()
    }
}

impl EntryPoints {
    pub fn register(&self, name: impl Into<String>, locator: Arc<dyn ServiceLocator>) {
        self.locators
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.into(), locator);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ServiceLocator>> {
        self.locators
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
    }

    fn clear(&self) {
        self.locators.write().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

type CloseHook = Box<dyn FnOnce() + Send>;

/// Everything inside one boundary.
pub struct BoundaryContext {
    name: String,
    base_path: PathBuf,
    config_path: PathBuf,
    components: ComponentsConfig,
    log: BoundaryLog,
    modules: ModuleLoader,
    entry_points: EntryPoints,
    close_hooks: Mutex<Vec<CloseHook>>,
    closed: AtomicBool,
}

impl fmt::Debug for BoundaryContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundaryContext")
            .field("name", &self.name)
            .field("base_path", &self.base_path)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl BoundaryContext {
    pub fn new(
        name: String,
        base_path: PathBuf,
        config_path: PathBuf,
        components: ComponentsConfig,
        modules: ModuleLoader,
    ) -> Self {
        Self {
            name,
            base_path,
            config_path,
            components,
            log: BoundaryLog::default(),
            modules,
            entry_points: EntryPoints::default(),
            close_hooks: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory code is loaded from (the shadow copy when one was made).
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn components(&self) -> &ComponentsConfig {
        &self.components
    }

    pub fn log(&self) -> &BoundaryLog {
        &self.log
    }

    pub fn modules(&self) -> &ModuleLoader {
        &self.modules
    }

    pub fn entry_points(&self) -> &EntryPoints {
        &self.entry_points
    }

    /// Run `hook` when the boundary is closed. Runs immediately if it
    /// already is.
    pub fn on_close(&self, hook: impl FnOnce() + Send + 'static) {
        let mut hooks = self.close_hooks.lock().unwrap_or_else(|e| e.into_inner());
        if self.is_closed() {
            drop(hooks);
            hook();
            return;
        }
        hooks.push(Box::new(hook));
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn close(&self) {
        let hooks = {
            let mut hooks = self.close_hooks.lock().unwrap_or_else(|e| e.into_inner());
            if self.closed.swap(true, Ordering::AcqRel) {
                return;
            }
            std::mem::take(&mut *hooks)
        };
        for hook in hooks {
            let _ = catch_unwind(AssertUnwindSafe(hook));
        }
        self.entry_points.clear();
        self.modules.clear();
        self.log.close();
    }
}
