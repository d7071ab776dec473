// src/supervisor/core.rs

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, TryLockError, Weak};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::boundary::{BoundaryHandle, BoundaryRequest};
use crate::descriptor::ApplicationDescriptor;
use crate::errors::SupervisorError;
use crate::modules::DependencyResolutionBridge;
use crate::peer::PeerEntryPoint;
use crate::relay::{DiagnosticsRelay, RelayReceiver};
use crate::supervisor::teardown::destroy_with_retry;
use crate::supervisor::timing::duration_millis;
use crate::supervisor::SupervisorSettings;
use crate::types::SupervisorState;
use crate::watch::WatchSubscription;

/// Keeps one application loaded in its own isolation boundary.
///
/// Every state change happens under one mutex. Timer and watch callbacks
/// carry the generation token they were created with and do nothing unless
/// that token is still the current one, so a superseded callback can never
/// undo a newer reload. Boundary creation, workload start and teardown run
/// on blocking threads while holding the mutex; attempts are strictly
/// sequential. Introspection reads a separately locked status record and
/// never waits for an attempt in progress.
///
/// Cloning yields another handle to the same supervisor.
#[derive(Clone)]
pub struct ModuleSupervisor {
    shared: Arc<Shared>,
}

impl fmt::Debug for ModuleSupervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleSupervisor")
            .field("app", &self.shared.descriptor.name())
            .field("state", &self.state())
            .finish()
    }
}

struct Shared {
    descriptor: ApplicationDescriptor,
    settings: SupervisorSettings,
    runtime: Handle,
    inner: Mutex<Inner>,
    status: Mutex<Status>,
    state_tx: watch::Sender<SupervisorState>,
}

struct Inner {
    state: SupervisorState,
    next_token: u64,
    timer: Option<ReloadTimer>,
    watch: Option<ActiveWatch>,
    loaded: Option<LoadedBoundary>,
    rng: StdRng,
}

/// Held only for field updates. Taken after `inner` when both are needed,
/// never the other way round.
#[derive(Default)]
struct Status {
    started: bool,
    /// Bumped by every `start()` so a deferred first schedule can tell it
    /// still belongs to the current run.
    run: u64,
    pending: bool,
    attempts: u64,
    last_failure: Option<SupervisorError>,
    last_delay: Option<Duration>,
}

/// The one pending load. Dropping it cancels the sleep.
struct ReloadTimer {
    token: u64,
    task: JoinHandle<()>,
}

impl Drop for ReloadTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct ActiveWatch {
    token: u64,
    _subscription: WatchSubscription,
}

struct LoadedBoundary {
    boundary: BoundaryHandle,
    peer: Arc<PeerEntryPoint>,
    _relay: RelayReceiver,
}

impl ModuleSupervisor {
    /// Must be called from within a Tokio runtime; timers and blocking work
    /// are spawned onto it.
    pub fn new(descriptor: ApplicationDescriptor, settings: SupervisorSettings) -> Self {
        let (state_tx, _) = watch::channel(SupervisorState::Unloaded);
        Self {
            shared: Arc::new(Shared {
                descriptor,
                settings,
                runtime: Handle::current(),
                inner: Mutex::new(Inner {
                    state: SupervisorState::Unloaded,
                    next_token: 0,
                    timer: None,
                    watch: None,
                    loaded: None,
                    rng: StdRng::from_os_rng(),
                }),
                status: Mutex::new(Status::default()),
                state_tx,
            }),
        }
    }

    /// Schedule the first load attempt and return.
    ///
    /// Fails with [`SupervisorError::AlreadyStarted`] if the supervisor is
    /// running; a stopped supervisor may be started again.
    ///
    /// Never waits for a stop still tearing down; the first attempt is then
    /// scheduled once that teardown releases the supervisor.
    pub fn start(&self) -> Result<(), SupervisorError> {
        let shared = &self.shared;
        let run = {
            let mut status = shared.status();
            if status.started {
                return Err(SupervisorError::AlreadyStarted(
                    shared.descriptor.name().to_string(),
                ));
            }
            status.started = true;
            status.run += 1;
            status.last_failure = None;
            status.run
        };

        match shared.inner.try_lock() {
            Ok(mut inner) => shared.begin(&mut inner, run),
            Err(TryLockError::Poisoned(e)) => shared.begin(&mut e.into_inner(), run),
            Err(TryLockError::WouldBlock) => {
                debug!(app = %shared.app(), "supervisor busy; first schedule deferred");
                let shared = Arc::clone(shared);
                self.shared.runtime.spawn_blocking(move || {
                    let mut inner = shared.lock();
                    shared.begin(&mut inner, run);
                });
            }
        }
        Ok(())
    }

    /// Cancel the pending timer and file watch, stop the workload, and
    /// destroy its boundary with bounded retry.
    ///
    /// Teardown is best effort: exhausted retries are logged and recorded in
    /// [`last_failure`](Self::last_failure), and stop still succeeds.
    /// Stopping a supervisor that is not started does nothing.
    pub async fn stop(&self) -> Result<(), SupervisorError> {
        let shared = Arc::clone(&self.shared);
        match tokio::task::spawn_blocking(move || shared.stop()).await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => {
                warn!(app = %self.shared.descriptor.name(), error = %e, "stop was cancelled");
                Ok(())
            }
        }
    }

    /// Unload now and schedule a fresh load, exactly as a detected file
    /// change would. Does nothing unless the supervisor is started.
    pub async fn reload(&self) {
        let shared = Arc::clone(&self.shared);
        match tokio::task::spawn_blocking(move || {
            let mut inner = shared.lock();
            if shared.status().started {
                shared.reload(&mut inner, "reload requested");
            }
        })
        .await
        {
            Ok(()) => {}
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => {}
        }
    }

    pub fn descriptor(&self) -> &ApplicationDescriptor {
        &self.shared.descriptor
    }

    pub fn name(&self) -> &str {
        self.shared.descriptor.name()
    }

    /// Current state. Never blocks on an attempt in progress.
    pub fn state(&self) -> SupervisorState {
        *self.shared.state_tx.borrow()
    }

    /// Observe state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<SupervisorState> {
        self.shared.state_tx.subscribe()
    }

    pub fn is_started(&self) -> bool {
        self.shared.status().started
    }

    /// Why the most recent attempt or teardown failed, if it did.
    pub fn last_failure(&self) -> Option<SupervisorError> {
        self.shared.status().last_failure.clone()
    }

    /// The delay most recently chosen for the pending (or last) timer.
    pub fn last_retry_delay(&self) -> Option<Duration> {
        self.shared.status().last_delay
    }

    /// Load attempts made since construction.
    pub fn load_attempts(&self) -> u64 {
        self.shared.status().attempts
    }

    pub fn has_pending_attempt(&self) -> bool {
        self.shared.status().pending
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn status(&self) -> MutexGuard<'_, Status> {
        self.status.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn app(&self) -> &str {
        self.descriptor.name()
    }

    fn set_state(&self, inner: &mut Inner, state: SupervisorState) {
        if inner.state != state {
            debug!(app = %self.app(), from = %inner.state, to = %state, "state change");
        }
        inner.state = state;
        self.state_tx.send_replace(state);
    }

    /// First schedule of run `run`, unless a stop or restart overtook it.
    fn begin(self: &Arc<Self>, inner: &mut Inner, run: u64) {
        {
            let status = self.status();
            if !status.started || status.run != run {
                debug!(app = %self.app(), run, "start overtaken; nothing scheduled");
                return;
            }
        }
        self.set_state(inner, SupervisorState::Unloaded);

        let delay = self.settings.timing.first_attempt;
        self.schedule(inner, delay);
        info!(
            app = %self.app(),
            delay_ms = duration_millis(delay),
            "supervisor started; first load attempt scheduled"
        );
    }

    fn cancel_timer(&self, inner: &mut Inner) {
        inner.timer = None;
        self.status().pending = false;
    }

    fn record_failure(&self, failure: SupervisorError) {
        self.status().last_failure = Some(failure);
    }

    fn next_token(inner: &mut Inner) -> u64 {
        inner.next_token += 1;
        inner.next_token
    }

    /// Replace the pending timer with one that fires after `delay`.
    fn schedule(self: &Arc<Self>, inner: &mut Inner, delay: Duration) {
        inner.timer = None;
        let token = Self::next_token(inner);

        let weak: Weak<Self> = Arc::downgrade(self);
        let runtime = self.runtime.clone();
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            runtime.spawn_blocking(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.on_timer(token);
                }
            });
        });

        inner.timer = Some(ReloadTimer { token, task });
        let mut status = self.status();
        status.pending = true;
        status.last_delay = Some(delay);
    }

    fn on_timer(self: &Arc<Self>, token: u64) {
        let mut inner = self.lock();
        match &inner.timer {
            Some(timer) if timer.token == token => {}
            _ => {
                debug!(app = %self.app(), token, "superseded timer ignored");
                return;
            }
        }
        self.cancel_timer(&mut inner);

        if !self.status().started {
            return;
        }
        match inner.state {
            SupervisorState::Unloaded | SupervisorState::AwaitingRetry => self.attempt_load(&mut inner),
            other => debug!(app = %self.app(), state = %other, "timer fired outside an unloaded state"),
        }
    }

    fn on_watch(self: &Arc<Self>, token: u64) {
        let mut inner = self.lock();
        match &inner.watch {
            Some(w) if w.token == token => {}
            _ => {
                debug!(app = %self.app(), token, "superseded watch event ignored");
                return;
            }
        }
        if self.status().started {
            self.reload(&mut inner, "change detected");
        }
    }

    /// Unload, then schedule a load after the reload grace period.
    fn reload(self: &Arc<Self>, inner: &mut Inner, why: &str) {
        self.cancel_timer(inner);
        if let Err(e) = self.unload(inner) {
            self.record_failure(e);
        }

        let delay = self.settings.timing.reload_delay.sample(&mut inner.rng);
        self.set_state(inner, SupervisorState::Unloaded);
        self.schedule(inner, delay);
        info!(
            app = %self.app(),
            delay_ms = duration_millis(delay),
            "{why}; reload scheduled"
        );
    }

    fn attempt_load(self: &Arc<Self>, inner: &mut Inner) {
        let attempt = {
            let mut status = self.status();
            status.attempts += 1;
            status.attempts
        };
        self.set_state(inner, SupervisorState::Loading);
        info!(app = %self.app(), attempt, "load attempt");

        match self.try_load() {
            Ok(loaded) => {
                info!(
                    app = %self.app(),
                    attempt,
                    boundary = loaded.boundary.id(),
                    "application loaded"
                );
                inner.loaded = Some(loaded);
                self.status().last_failure = None;
                self.set_state(inner, SupervisorState::Loaded);
                if self.descriptor.watch() {
                    self.install_watch(inner);
                }
            }
            Err(failure) => {
                let range = match failure {
                    SupervisorError::MissingDirectory(_) | SupervisorError::MissingConfig(_) => {
                        self.settings.timing.missing_retry
                    }
                    _ => self.settings.timing.fault_retry,
                };
                let delay = range.sample(&mut inner.rng);
                error!(
                    app = %self.app(),
                    attempt,
                    error = %failure,
                    delay_ms = duration_millis(delay),
                    "load attempt failed; retry scheduled"
                );
                self.record_failure(failure);
                self.set_state(inner, SupervisorState::AwaitingRetry);
                self.schedule(inner, delay);
            }
        }
    }

    fn try_load(&self) -> Result<LoadedBoundary, SupervisorError> {
        let (source, config) = self
            .descriptor
            .resolved_paths()
            .map_err(|_| SupervisorError::MissingDirectory(self.descriptor.source_path().to_path_buf()))?;

        if !self.settings.fs.is_dir(&source) {
            return Err(SupervisorError::MissingDirectory(source));
        }
        if !self.settings.fs.is_file(&config) {
            return Err(SupervisorError::MissingConfig(config));
        }

        let request = BoundaryRequest {
            name: self.descriptor.name().to_string(),
            base_path: source,
            config_path: config,
            shadow_copy: self.descriptor.shadow_copy(),
        };
        let boundary = self
            .settings
            .host
            .create_boundary(&request)
            .map_err(|e| SupervisorError::BoundaryCreateFailure(e.to_string()))?;

        let populated = DependencyResolutionBridge::install(
            &boundary,
            &self.settings.shared_dir,
            self.settings.fs.clone(),
        )
        .and_then(|_| DiagnosticsRelay::listen_to(&boundary, self.settings.sink.clone(), &self.runtime))
        .and_then(|relay| Ok((boundary.instantiate::<PeerEntryPoint>(())?, relay)));

        let (peer, relay) = match populated {
            Ok(parts) => parts,
            Err(e) => {
                self.discard(&boundary);
                return Err(SupervisorError::BoundaryCreateFailure(e.to_string()));
            }
        };

        if !peer.load() {
            self.discard(&boundary);
            return Err(SupervisorError::PeerLoadFailure);
        }

        Ok(LoadedBoundary {
            boundary,
            peer,
            _relay: relay,
        })
    }

    /// Tear down a boundary that never became `Loaded`.
    fn discard(&self, boundary: &BoundaryHandle) {
        let timing = &self.settings.timing;
        // Exhaustion is logged by the teardown itself; the retry that
        // follows covers it.
        let _ = destroy_with_retry(
            self.settings.host.as_ref(),
            boundary,
            timing.teardown_attempts,
            timing.teardown_pause,
        );
    }

    fn install_watch(self: &Arc<Self>, inner: &mut Inner) {
        let path = match std::path::absolute(self.descriptor.source_path()) {
            Ok(p) => p,
            Err(e) => {
                warn!(app = %self.app(), error = %e, "cannot resolve watch path; watching disabled");
                return;
            }
        };

        let token = Self::next_token(inner);
        let weak: Weak<Self> = Arc::downgrade(self);
        let runtime = self.runtime.clone();
        let subscribed = WatchSubscription::subscribe(
            &path,
            self.settings.timing.debounce,
            &self.runtime,
            move |event| {
                debug!(paths = ?event.paths, "file change settled");
                let weak = weak.clone();
                runtime.spawn_blocking(move || {
                    if let Some(shared) = weak.upgrade() {
                        shared.on_watch(token);
                    }
                });
            },
        );

        match subscribed {
            Ok(subscription) => {
                inner.watch = Some(ActiveWatch {
                    token,
                    _subscription: subscription,
                });
            }
            Err(e) => {
                warn!(app = %self.app(), error = %format!("{e:#}"), "file watch not installed");
            }
        }
    }

    /// Stop the workload and destroy its boundary. No-op when nothing is
    /// loaded.
    fn unload(&self, inner: &mut Inner) -> Result<(), SupervisorError> {
        inner.watch = None;
        let Some(loaded) = inner.loaded.take() else {
            return Ok(());
        };

        self.set_state(inner, SupervisorState::Unloading);
        if !loaded.peer.unload() {
            warn!(app = %self.app(), "workload did not stop cleanly");
        }

        let timing = &self.settings.timing;
        let result = destroy_with_retry(
            self.settings.host.as_ref(),
            &loaded.boundary,
            timing.teardown_attempts,
            timing.teardown_pause,
        );
        drop(loaded);
        self.set_state(inner, SupervisorState::Unloaded);

        result.map(|attempt| {
            debug!(app = %self.app(), attempt, "boundary destroyed");
        })
    }

    fn stop(&self) -> Result<(), SupervisorError> {
        let mut inner = self.lock();
        {
            let mut status = self.status();
            if !status.started {
                debug!(app = %self.app(), "stop on a supervisor that is not started");
                return Ok(());
            }
            status.started = false;
        }

        self.cancel_timer(&mut inner);
        inner.watch = None;
        self.set_state(&mut inner, SupervisorState::Unloading);

        if let Err(e) = self.unload(&mut inner) {
            self.record_failure(e);
        }
        self.set_state(&mut inner, SupervisorState::Unloaded);
        info!(app = %self.app(), "supervisor stopped");
        Ok(())
    }
}
