use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use appvisor::boundary::{
    BoundaryHandle, BoundaryRequest, IsolationHost, LocalHost, WorkloadCatalog,
};
use appvisor::errors::BoundaryError;
use appvisor::supervisor::duration_millis;

/// Counters and failure switches shared between a [`FlakyHost`] and the test.
#[derive(Debug, Default)]
pub struct HostStats {
    created: AtomicUsize,
    destroyed: AtomicUsize,
    destroy_calls: AtomicUsize,
    live: AtomicUsize,
    max_live: AtomicUsize,
    fail_creates: AtomicUsize,
    fail_destroys: AtomicUsize,
    create_delay_ms: AtomicU64,
}

impl HostStats {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn destroyed(&self) -> usize {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Every destroy call, including failed ones.
    pub fn destroy_calls(&self) -> usize {
        self.destroy_calls.load(Ordering::SeqCst)
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously live boundaries seen.
    pub fn max_live(&self) -> usize {
        self.max_live.load(Ordering::SeqCst)
    }

    pub fn fail_next_creates(&self, n: usize) {
        self.fail_creates.store(n, Ordering::SeqCst);
    }

    pub fn fail_next_destroys(&self, n: usize) {
        self.fail_destroys.store(n, Ordering::SeqCst);
    }

    /// Make every successful create block the calling thread for `delay`.
    pub fn set_create_delay(&self, delay: Duration) {
        self.create_delay_ms
            .store(duration_millis(delay), Ordering::SeqCst);
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

/// A [`LocalHost`] that counts boundaries and can be told to fail.
#[derive(Debug)]
pub struct FlakyHost {
    inner: LocalHost,
    stats: Arc<HostStats>,
}

impl FlakyHost {
    pub fn new(catalog: WorkloadCatalog) -> Self {
        Self {
            inner: LocalHost::new(catalog),
            stats: Arc::new(HostStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<HostStats> {
        self.stats.clone()
    }

    pub fn into_shared(self) -> (Arc<dyn IsolationHost>, Arc<HostStats>) {
        let stats = self.stats.clone();
        (Arc::new(self), stats)
    }
}

impl IsolationHost for FlakyHost {
    fn create_boundary(&self, request: &BoundaryRequest) -> Result<BoundaryHandle, BoundaryError> {
        if HostStats::take_failure(&self.stats.fail_creates) {
            return Err(BoundaryError::Create {
                name: request.name.clone(),
                reason: "injected create failure".into(),
            });
        }

        let delay = self.stats.create_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            std::thread::sleep(Duration::from_millis(delay));
        }

        let handle = self.inner.create_boundary(request)?;
        self.stats.created.fetch_add(1, Ordering::SeqCst);
        let live = self.stats.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.max_live.fetch_max(live, Ordering::SeqCst);
        Ok(handle)
    }

    fn destroy_boundary(&self, boundary: &BoundaryHandle) -> Result<(), BoundaryError> {
        self.stats.destroy_calls.fetch_add(1, Ordering::SeqCst);
        if HostStats::take_failure(&self.stats.fail_destroys) {
            return Err(BoundaryError::Destroy {
                name: boundary.name().to_string(),
                reason: "injected destroy failure".into(),
            });
        }

        self.inner.destroy_boundary(boundary)?;
        self.stats.destroyed.fetch_add(1, Ordering::SeqCst);
        self.stats.live.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}
