use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use anyhow::{bail, Result};

use appvisor::boundary::{BoundaryContext, Lifecycle, ServiceLocator, WorkloadCatalog};
use appvisor::peer::WELL_KNOWN_LOCATOR;

/// An in-process workload that records its lifecycle and writes to its
/// boundary's log.
#[derive(Debug, Default)]
pub struct FakeWorkload {
    starts: AtomicUsize,
    stops: AtomicUsize,
    fail_starts: AtomicUsize,
}

impl FakeWorkload {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A catalog with this workload registered under `key`.
    pub fn catalog(self: &Arc<Self>, key: &str) -> WorkloadCatalog {
        let mut catalog = WorkloadCatalog::new();
        self.register(&mut catalog, key);
        catalog
    }

    pub fn register(self: &Arc<Self>, catalog: &mut WorkloadCatalog, key: &str) {
        let workload = Arc::clone(self);
        catalog.register(key, move |ctx| {
            ctx.entry_points().register(
                WELL_KNOWN_LOCATOR,
                Arc::new(FakeLocator {
                    workload: workload.clone(),
                    ctx: Arc::downgrade(ctx),
                }),
            );
            Ok(())
        });
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn fail_next_starts(&self, n: usize) {
        self.fail_starts.store(n, Ordering::SeqCst);
    }
}

struct FakeLocator {
    workload: Arc<FakeWorkload>,
    ctx: Weak<BoundaryContext>,
}

impl ServiceLocator for FakeLocator {
    fn lifecycle(&self) -> Result<Arc<dyn Lifecycle>> {
        Ok(Arc::new(BoundWorkload {
            workload: self.workload.clone(),
            ctx: self.ctx.clone(),
        }))
    }
}

struct BoundWorkload {
    workload: Arc<FakeWorkload>,
    ctx: Weak<BoundaryContext>,
}

impl BoundWorkload {
    fn log(&self, text: &str) {
        if let Some(ctx) = self.ctx.upgrade() {
            ctx.log().write(text);
        }
    }
}

impl Lifecycle for BoundWorkload {
    fn start(&self) -> Result<()> {
        self.workload.starts.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .workload
            .fail_starts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            bail!("injected start failure");
        }
        self.log("workload started");
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        self.workload.stops.fetch_add(1, Ordering::SeqCst);
        self.log("workload stopped");
        Ok(())
    }
}
