// src/peer.rs

//! The supervisor's one object inside a boundary.
//!
//! The peer never links against the workload. It looks the workload's
//! [`ServiceLocator`] up by a well-known name in the boundary's entry-point
//! registry, asks it for the top-level [`Lifecycle`], and starts or stops it.
//! Failures never cross the boundary as errors: they are written to the
//! boundary's log (and so relayed out) and reported as `false`.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};

use crate::boundary::{BoundaryContext, InsideObject, Lifecycle};

/// Name under which a workload publishes its service locator.
pub const WELL_KNOWN_LOCATOR: &str = "appvisor.service-locator";

#[derive(Debug)]
pub struct PeerEntryPoint {
    ctx: Arc<BoundaryContext>,
    gate: Mutex<()>,
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Start,
    Stop,
}

impl Step {
    fn verb(self) -> &'static str {
        match self {
            Step::Start => "start",
            Step::Stop => "stop",
        }
    }
}

impl PeerEntryPoint {
    /// Start the workload. `false` if it could not be found or failed to
    /// start; the cause is in the boundary log.
    pub fn load(&self) -> bool {
        self.run(Step::Start)
    }

    /// Stop the workload. `false` on any failure; the cause is in the
    /// boundary log.
    pub fn unload(&self) -> bool {
        self.run(Step::Stop)
    }

    fn run(&self, step: Step) -> bool {
        let _serialized = self.gate.lock().unwrap_or_else(|e| e.into_inner());

        let outcome = catch_unwind(AssertUnwindSafe(|| self.invoke(step)))
            .unwrap_or_else(|panic| Err(anyhow!("workload panicked: {}", panic_message(&panic))));

        match outcome {
            Ok(()) => true,
            Err(err) => {
                self.ctx
                    .log()
                    .write(format!("peer: failed to {} workload: {err:#}", step.verb()));
                false
            }
        }
    }

    fn invoke(&self, step: Step) -> Result<()> {
        let lifecycle = self.lifecycle()?;
        match step {
            Step::Start => lifecycle.start(),
            Step::Stop => lifecycle.stop(),
        }
    }

    fn lifecycle(&self) -> Result<Arc<dyn Lifecycle>> {
        let locator = self
            .ctx
            .entry_points()
            .get(WELL_KNOWN_LOCATOR)
            .ok_or_else(|| anyhow!("no service locator registered as '{WELL_KNOWN_LOCATOR}'"))?;
        locator
            .lifecycle()
            .map_err(|e| e.context("service locator could not resolve the workload lifecycle"))
    }
}

impl InsideObject for PeerEntryPoint {
    type Args = ();
    const TYPE_NAME: &'static str = "PeerEntryPoint";

    fn construct(ctx: &Arc<BoundaryContext>, _args: ()) -> Result<Self> {
        Ok(Self {
            ctx: Arc::clone(ctx),
            gate: Mutex::new(()),
        })
    }
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::{BoundaryHandle, ComponentsConfig, LogListener, ServiceLocator};
    use crate::fs::RealFileSystem;
    use crate::modules::{FileNameProbe, ModuleDirectory, ModuleLoader};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn boundary() -> BoundaryHandle {
        BoundaryHandle::new(Arc::new(BoundaryContext::new(
            "Orders".into(),
            PathBuf::from("/nonexistent"),
            PathBuf::from("/nonexistent/Components.config"),
            ComponentsConfig::default(),
            ModuleLoader::new(ModuleDirectory::scan(
                "/nonexistent",
                Arc::new(RealFileSystem),
                &FileNameProbe,
            )),
        )))
    }

    #[derive(Default)]
    struct Lines(Mutex<Vec<String>>);

    impl LogListener for Lines {
        fn on_message(&self, text: &str) {
            self.0.lock().unwrap().push(text.to_string());
        }
    }

    #[derive(Default)]
    struct Workload {
        starts: AtomicUsize,
        stops: AtomicUsize,
        fail_start: bool,
        panic_stop: bool,
    }

    impl Lifecycle for Workload {
        fn start(&self) -> Result<()> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            if self.fail_start {
                anyhow::bail!("database unreachable");
            }
            Ok(())
        }

        fn stop(&self) -> Result<()> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            if self.panic_stop {
                panic!("stop exploded");
            }
            Ok(())
        }
    }

    struct Locator(Arc<Workload>);

    impl ServiceLocator for Locator {
        fn lifecycle(&self) -> Result<Arc<dyn Lifecycle>> {
            Ok(self.0.clone())
        }
    }

    fn with_workload(workload: Workload) -> (BoundaryHandle, Arc<Workload>, Arc<Lines>) {
        let b = boundary();
        let workload = Arc::new(workload);
        let lines = Arc::new(Lines::default());
        b.context().log().add_listener(lines.clone());
        b.context()
            .entry_points()
            .register(WELL_KNOWN_LOCATOR, Arc::new(Locator(workload.clone())));
        (b, workload, lines)
    }

    #[test]
    fn load_and_unload_drive_the_lifecycle() {
        let (b, workload, _lines) = with_workload(Workload::default());
        let peer = b.instantiate::<PeerEntryPoint>(()).unwrap();

        assert!(peer.load());
        assert!(peer.unload());
        assert_eq!(workload.starts.load(Ordering::SeqCst), 1);
        assert_eq!(workload.stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn missing_locator_is_false_and_logged() {
        let b = boundary();
        let lines = Arc::new(Lines::default());
        b.context().log().add_listener(lines.clone());
        let peer = b.instantiate::<PeerEntryPoint>(()).unwrap();

        assert!(!peer.load());
        let logged = lines.0.lock().unwrap();
        assert_eq!(logged.len(), 1);
        assert!(logged[0].contains("no service locator"));
    }

    #[test]
    fn failing_start_is_false_and_logged() {
        let (b, _workload, lines) = with_workload(Workload {
            fail_start: true,
            ..Default::default()
        });
        let peer = b.instantiate::<PeerEntryPoint>(()).unwrap();

        assert!(!peer.load());
        assert!(lines.0.lock().unwrap()[0].contains("database unreachable"));
    }

    #[test]
    fn panicking_stop_is_contained() {
        let (b, _workload, lines) = with_workload(Workload {
            panic_stop: true,
            ..Default::default()
        });
        let peer = b.instantiate::<PeerEntryPoint>(()).unwrap();

        assert!(!peer.unload());
        assert!(lines.0.lock().unwrap()[0].contains("stop exploded"));
    }
}
