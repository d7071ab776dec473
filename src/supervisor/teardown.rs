// src/supervisor/teardown.rs

use std::thread;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::boundary::{BoundaryHandle, IsolationHost};
use crate::errors::SupervisorError;

/// Destroy `boundary`, retrying up to `attempts` times with `pause` between
/// failures. Returns the attempt that succeeded.
///
/// Blocks the calling thread; run it from a blocking context.
pub fn destroy_with_retry(
    host: &dyn IsolationHost,
    boundary: &BoundaryHandle,
    attempts: u32,
    pause: Duration,
) -> Result<u32, SupervisorError> {
    let attempts = attempts.max(1);
    let mut last_reason = String::new();

    for attempt in 1..=attempts {
        info!(boundary = %boundary.name(), attempt, of = attempts, "destroying boundary");
        match host.destroy_boundary(boundary) {
            Ok(()) => return Ok(attempt),
            Err(e) => {
                warn!(boundary = %boundary.name(), attempt, error = %e, "boundary teardown failed");
                last_reason = e.to_string();
                if attempt < attempts {
                    thread::sleep(pause);
                }
            }
        }
    }

    error!(
        boundary = %boundary.name(),
        attempts,
        error = %last_reason,
        "giving up on boundary teardown"
    );
    Err(SupervisorError::BoundaryDestroyFailure {
        attempts,
        reason: last_reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::{BoundaryContext, BoundaryRequest, ComponentsConfig};
    use crate::errors::BoundaryError;
    use crate::fs::RealFileSystem;
    use crate::modules::{FileNameProbe, ModuleDirectory, ModuleLoader};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[derive(Debug)]
    struct Stubborn {
        failures: u32,
        calls: AtomicU32,
    }

    impl IsolationHost for Stubborn {
        fn create_boundary(&self, request: &BoundaryRequest) -> Result<BoundaryHandle, BoundaryError> {
            Err(BoundaryError::Create {
                name: request.name.clone(),
                reason: "unused".into(),
            })
        }

        fn destroy_boundary(&self, boundary: &BoundaryHandle) -> Result<(), BoundaryError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures {
                return Err(BoundaryError::Destroy {
                    name: boundary.name().to_string(),
                    reason: "files in use".into(),
                });
            }
            Ok(())
        }
    }

    fn handle() -> BoundaryHandle {
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

    #[test]
    fn succeeds_on_a_later_attempt() {
        let host = Stubborn {
            failures: 2,
            calls: AtomicU32::new(0),
        };
        assert_eq!(destroy_with_retry(&host, &handle(), 3, Duration::ZERO), Ok(3));
    }

    #[test]
    fn gives_up_after_the_last_attempt() {
        let host = Stubborn {
            failures: u32::MAX,
            calls: AtomicU32::new(0),
        };
        let err = destroy_with_retry(&host, &handle(), 3, Duration::ZERO).unwrap_err();
        assert!(matches!(err, SupervisorError::BoundaryDestroyFailure { attempts: 3, .. }));
        assert_eq!(host.calls.load(Ordering::SeqCst), 3);
    }
}
