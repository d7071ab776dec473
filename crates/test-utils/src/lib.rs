pub mod builders;
pub mod fake_host;
pub mod fake_workload;
pub mod recording;

use std::sync::Once;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::{fmt, EnvFilter};

use appvisor::types::SupervisorState;

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// Wait until a supervisor reports `state`, for at most `limit`.
///
/// Under a paused clock `limit` is virtual time, so a generous limit costs
/// nothing.
pub async fn wait_for_state(
    rx: &mut watch::Receiver<SupervisorState>,
    state: SupervisorState,
    limit: Duration,
) {
    tokio::time::timeout(limit, rx.wait_for(|s| *s == state))
        .await
        .unwrap_or_else(|_| panic!("supervisor did not reach {state} within {limit:?}"))
        .expect("supervisor dropped");
}

/// Poll `cond` every 10ms until it holds, for at most `limit` of real time.
pub async fn wait_until<F>(what: &str, limit: Duration, mut cond: F)
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + limit;
    while !cond() {
        if tokio::time::Instant::now() >= deadline {
            panic!("timed out after {limit:?} waiting for {what}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
