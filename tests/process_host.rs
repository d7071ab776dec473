// tests/process_host.rs
//
// Out-of-process boundaries driven through a real supervisor.

#![cfg(unix)]

use std::sync::Arc;
use std::time::Duration;

use appvisor::boundary::ProcessHost;
use appvisor::descriptor::ApplicationDescriptor;
use appvisor::errors::SupervisorError;
use appvisor::supervisor::{ModuleSupervisor, SupervisorSettings};
use appvisor::types::SupervisorState;
use appvisor_test_utils::builders::{fast_timing, AppDirBuilder};
use appvisor_test_utils::recording::RecordingSink;
use appvisor_test_utils::{init_tracing, wait_until};

fn supervisor(app: &std::path::Path) -> (ModuleSupervisor, Arc<RecordingSink>) {
    init_tracing();
    let host = Arc::new(ProcessHost::new().unwrap());
    let sink = Arc::new(RecordingSink::default());
    let settings = SupervisorSettings::new(host, "/nonexistent/shared")
        .with_timing(fast_timing())
        .with_sink(sink.clone());
    (
        ModuleSupervisor::new(ApplicationDescriptor::new("Orders", app), settings),
        sink,
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn child_output_is_relayed_and_stop_kills_it() {
    let app = AppDirBuilder::new()
        .components(
            r#"
[entry]
command = "sh"
args = ["-c", "echo \"boundary=$APPVISOR_BOUNDARY mode=$ORDERS_MODE\"; echo warming >&2; echo ready; exec sleep 30"]
ready_on_stdout = "^ready"
ready_timeout = "5s"

[env]
ORDERS_MODE = "test"
"#,
        )
        .build();
    let (supervisor, sink) = supervisor(app.path());

    supervisor.start().unwrap();
    wait_until("loaded", Duration::from_secs(10), || {
        supervisor.state() == SupervisorState::Loaded
    })
    .await;
    wait_until("ready line relayed", Duration::from_secs(5), || {
        sink.contains("[Orders] ready")
    })
    .await;
    assert!(sink.contains("[Orders] boundary=Orders mode=test"));
    wait_until("stderr relayed", Duration::from_secs(5), || {
        sink.contains("[Orders] warming")
    })
    .await;

    supervisor.stop().await.unwrap();
    assert_eq!(supervisor.state(), SupervisorState::Unloaded);
    assert!(supervisor.last_failure().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn exiting_before_ready_is_a_peer_load_failure() {
    let app = AppDirBuilder::new()
        .components(
            r#"
[entry]
command = "sh"
args = ["-c", "echo booting; exit 3"]
ready_on_stdout = "^ready"
"#,
        )
        .build();
    let (supervisor, sink) = supervisor(app.path());

    supervisor.start().unwrap();
    wait_until("first failure", Duration::from_secs(10), || {
        supervisor.last_failure().is_some()
    })
    .await;

    assert_eq!(supervisor.last_failure(), Some(SupervisorError::PeerLoadFailure));
    wait_until("failure relayed", Duration::from_secs(5), || {
        sink.contains("[Orders] peer: failed to start workload")
    })
    .await;
    supervisor.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn silent_workload_times_out_waiting_for_ready() {
    let app = AppDirBuilder::new()
        .components(
            r#"
[entry]
command = "sh"
args = ["-c", "exec sleep 30"]
ready_on_stdout = "^ready"
ready_timeout = "200ms"
"#,
        )
        .build();
    let (supervisor, _sink) = supervisor(app.path());

    supervisor.start().unwrap();
    wait_until("first failure", Duration::from_secs(10), || {
        supervisor.last_failure().is_some()
    })
    .await;
    assert_eq!(supervisor.last_failure(), Some(SupervisorError::PeerLoadFailure));
    supervisor.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn missing_command_is_a_create_failure() {
    let app = AppDirBuilder::new().components("[entry]\nargs = [\"x\"]\n").build();
    let (supervisor, _sink) = supervisor(app.path());

    supervisor.start().unwrap();
    wait_until("first failure", Duration::from_secs(10), || {
        supervisor.last_failure().is_some()
    })
    .await;
    assert!(matches!(
        supervisor.last_failure(),
        Some(SupervisorError::BoundaryCreateFailure(reason)) if reason.contains("[entry].command")
    ));
    supervisor.stop().await.unwrap();
}
