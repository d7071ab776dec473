// tests/config_loading.rs

use std::path::Path;
use std::time::Duration;

use appvisor::config::{load_and_validate, load_from_path};
use appvisor::errors::AppvisorError;
use appvisor::types::HostKind;

fn write_config(dir: &Path, contents: &str) -> std::path::PathBuf {
    let path = dir.join("Appvisor.toml");
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn full_config_is_loaded_and_rebased() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"
[supervisor]
host = "local"
shared_dir = "lib"

[timing]
first_attempt = "250ms"
missing_retry_min = "1m"
missing_retry_max = "2m"
fault_retry_min = "5s"
fault_retry_max = "10s"
reload_delay_min = "1s"
reload_delay_max = "3s"
debounce = "2s"
teardown_attempts = 5
teardown_pause = "100ms"

[[application]]
name = "Orders"
path = "apps/orders"
watch = true

[[application]]
name = "Billing"
path = "/srv/billing"
config = "conf/billing.toml"
shadow_copy = true
"#,
    );

    let cfg = load_and_validate(&path).unwrap();
    assert_eq!(cfg.supervisor.host, HostKind::Local);
    assert_eq!(cfg.shared_dir(), dir.path().join("lib"));

    let t = &cfg.timing;
    assert_eq!(t.first_attempt, Duration::from_millis(250));
    assert_eq!(t.missing_retry.min, Duration::from_secs(60));
    assert_eq!(t.missing_retry.max, Duration::from_secs(120));
    assert_eq!(t.fault_retry.min, Duration::from_secs(5));
    assert_eq!(t.reload_delay.max, Duration::from_secs(3));
    assert_eq!(t.debounce, Duration::from_secs(2));
    assert_eq!(t.teardown_attempts, 5);
    assert_eq!(t.teardown_pause, Duration::from_millis(100));

    let descriptors = cfg.descriptors();
    assert_eq!(descriptors.len(), 2);

    let orders = &descriptors[0];
    assert_eq!(orders.name(), "Orders");
    assert_eq!(orders.source_path(), dir.path().join("apps/orders"));
    assert_eq!(orders.config_path(), dir.path().join("apps/orders/Components.config"));
    assert!(orders.watch());
    assert!(!orders.shadow_copy());

    let billing = &descriptors[1];
    assert_eq!(billing.source_path(), Path::new("/srv/billing"));
    assert_eq!(billing.config_path(), Path::new("/srv/billing/conf/billing.toml"));
    assert!(!billing.watch());
    assert!(billing.shadow_copy());
}

#[test]
fn minimal_config_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        "[[application]]\nname = \"Orders\"\npath = \"/apps/orders\"\n",
    );

    let cfg = load_and_validate(&path).unwrap();
    assert_eq!(cfg.supervisor.host, HostKind::Process);
    assert_eq!(cfg.timing.first_attempt, Duration::from_secs(1));
    assert_eq!(cfg.timing.missing_retry.min, Duration::from_secs(300));
    assert_eq!(cfg.timing.missing_retry.max, Duration::from_secs(600));
    assert_eq!(cfg.timing.fault_retry.min, Duration::from_secs(30));
    assert_eq!(cfg.timing.fault_retry.max, Duration::from_secs(60));
    assert_eq!(cfg.timing.debounce, Duration::from_secs(5));
    assert_eq!(cfg.timing.teardown_attempts, 3);
}

#[test]
fn raw_load_does_not_validate() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "[supervisor]\nhost = \"local\"\n");

    let raw = load_from_path(&path).unwrap();
    assert!(raw.application.is_empty());
    assert!(matches!(
        load_and_validate(&path),
        Err(AppvisorError::ConfigError(msg)) if msg.contains("at least one")
    ));
}

#[test]
fn duplicate_names_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"
[[application]]
name = "Orders"
path = "a"

[[application]]
name = "Orders"
path = "b"
"#,
    );
    assert!(matches!(
        load_and_validate(&path),
        Err(AppvisorError::DuplicateApplication(name)) if name == "Orders"
    ));
}

#[test]
fn inverted_jitter_range_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"
[timing]
fault_retry_min = "1m"
fault_retry_max = "30s"

[[application]]
name = "Orders"
path = "a"
"#,
    );
    assert!(matches!(
        load_and_validate(&path),
        Err(AppvisorError::ConfigError(msg)) if msg.contains("fault_retry_min")
    ));
}

#[test]
fn bad_durations_and_hosts_are_reported() {
    let dir = tempfile::tempdir().unwrap();

    let path = write_config(
        dir.path(),
        "[timing]\ndebounce = \"soon\"\n[[application]]\nname = \"Orders\"\npath = \"a\"\n",
    );
    assert!(matches!(
        load_and_validate(&path),
        Err(AppvisorError::ConfigError(msg)) if msg.contains("[timing].debounce")
    ));

    let path = write_config(
        dir.path(),
        "[timing]\nfirst_attempt = \"307445734561825861m\"\n[[application]]\nname = \"Orders\"\npath = \"a\"\n",
    );
    assert!(matches!(
        load_and_validate(&path),
        Err(AppvisorError::ConfigError(msg)) if msg.contains("too large")
    ));

    let path = write_config(
        dir.path(),
        "[supervisor]\nhost = \"vm\"\n[[application]]\nname = \"Orders\"\npath = \"a\"\n",
    );
    assert!(matches!(load_and_validate(&path), Err(AppvisorError::TomlError(_))));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        load_and_validate(dir.path().join("nope.toml")),
        Err(AppvisorError::IoError(_))
    ));
}
