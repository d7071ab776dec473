// src/lib.rs

pub mod boundary;
pub mod cli;
pub mod config;
pub mod descriptor;
pub mod errors;
pub mod fs;
pub mod group;
pub mod logging;
pub mod modules;
pub mod peer;
pub mod relay;
pub mod signals;
pub mod supervisor;
pub mod types;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, error, info, warn};

use crate::boundary::{IsolationHost, LocalHost, ProcessHost, WorkloadCatalog};
use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::group::{ControlRequest, HostControl, LoggingHooks, SupervisorGroup};
use crate::supervisor::SupervisorSettings;
use crate::types::HostKind;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the isolation host
/// - the supervisor group and its hooks
/// - signal handling and restart requests
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let mut cfg = load_and_validate(&config_path)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let (control, mut requests) = HostControl::channel();

    // Termination signal → graceful shutdown.
    {
        let control = control.clone();
        tokio::spawn(async move {
            if let Err(e) = signals::wait_for_shutdown_signal().await {
                error!(error = %e, "failed to listen for shutdown signals");
                return;
            }
            info!("shutdown signal received");
            control.stop();
        });
    }

    loop {
        let settings = SupervisorSettings::new(build_host(cfg.supervisor.host)?, cfg.shared_dir())
            .with_timing(cfg.timing.clone());
        let group = SupervisorGroup::new(cfg.descriptors(), settings, control.clone())?
            .with_hooks(LoggingHooks);

        if !group.start() {
            warn!("not every application supervisor started");
        }

        // `control` is alive for the whole loop, so the channel stays open.
        let request = requests.recv().await.unwrap_or(ControlRequest::Stop);
        debug!(?request, "host control request received");

        if !group.stop().await {
            warn!("not every application supervisor stopped cleanly");
        }

        match request {
            ControlRequest::Stop => break,
            ControlRequest::Restart => {
                info!(config = ?config_path, "restarting with reloaded configuration");
                match load_and_validate(&config_path) {
                    Ok(fresh) => cfg = fresh,
                    Err(e) => warn!(error = %e, "config reload failed; keeping the previous configuration"),
                }
            }
        }
    }

    info!("appvisor exiting");
    Ok(())
}

fn build_host(kind: HostKind) -> Result<Arc<dyn IsolationHost>> {
    Ok(match kind {
        HostKind::Process => Arc::new(ProcessHost::new()?),
        HostKind::Local => {
            warn!("local host selected with an empty workload catalog; every load will fail");
            Arc::new(LocalHost::new(WorkloadCatalog::new()))
        }
    })
}

/// Simple dry-run output: print applications and timing.
fn print_dry_run(cfg: &ConfigFile) {
    println!("appvisor dry-run");
    println!("  supervisor.host = {:?}", cfg.supervisor.host);
    println!("  supervisor.shared_dir = {:?}", cfg.shared_dir());
    println!("  timing.first_attempt = {:?}", cfg.timing.first_attempt);
    println!("  timing.missing_retry = {}", cfg.timing.missing_retry);
    println!("  timing.fault_retry = {}", cfg.timing.fault_retry);
    println!("  timing.reload_delay = {}", cfg.timing.reload_delay);
    println!("  timing.debounce = {:?}", cfg.timing.debounce);
    println!(
        "  timing.teardown = {} attempts, {:?} apart",
        cfg.timing.teardown_attempts, cfg.timing.teardown_pause
    );
    println!();

    let descriptors = cfg.descriptors();
    println!("applications ({}):", descriptors.len());
    for d in &descriptors {
        println!("  - {}", d.name());
        println!("      path: {:?}", d.source_path());
        println!("      config: {:?}", d.config_path());
        if d.watch() {
            println!("      watch: true");
        }
        if d.shadow_copy() {
            println!("      shadow_copy: true");
        }
    }

    debug!("dry-run complete (nothing loaded)");
}
