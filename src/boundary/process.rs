// src/boundary/process.rs

//! Out-of-process boundaries.
//!
//! Each boundary publishes a service locator whose lifecycle runs the
//! application's `[entry].command` as a child process:
//!
//! - stdout and stderr lines are written into the boundary's log, so the
//!   diagnostics relay carries them to the host;
//! - with `ready_on_stdout`, start waits (up to `ready_timeout`) for a
//!   matching stdout line; otherwise start succeeds once the process is
//!   spawned and has not already exited;
//! - stop kills and reaps the process; destroying the boundary kills any
//!   process still running.
//!
//! Lifecycle calls block on the runtime handle and must therefore come from
//! outside async contexts (the supervisor calls them from blocking tasks).

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use regex::Regex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::boundary::context::{BoundaryContext, Lifecycle, ServiceLocator};
use crate::boundary::{BoundaryHandle, BoundaryRequest, IsolationHost};
use crate::config::duration::parse_duration;
use crate::errors::BoundaryError;
use crate::peer::WELL_KNOWN_LOCATOR;

const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct ProcessHost {
    runtime: Handle,
}

impl ProcessHost {
    /// Must be called from within a Tokio runtime.
    pub fn new() -> Result<Self> {
        let runtime = Handle::try_current().context("ProcessHost needs a Tokio runtime")?;
        Ok(Self { runtime })
    }

    pub fn with_runtime(runtime: Handle) -> Self {
        Self { runtime }
    }
}

impl IsolationHost for ProcessHost {
    fn create_boundary(&self, request: &BoundaryRequest) -> Result<BoundaryHandle, BoundaryError> {
        let handle = BoundaryHandle::open(request)?;

        let workload = match ProcessWorkload::from_context(handle.context(), self.runtime.clone()) {
            Ok(w) => Arc::new(w),
            Err(err) => {
                handle.close();
                return Err(BoundaryError::Create {
                    name: request.name.clone(),
                    reason: format!("{err:#}"),
                });
            }
        };

        let ctx = handle.context();
        let on_close = Arc::clone(&workload);
        ctx.on_close(move || on_close.kill());
        ctx.entry_points()
            .register(WELL_KNOWN_LOCATOR, Arc::new(ProcessLocator { workload }));

        info!(boundary = %handle.name(), id = handle.id(), "process boundary created");
        Ok(handle)
    }

    fn destroy_boundary(&self, boundary: &BoundaryHandle) -> Result<(), BoundaryError> {
        boundary.close();
        info!(boundary = %boundary.name(), id = boundary.id(), "process boundary destroyed");
        Ok(())
    }
}

struct ProcessLocator {
    workload: Arc<ProcessWorkload>,
}

impl ServiceLocator for ProcessLocator {
    fn lifecycle(&self) -> Result<Arc<dyn Lifecycle>> {
        Ok(self.workload.clone())
    }
}

struct ProcessWorkload {
    boundary: String,
    program: PathBuf,
    args: Vec<String>,
    env: Vec<(String, String)>,
    ready: Option<Regex>,
    ready_timeout: Duration,
    ctx: Weak<BoundaryContext>,
    runtime: Handle,
    child: Mutex<Option<Child>>,
}

impl ProcessWorkload {
    fn from_context(ctx: &Arc<BoundaryContext>, runtime: Handle) -> Result<Self> {
        let entry = &ctx.components().entry;
        let command = entry
            .command
            .as_deref()
            .ok_or_else(|| anyhow!("{:?} has no [entry].command", ctx.config_path()))?;

        let ready = entry
            .ready_on_stdout
            .as_deref()
            .map(Regex::new)
            .transpose()
            .context("invalid [entry].ready_on_stdout regex")?;

        let ready_timeout = match entry.ready_timeout.as_deref() {
            Some(s) => parse_duration(s).map_err(|e| anyhow!("invalid [entry].ready_timeout: {e}"))?,
            None => DEFAULT_READY_TIMEOUT,
        };

        Ok(Self {
            boundary: ctx.name().to_string(),
            program: resolve_program(ctx.base_path(), command),
            args: entry.args.clone(),
            env: ctx
                .components()
                .env
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            ready,
            ready_timeout,
            ctx: Arc::downgrade(ctx),
            runtime,
            child: Mutex::new(None),
        })
    }

    async fn spawn(&self, ctx: &Arc<BoundaryContext>) -> Result<Child> {
        let module_path = std::env::join_paths(ctx.modules().search_dirs())
            .context("building APPVISOR_MODULE_PATH")?;

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .current_dir(ctx.base_path())
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .env("APPVISOR_BOUNDARY", &self.boundary)
            .env("APPVISOR_CONFIG", ctx.config_path())
            .env("APPVISOR_MODULE_PATH", module_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning {:?} for boundary '{}'", self.program, self.boundary))?;

        info!(
            boundary = %self.boundary,
            pid = child.id(),
            program = ?self.program,
            "workload process spawned"
        );

        let (ready_tx, ready_rx) = oneshot::channel::<()>();
        if let Some(stdout) = child.stdout.take() {
            let watch_for = self.ready.clone().map(|re| (re, ready_tx));
            self.runtime.spawn(pump_lines(stdout, Arc::downgrade(ctx), watch_for));
        }
        if let Some(stderr) = child.stderr.take() {
            self.runtime.spawn(pump_lines(stderr, Arc::downgrade(ctx), None));
        }

        let Some(re) = &self.ready else {
            if let Some(status) = child.try_wait()? {
                bail!("workload process exited immediately ({status})");
            }
            return Ok(child);
        };

        match timeout(self.ready_timeout, ready_rx).await {
            Ok(Ok(())) => {
                debug!(boundary = %self.boundary, "workload reported ready");
                Ok(child)
            }
            Ok(Err(_)) => {
                let _ = child.kill().await;
                bail!("workload closed stdout before printing a line matching /{re}/")
            }
            Err(_) => {
                let _ = child.kill().await;
                bail!(
                    "workload printed no line matching /{re}/ within {:?}",
                    self.ready_timeout
                )
            }
        }
    }

    /// Best-effort kill without waiting; used when the boundary closes.
    fn kill(&self) {
        let child = self.child.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(mut child) = child {
            if let Err(e) = child.start_kill() {
                warn!(boundary = %self.boundary, error = %e, "failed to kill workload process");
            }
        }
    }
}

impl Lifecycle for ProcessWorkload {
    fn start(&self) -> Result<()> {
        let mut slot = self.child.lock().unwrap_or_else(|e| e.into_inner());
        if slot.is_some() {
            bail!("workload process for '{}' is already running", self.boundary);
        }
        let ctx = self
            .ctx
            .upgrade()
            .ok_or_else(|| anyhow!("boundary '{}' is gone", self.boundary))?;
        let child = self.runtime.block_on(self.spawn(&ctx))?;
        *slot = Some(child);
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        let child = self.child.lock().unwrap_or_else(|e| e.into_inner()).take();
        let Some(mut child) = child else {
            return Ok(());
        };

        if let Some(status) = child.try_wait()? {
            info!(boundary = %self.boundary, %status, "workload process had already exited");
            return Ok(());
        }

        self.runtime
            .block_on(child.kill())
            .with_context(|| format!("killing workload process for '{}'", self.boundary))?;
        info!(boundary = %self.boundary, "workload process stopped");
        Ok(())
    }
}

/// Relative commands with a directory part run from the application
/// directory; bare names go through `PATH`.
fn resolve_program(base: &Path, command: &str) -> PathBuf {
    let path = Path::new(command);
    if path.is_relative() && path.components().count() > 1 {
        base.join(path)
    } else {
        path.to_path_buf()
    }
}

async fn pump_lines<R>(reader: R, ctx: Weak<BoundaryContext>, mut ready: Option<(Regex, oneshot::Sender<()>)>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let Some(ctx) = ctx.upgrade() else {
            break;
        };
        ctx.log().write(&line);

        let matched = matches!(&ready, Some((re, _)) if re.is_match(&line));
        if matched {
            if let Some((_, tx)) = ready.take() {
                let _ = tx.send(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_resolution() {
        let base = Path::new("/apps/orders");
        assert_eq!(resolve_program(base, "sh"), PathBuf::from("sh"));
        assert_eq!(resolve_program(base, "bin/svc"), PathBuf::from("/apps/orders/bin/svc"));
        assert_eq!(resolve_program(base, "/usr/bin/env"), PathBuf::from("/usr/bin/env"));
    }
}
