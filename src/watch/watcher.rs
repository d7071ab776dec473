// src/watch/watcher.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::supervisor::duration_millis;
use crate::watch::debounce::debounce;

/// A live recursive watch on one application directory.
///
/// Create, modify, remove and rename events anywhere under the path are
/// merged into one stream and debounced. Dropping the subscription stops
/// the watcher and cancels any burst still settling.
pub struct WatchSubscription {
    path: PathBuf,
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl std::fmt::Debug for WatchSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchSubscription")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl WatchSubscription {
    /// Watch `path` recursively; `on_change` gets the last event of each
    /// burst once `quiet` has passed without another one.
    pub fn subscribe<F>(path: &Path, quiet: Duration, runtime: &Handle, on_change: F) -> Result<Self>
    where
        F: FnMut(Event) + Send + 'static,
    {
        // Channel from the blocking notify callback into the async world.
        let (event_tx, event_rx) = mpsc::unbounded_channel::<Event>();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if is_change(&event.kind) => {
                    // Subscription dropped: nothing left to notify.
                    let _ = event_tx.send(event);
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(error = %err, "file watch error");
                }
            },
            Config::default(),
        )
        .context("creating file watcher")?;

        watcher
            .watch(path, RecursiveMode::Recursive)
            .with_context(|| format!("watching {path:?}"))?;

        let task = runtime.spawn(debounce(event_rx, quiet, on_change));

        info!(path = ?path, quiet_ms = duration_millis(quiet), "file watch installed");
        Ok(Self {
            path: path.to_path_buf(),
            _watcher: watcher,
            task,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WatchSubscription {
    fn drop(&mut self) {
        self.task.abort();
        debug!(path = ?self.path, "file watch removed");
    }
}

fn is_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Any | EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}
