// src/watch/watcher.rs

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::engine::{RuntimeEvent, WatchEvent};
use crate::errors::Result;
use crate::types::ChangeKind;
use crate::watch::hash::ContentFilter;
use crate::watch::path_utils::relative_str;

/// Handle for the filesystem watcher.
///
/// Keeps the underlying `RecommendedWatcher` alive. Dropping this handle
/// stops file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Watch `watch_dirs` recursively and forward file changes to the runtime
/// as `RuntimeEvent::PathChanged`, with paths relative to `root`.
///
/// - `filter`, when given, drops create/modify events whose content hash is
///   unchanged.
/// - A notify error, or the removal of one of `watch_dirs`, is reported as
///   `RuntimeEvent::ObserverFailed` and ends event forwarding.
/// - Directories that do not exist yet are skipped with a warning; the
///   pipeline reports them when the task runs.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    watch_dirs: Vec<PathBuf>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    filter: Option<ContentFilter>,
) -> Result<WatcherHandle> {
    let root = root.into();
    let root = root.canonicalize().unwrap_or(root);

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            if let Err(err) = event_tx.send(res) {
                // The callback runs on notify's thread, outside any span.
                eprintln!("stagewatch: failed to forward notify event: {err}");
            }
        },
        Config::default(),
    )?;

    let mut watched = Vec::new();
    for dir in watch_dirs {
        if !dir.is_dir() {
            warn!(dir = ?dir, "source directory does not exist; not watching it");
            continue;
        }
        watcher.watch(&dir, RecursiveMode::Recursive)?;
        info!(dir = ?dir, "watching");
        watched.push(dir);
    }

    let filter = filter.map(|f| Arc::new(Mutex::new(f)));

    tokio::spawn(async move {
        while let Some(res) = event_rx.recv().await {
            let event = match res {
                Ok(event) => event,
                Err(err) => {
                    error!(error = %err, "file watch error");
                    let _ = runtime_tx
                        .send(RuntimeEvent::ObserverFailed(err.to_string()))
                        .await;
                    break;
                }
            };

            debug!(?event, "received notify event");

            let Some(kind) = ChangeKind::from_notify(&event.kind) else {
                continue;
            };

            for path in event.paths {
                if kind == ChangeKind::Deleted && watched.iter().any(|d| d == &path) {
                    let reason = format!("watched directory {} was removed", path.display());
                    let _ = runtime_tx.send(RuntimeEvent::ObserverFailed(reason)).await;
                    return;
                }

                if kind != ChangeKind::Deleted && path.is_dir() {
                    continue;
                }

                let Some(rel) = relative_str(&root, &path) else {
                    debug!(?path, "change outside project root; ignoring");
                    continue;
                };

                if let Some(filter) = &filter {
                    if !content_changed(Arc::clone(filter), path.clone(), kind).await {
                        continue;
                    }
                }

                let change = WatchEvent::new(rel, kind, Instant::now());
                if runtime_tx.send(RuntimeEvent::PathChanged(change)).await.is_err() {
                    debug!("runtime gone; stopping watcher loop");
                    return;
                }
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle { _inner: watcher })
}

/// Hashing reads the file, so it runs on the blocking pool.
async fn content_changed(
    filter: Arc<Mutex<ContentFilter>>,
    path: PathBuf,
    kind: ChangeKind,
) -> bool {
    tokio::task::spawn_blocking(move || {
        let mut filter = filter.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match kind {
            ChangeKind::Deleted => {
                filter.forget(&path);
                true
            }
            ChangeKind::Created | ChangeKind::Modified => filter.has_changed(&path),
        }
    })
    .await
    .unwrap_or(true)
}
