// src/reload.rs

//! Live-reload notifications.
//!
//! After a run the watch runtime publishes the set of written output paths.
//! Delivery is fire-and-forget over a `tokio::sync::broadcast` channel:
//! nothing is retried, and a run never waits for observers.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::pipeline::TaskName;

const DEFAULT_CAPACITY: usize = 64;

/// Output paths changed by one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadNotice {
    pub task: TaskName,
    pub paths: BTreeSet<PathBuf>,
}

#[derive(Debug)]
pub struct ReloadBroadcaster {
    tx: broadcast::Sender<ReloadNotice>,
    /// Set while notices are being dropped for lack of observers.
    observers_missing: AtomicBool,
}

impl ReloadBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            observers_missing: AtomicBool::new(false),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadNotice> {
        self.tx.subscribe()
    }

    pub fn observer_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Publish the changed paths of `task`. Returns the number of observers
    /// the notice reached.
    ///
    /// Empty path sets are not sent. Without observers a single warning is
    /// logged until a notice is delivered again.
    pub fn notify<I>(&self, task: &str, paths: I) -> usize
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let paths: BTreeSet<PathBuf> = paths.into_iter().collect();
        if paths.is_empty() {
            debug!(task, "nothing changed; no reload notice");
            return 0;
        }

        let notice = ReloadNotice {
            task: task.to_string(),
            paths,
        };

        match self.tx.send(notice) {
            Ok(delivered) => {
                if self.observers_missing.swap(false, Ordering::Relaxed) {
                    info!("reload observers connected again");
                }
                delivered
            }
            Err(_) => {
                if !self.observers_missing.swap(true, Ordering::Relaxed) {
                    warn!(task, "no reload observers connected; dropping notices");
                }
                0
            }
        }
    }
}

impl Default for ReloadBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Observer that logs every notice. Stops when the broadcaster is dropped.
pub fn spawn_log_observer(mut rx: broadcast::Receiver<ReloadNotice>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(notice) => {
                    info!(task = %notice.task, files = notice.paths.len(), "reload");
                    for path in &notice.paths {
                        debug!(task = %notice.task, path = %path.display(), "changed output");
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "reload observer lagged behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
