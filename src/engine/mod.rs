// src/engine/mod.rs

//! Watch engine.
//!
//! The debounce state machine lives in [`core`] and is pure: it consumes
//! [`RuntimeEvent`]s plus the current time and returns commands. The async
//! shell in [`runtime`] reads events from the channel, sleeps until the next
//! deadline, starts runs through a [`TaskRunner`] and publishes reload
//! notices.

use std::collections::BTreeSet;
use std::time::Duration;

use tokio::time::Instant;

use crate::pipeline::{RunResult, TaskName};
use crate::types::ChangeKind;

pub mod backend;
pub mod core;
pub mod runtime;

pub use backend::TaskRunner;
pub use self::core::{CoreCommand, CoreStep, WatchCore};
pub use runtime::WatchRuntime;

/// A single file change as seen by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    /// Relative to the project root, forward slashes.
    pub path: String,
    pub kind: ChangeKind,
    pub at: Instant,
}

impl WatchEvent {
    pub fn new(path: impl Into<String>, kind: ChangeKind, at: Instant) -> Self {
        Self {
            path: path.into(),
            kind,
            at,
        }
    }
}

/// Events flowing into the runtime from the watcher, runs and signals.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    PathChanged(WatchEvent),
    /// Run a task without a file change (initial build).
    TaskTriggered { task: TaskName },
    RunCompleted(RunResult),
    /// The file watcher can no longer deliver events.
    ObserverFailed(String),
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    /// Quiet period per task before a run starts.
    pub debounce: Duration,
}

impl RuntimeOptions {
    pub fn from_millis(debounce_ms: u64) -> Self {
        Self {
            debounce: Duration::from_millis(debounce_ms),
        }
    }
}

/// Observable state of the watch core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchState {
    Idle,
    /// Tasks with pending changes, in registration order, and the earliest
    /// deadline among them.
    Debouncing {
        pending: Vec<TaskName>,
        changed: BTreeSet<String>,
        deadline: Instant,
    },
    Running(TaskName),
}
