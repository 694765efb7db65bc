// src/engine/core.rs

//! Pure debounce state machine.
//!
//! No channels, no timers, no IO: every method takes the current time as an
//! argument, which keeps the debounce behaviour deterministic under test.
//!
//! Debouncing is per task. A change extends the window of each task whose
//! glob matches it; a task starts once its own window has elapsed. Only one
//! run is in flight at a time, and due tasks start in registration order.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::engine::{RuntimeEvent, RuntimeOptions, WatchEvent, WatchState};
use crate::pipeline::{RunResult, TaskName};
use crate::watch::patterns::TaskWatchProfile;

/// Commands for the IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Start a run of `task`; `changed` lists the root-relative paths that
    /// caused it (empty for a manual trigger).
    StartRun { task: TaskName, changed: Vec<String> },
    /// Publish the outputs written by a finished run.
    Broadcast { task: TaskName, paths: Vec<PathBuf> },
}

/// Result of feeding one event into the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    pub keep_running: bool,
}

impl CoreStep {
    fn proceed(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }

    fn stop(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: false,
        }
    }
}

#[derive(Debug, Clone)]
struct PendingRun {
    changed: BTreeSet<String>,
    deadline: Instant,
}

#[derive(Debug)]
pub struct WatchCore {
    profiles: Vec<TaskWatchProfile>,
    debounce: Duration,
    /// Keyed by registration index so iteration order is config order.
    pending: BTreeMap<usize, PendingRun>,
    running: Option<usize>,
    /// Arrived while a run was in flight; replayed when it completes.
    queued: Vec<(usize, Option<String>)>,
    stopping: bool,
    fatal: Option<String>,
}

impl WatchCore {
    pub fn new(profiles: Vec<TaskWatchProfile>, options: RuntimeOptions) -> Self {
        Self {
            profiles,
            debounce: options.debounce,
            pending: BTreeMap::new(),
            running: None,
            queued: Vec::new(),
            stopping: false,
            fatal: None,
        }
    }

    pub fn step(&mut self, event: RuntimeEvent, now: Instant) -> CoreStep {
        match event {
            RuntimeEvent::PathChanged(ev) => self.on_path_changed(ev),
            RuntimeEvent::TaskTriggered { task } => self.on_task_triggered(&task, now),
            RuntimeEvent::RunCompleted(result) => self.on_run_completed(result, now),
            RuntimeEvent::ObserverFailed(reason) => {
                error!(%reason, "file watcher failed");
                self.fatal.get_or_insert(reason);
                self.begin_stop()
            }
            RuntimeEvent::ShutdownRequested => {
                info!("shutdown requested");
                self.begin_stop()
            }
        }
    }

    /// Called when the earliest deadline may have elapsed.
    pub fn tick(&mut self, now: Instant) -> CoreStep {
        CoreStep::proceed(self.start_due(now).into_iter().collect())
    }

    /// When the shell should wake up next, if at all.
    pub fn next_deadline(&self) -> Option<Instant> {
        if self.stopping || self.running.is_some() {
            return None;
        }
        self.pending.values().map(|p| p.deadline).min()
    }

    pub fn state(&self) -> WatchState {
        if let Some(idx) = self.running {
            return WatchState::Running(self.task_name(idx));
        }

        let Some(deadline) = self.pending.values().map(|p| p.deadline).min() else {
            return WatchState::Idle;
        };

        WatchState::Debouncing {
            pending: self.pending.keys().map(|&i| self.task_name(i)).collect(),
            changed: self
                .pending
                .values()
                .flat_map(|p| p.changed.iter().cloned())
                .collect(),
            deadline,
        }
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping
    }

    /// Reason the watcher failed, if it did.
    pub fn fatal_error(&self) -> Option<&str> {
        self.fatal.as_deref()
    }

    fn on_path_changed(&mut self, ev: WatchEvent) -> CoreStep {
        if self.stopping {
            return CoreStep::proceed(Vec::new());
        }

        let owners: Vec<usize> = self
            .profiles
            .iter()
            .enumerate()
            .filter(|(_, p)| p.matches(&ev.path))
            .map(|(i, _)| i)
            .collect();

        if owners.is_empty() {
            debug!(path = %ev.path, "change matches no task; ignoring");
            return CoreStep::proceed(Vec::new());
        }

        for idx in owners {
            if self.running.is_some() {
                debug!(task = %self.task_name(idx), path = %ev.path, "run in flight; queueing change");
                self.queued.push((idx, Some(ev.path.clone())));
            } else {
                self.schedule(idx, Some(ev.path.clone()), ev.at + self.debounce);
            }
        }

        CoreStep::proceed(Vec::new())
    }

    fn on_task_triggered(&mut self, task: &str, now: Instant) -> CoreStep {
        if self.stopping {
            return CoreStep::proceed(Vec::new());
        }

        let Some(idx) = self.profiles.iter().position(|p| p.name() == task) else {
            warn!(task, "trigger for unknown task; ignoring");
            return CoreStep::proceed(Vec::new());
        };

        if self.running.is_some() {
            self.queued.push((idx, None));
        } else {
            self.schedule(idx, None, now);
        }
        CoreStep::proceed(Vec::new())
    }

    fn on_run_completed(&mut self, result: RunResult, now: Instant) -> CoreStep {
        match self.running.take() {
            Some(idx) if self.task_name(idx) == result.task => {}
            other => debug!(
                task = %result.task,
                running = ?other.map(|i| self.task_name(i)),
                "completion does not match the running task"
            ),
        }

        let mut commands = Vec::new();
        if !result.written.is_empty() {
            commands.push(CoreCommand::Broadcast {
                task: result.task.clone(),
                paths: result.written,
            });
        }

        if self.stopping {
            return CoreStep::stop(commands);
        }

        let deadline = now + self.debounce;
        for (idx, path) in std::mem::take(&mut self.queued) {
            self.schedule(idx, path, deadline);
        }

        commands.extend(self.start_due(now));
        CoreStep::proceed(commands)
    }

    /// Drop pending work; exit now, or once the in-flight run completes.
    fn begin_stop(&mut self) -> CoreStep {
        self.stopping = true;
        self.pending.clear();
        self.queued.clear();

        match self.running {
            Some(idx) => {
                info!(task = %self.task_name(idx), "waiting for in-flight run before exiting");
                CoreStep::proceed(Vec::new())
            }
            None => CoreStep::stop(Vec::new()),
        }
    }

    fn schedule(&mut self, idx: usize, path: Option<String>, deadline: Instant) {
        let entry = self.pending.entry(idx).or_insert_with(|| PendingRun {
            changed: BTreeSet::new(),
            deadline,
        });
        entry.deadline = deadline;
        if let Some(path) = path {
            entry.changed.insert(path);
        }
    }

    fn start_due(&mut self, now: Instant) -> Option<CoreCommand> {
        if self.stopping || self.running.is_some() {
            return None;
        }

        let idx = self
            .pending
            .iter()
            .find(|(_, p)| p.deadline <= now)
            .map(|(&i, _)| i)?;
        let run = self.pending.remove(&idx)?;
        self.running = Some(idx);

        Some(CoreCommand::StartRun {
            task: self.task_name(idx),
            changed: run.changed.into_iter().collect(),
        })
    }

    fn task_name(&self, idx: usize) -> TaskName {
        self.profiles
            .get(idx)
            .map(|p| p.name().to_string())
            .unwrap_or_default()
    }
}
