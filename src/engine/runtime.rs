// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, error, info};

use crate::errors::{Result, StagewatchError};
use crate::pipeline::RunResult;
use crate::reload::ReloadBroadcaster;

use super::core::WatchCore;
use super::{CoreCommand, RuntimeEvent, TaskRunner};

/// Async IO shell around [`WatchCore`].
///
/// Waits for either the next event or the core's next deadline, feeds the
/// core and executes the commands it returns. Runs are spawned on their own
/// Tokio task and report back as `RuntimeEvent::RunCompleted` on the same
/// channel, so the loop keeps receiving events while a run is in flight.
pub struct WatchRuntime<R: TaskRunner> {
    core: WatchCore,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    event_tx: mpsc::Sender<RuntimeEvent>,
    runner: Arc<R>,
    broadcaster: Arc<ReloadBroadcaster>,
}

impl<R: TaskRunner> fmt::Debug for WatchRuntime<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchRuntime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<R: TaskRunner> WatchRuntime<R> {
    /// `event_tx` must feed `event_rx`; run completions are sent through it.
    pub fn new(
        core: WatchCore,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        event_tx: mpsc::Sender<RuntimeEvent>,
        runner: Arc<R>,
        broadcaster: Arc<ReloadBroadcaster>,
    ) -> Self {
        Self {
            core,
            event_rx,
            event_tx,
            runner,
            broadcaster,
        }
    }

    /// Main loop. Returns once the core stops; an observer failure is
    /// returned as `StagewatchError::ObserverFailed`.
    pub async fn run(mut self) -> Result<()> {
        info!("watch runtime started");

        loop {
            let deadline = self.core.next_deadline();

            let event = tokio::select! {
                received = self.event_rx.recv() => match received {
                    Some(event) => Some(event),
                    None => {
                        info!("runtime event channel closed; exiting");
                        break;
                    }
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => None,
            };

            let now = Instant::now();
            let step = match event {
                Some(event) => {
                    debug!(?event, "runtime received event");
                    self.core.step(event, now)
                }
                None => self.core.tick(now),
            };

            for command in step.commands {
                self.execute_command(command);
            }

            if !step.keep_running {
                info!("core requested exit; stopping runtime");
                break;
            }
        }

        if let Some(reason) = self.core.fatal_error() {
            return Err(StagewatchError::ObserverFailed(reason.to_string()));
        }

        info!("runtime exiting");
        Ok(())
    }

    fn execute_command(&self, command: CoreCommand) {
        match command {
            CoreCommand::StartRun { task, changed } => {
                info!(task = %task, changed = changed.len(), "starting run");
                self.spawn_run(task);
            }
            CoreCommand::Broadcast { task, paths } => {
                let reached = self.broadcaster.notify(&task, paths);
                debug!(task = %task, observers = reached, "reload notice published");
            }
        }
    }

    fn spawn_run(&self, task: String) {
        let runner = Arc::clone(&self.runner);
        let tx = self.event_tx.clone();

        tokio::spawn(async move {
            let result = match runner.execute(&task).await {
                Ok(result) => result,
                Err(err) => {
                    error!(task = %task, error = %err, "run could not be started");
                    RunResult::empty(task.clone())
                }
            };

            if let Err(err) = tx.send(RuntimeEvent::RunCompleted(result)).await {
                debug!(error = %err, "runtime gone before run completed");
            }
        });
    }
}
