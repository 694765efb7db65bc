// src/pipeline/sink.rs

use std::sync::{Mutex, MutexGuard};

use tracing::warn;

use crate::pipeline::{Diagnostic, TaskName};

/// Collects the diagnostics of one run.
///
/// Shared by every file worker of the run. `report` never fails, so a stage
/// failure can always be recorded and the run carries on.
#[derive(Debug)]
pub struct ErrorSink {
    task: TaskName,
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl ErrorSink {
    pub fn new(task: impl Into<TaskName>) -> Self {
        Self {
            task: task.into(),
            diagnostics: Mutex::new(Vec::new()),
        }
    }

    pub fn report(&self, diagnostic: Diagnostic) {
        warn!(
            task = %self.task,
            stage = %diagnostic.stage,
            kind = %diagnostic.kind,
            path = %diagnostic.path.display(),
            line = ?diagnostic.line,
            "{}",
            diagnostic.message
        );
        self.lock().push(diagnostic);
    }

    /// Drain everything reported so far, sorted.
    pub fn take(&self) -> Vec<Diagnostic> {
        let mut out = std::mem::take(&mut *self.lock());
        out.sort();
        out
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Diagnostic>> {
        // A worker that panicked mid-push leaves the Vec intact.
        self.diagnostics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
