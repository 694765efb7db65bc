// src/pipeline/result.rs

use std::path::PathBuf;

use crate::pipeline::{Diagnostic, TaskName};

/// Outcome of running one task over all of its source files.
///
/// Both lists are sorted, so two runs over the same inputs compare equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub task: TaskName,
    /// Output files and source maps written by this run.
    pub written: Vec<PathBuf>,
    pub diagnostics: Vec<Diagnostic>,
}

impl RunResult {
    pub fn empty(task: impl Into<TaskName>) -> Self {
        Self {
            task: task.into(),
            written: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Process exit code for a one-shot `run`.
    pub fn exit_code(&self) -> i32 {
        if self.is_success() { 0 } else { 1 }
    }

    pub fn summary(&self) -> String {
        format!(
            "{}: {} file(s) written, {} diagnostic(s)",
            self.task,
            self.written.len(),
            self.diagnostics.len()
        )
    }
}
