use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use stagewatch::engine::TaskRunner;
use stagewatch::errors::{Result, StagewatchError};
use stagewatch::pipeline::RunResult;

/// A fake task runner that:
/// - records which tasks were "run", in order
/// - optionally sleeps to simulate a long run
/// - returns a RunResult with the canned written paths for that task.
#[derive(Clone, Default)]
pub struct FakeTaskRunner {
    known: Vec<String>,
    executed: Arc<Mutex<Vec<String>>>,
    outputs: HashMap<String, Vec<PathBuf>>,
    delay: Option<Duration>,
}

impl FakeTaskRunner {
    pub fn new(known: &[&str]) -> Self {
        Self {
            known: known.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn with_outputs(mut self, task: &str, paths: &[&str]) -> Self {
        self.outputs
            .insert(task.to_string(), paths.iter().map(PathBuf::from).collect());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn executed(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.executed)
    }
}

impl TaskRunner for FakeTaskRunner {
    fn execute<'a>(
        &'a self,
        task: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<RunResult>> + Send + 'a>> {
        Box::pin(async move {
            if !self.known.iter().any(|k| k == task) {
                return Err(StagewatchError::UnknownTask(task.to_string()));
            }

            self.executed.lock().unwrap().push(task.to_string());

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            let mut result = RunResult::empty(task);
            result.written = self.outputs.get(task).cloned().unwrap_or_default();
            Ok(result)
        })
    }
}
