// src/pipeline/registry.rs

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use tracing::debug;

use crate::config::ConfigFile;
use crate::engine::TaskRunner;
use crate::errors::{Result, StagewatchError};
use crate::fs::FileSystem;
use crate::pipeline::{Pipeline, RunResult, Task, TaskName};
use crate::watch::patterns::TaskWatchProfile;

/// Task name → task, in registration order.
///
/// Built once from the config and read-only afterwards; the watch runtime
/// holds it behind an `Arc`.
#[derive(Debug)]
pub struct PipelineRegistry {
    pipeline: Pipeline,
    order: Vec<TaskName>,
    tasks: HashMap<TaskName, Arc<Task>>,
}

impl PipelineRegistry {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            order: Vec::new(),
            tasks: HashMap::new(),
        }
    }

    /// Build every `[[task]]` of a validated config, in file order.
    pub fn from_config(
        cfg: &ConfigFile,
        fs: Arc<dyn FileSystem>,
        root: impl Into<PathBuf>,
    ) -> Result<Self> {
        let pipeline = Pipeline::new(fs, root, cfg.config.effective_workers());
        let mut registry = Self::new(pipeline);
        for task_cfg in cfg.tasks() {
            registry.register(Task::from_config(task_cfg)?)?;
        }
        debug!(tasks = ?registry.order, "pipeline registry built");
        Ok(registry)
    }

    pub fn register(&mut self, task: Task) -> Result<()> {
        let name = task.name().to_string();
        if self.tasks.contains_key(&name) {
            return Err(StagewatchError::DuplicateTask(name));
        }
        self.order.push(name.clone());
        self.tasks.insert(name, Arc::new(task));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Arc<Task>> {
        self.tasks
            .get(name)
            .cloned()
            .ok_or_else(|| StagewatchError::UnknownTask(name.to_string()))
    }

    /// Task names in registration order.
    pub fn names(&self) -> &[TaskName] {
        &self.order
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Arc<Task>> {
        self.order.iter().filter_map(|name| self.tasks.get(name))
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Glob interest of every task, in registration order.
    pub fn watch_profiles(&self) -> Vec<TaskWatchProfile> {
        self.tasks()
            .map(|t| {
                TaskWatchProfile::new(t.name(), t.source().clone()).excluding(t.dest_prefix())
            })
            .collect()
    }

    /// Directories to watch recursively: every task's glob base, with
    /// directories nested inside another one dropped.
    pub fn watch_dirs(&self) -> Vec<PathBuf> {
        let root = self.pipeline.root();
        let mut dirs: Vec<PathBuf> = self
            .tasks()
            .map(|t| root.join(t.source().base()))
            .collect();
        dirs.sort();
        dirs.dedup();

        let mut kept: Vec<PathBuf> = Vec::new();
        for dir in dirs {
            if !kept.iter().any(|k| dir.starts_with(k)) {
                kept.push(dir);
            }
        }
        kept
    }

    pub async fn run_task(&self, name: &str) -> Result<RunResult> {
        let task = self.get(name)?;
        Ok(self.pipeline.run(task).await)
    }
}

impl TaskRunner for PipelineRegistry {
    fn execute<'a>(
        &'a self,
        task: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<RunResult>> + Send + 'a>> {
        Box::pin(self.run_task(task))
    }
}
