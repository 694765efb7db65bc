// src/pipeline/task.rs

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::config::TaskConfig;
use crate::errors::{Result, StagewatchError};
use crate::pipeline::TaskName;
use crate::stage::{Stage, build_stage};
use crate::watch::patterns::SourcePattern;

/// A named pipeline: stages applied in order to every file matching
/// `source`, written below `dest`.
///
/// Immutable once built; shared as `Arc<Task>`.
#[derive(Debug)]
pub struct Task {
    name: TaskName,
    stages: Vec<Arc<dyn Stage>>,
    source: SourcePattern,
    dest: PathBuf,
}

impl Task {
    pub fn new(
        name: impl Into<TaskName>,
        stages: Vec<Arc<dyn Stage>>,
        source: SourcePattern,
        dest: impl Into<PathBuf>,
    ) -> Result<Self> {
        let name = name.into();
        let dest = dest.into();

        let invalid = |reason: &str| StagewatchError::InvalidTask {
            name: name.clone(),
            reason: reason.to_string(),
        };

        if name.trim().is_empty() {
            return Err(invalid("task name must not be empty"));
        }
        if stages.is_empty() {
            return Err(invalid("at least one stage is required"));
        }
        if source.as_str().is_empty() {
            return Err(invalid("`src` must not be empty"));
        }
        if source.as_str().starts_with('/') {
            return Err(invalid("`src` must be relative to the project root"));
        }
        if dest.as_os_str().is_empty() {
            return Err(invalid("`dest` must not be empty"));
        }

        Ok(Self {
            name,
            stages,
            source,
            dest,
        })
    }

    pub fn from_config(cfg: &TaskConfig) -> Result<Self> {
        let invalid = |err: anyhow::Error| StagewatchError::InvalidTask {
            name: cfg.name.clone(),
            reason: format!("{err:#}"),
        };

        let source = SourcePattern::parse(&cfg.src).map_err(invalid)?;
        let stages = cfg
            .stages
            .iter()
            .map(build_stage)
            .collect::<anyhow::Result<Vec<_>>>()
            .map_err(invalid)?;

        Self::new(cfg.name.clone(), stages, source, cfg.dest.trim())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stages(&self) -> &[Arc<dyn Stage>] {
        &self.stages
    }

    pub fn source(&self) -> &SourcePattern {
        &self.source
    }

    /// Destination directory relative to the project root.
    pub fn dest(&self) -> &Path {
        &self.dest
    }

    /// `dest` as a root-relative, slash-separated prefix. `None` when the
    /// destination is the project root itself.
    pub fn dest_prefix(&self) -> Option<String> {
        let parts: Vec<String> = self
            .dest
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        (!parts.is_empty()).then(|| parts.join("/"))
    }

    /// The last extension declared by any stage.
    pub fn output_extension(&self) -> Option<&str> {
        self.stages.iter().rev().find_map(|s| s.output_extension())
    }

    /// Where the output for `source_file` (below `root`) is written:
    /// `root/dest/<path below the glob base>`, extension applied.
    pub fn output_path(&self, root: &Path, source_file: &Path) -> PathBuf {
        let base = root.join(self.source.base());
        let rel = match source_file.strip_prefix(&base) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => source_file
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| source_file.to_path_buf()),
        };

        let mut out = root.join(&self.dest).join(rel);
        if let Some(ext) = self.output_extension() {
            out.set_extension(ext);
        }
        out
    }
}
