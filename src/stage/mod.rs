// src/stage/mod.rs

//! Pipeline stages.
//!
//! A stage is one transformation step applied to the content of a single
//! file. Stages capture their configuration at construction and hold no
//! mutable state, so one instance is shared by every file of every run.
//!
//! - [`command`] pipes content through an external program (compilers,
//!   transpilers, formatters).
//! - [`lint`] rejects content matching configured patterns.
//! - [`compact`] strips block comments and blank lines.
//! - [`sourcemap`] attaches an identity source map.
//! - [`rename`] only changes the output extension.

use std::fmt;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::StageConfig;
use crate::pipeline::Diagnostic;

pub mod command;
pub mod compact;
pub mod lint;
pub mod rename;
pub mod sourcemap;

pub use command::CommandStage;
pub use compact::CompactStage;
pub use lint::{LintRule, LintStage};
pub use rename::RenameStage;
pub use sourcemap::{SourceMap, SourcemapStage};

/// Content produced by a successful stage.
#[derive(Debug, Clone, PartialEq)]
pub struct StageOutput {
    pub content: Vec<u8>,
    pub sourcemap: Option<SourceMap>,
}

impl StageOutput {
    pub fn new(content: impl Into<Vec<u8>>) -> Self {
        Self {
            content: content.into(),
            sourcemap: None,
        }
    }

    pub fn with_sourcemap(mut self, map: SourceMap) -> Self {
        self.sourcemap = Some(map);
        self
    }
}

pub type StageResult = std::result::Result<StageOutput, Diagnostic>;
pub type StageFuture<'a> = Pin<Box<dyn Future<Output = StageResult> + Send + 'a>>;

/// One transformation step.
///
/// Expected failures (syntax errors, lint violations, a compiler exiting
/// non-zero) are returned as a [`Diagnostic`]; implementations must not
/// panic for them.
pub trait Stage: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Extension (without the dot) that outputs should carry after this
    /// stage, if it changes it.
    fn output_extension(&self) -> Option<&str> {
        None
    }

    /// Transform `content` of the source file at `path`.
    fn apply<'a>(&'a self, content: Vec<u8>, path: &'a Path) -> StageFuture<'a>;
}

/// Build a stage from its `[[task.stage]]` config entry.
pub fn build_stage(cfg: &StageConfig) -> Result<Arc<dyn Stage>> {
    let name = cfg.display_name();
    let stage: Arc<dyn Stage> = match cfg {
        StageConfig::Command {
            cmd,
            kind,
            extension,
            ..
        } => Arc::new(CommandStage::new(name, cmd.clone(), *kind, extension.clone())),
        StageConfig::Lint { rules, .. } => {
            let rules = rules
                .iter()
                .map(|r| LintRule::new(&r.pattern, &r.message))
                .collect::<Result<Vec<_>>>()
                .with_context(|| format!("building lint stage '{name}'"))?;
            Arc::new(LintStage::new(name, rules))
        }
        StageConfig::Compact { .. } => Arc::new(CompactStage::new(name)),
        StageConfig::Sourcemap { .. } => Arc::new(SourcemapStage::new(name)),
        StageConfig::Rename { extension, .. } => {
            Arc::new(RenameStage::new(name, extension.clone()))
        }
    };
    Ok(stage)
}
