// src/config/model.rs

use serde::Deserialize;

use crate::types::DiagnosticKind;

/// Top-level configuration exactly as read from a TOML file.
///
/// ```toml
/// [config]
/// debounce_ms = 100
///
/// [[task]]
/// name = "sass"
/// src = "css/src/**/*.scss"
/// dest = "css/dist"
///
///   [[task.stage]]
///   type = "command"
///   cmd = "sass --stdin --style=compressed"
///   kind = "compile-error"
///   extension = "css"
/// ```
///
/// Tasks are an array of tables so that the file order is the registry order.
/// Not validated; convert into [`ConfigFile`] with `TryFrom`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub task: Vec<TaskConfig>,
}

/// Validated configuration. Only constructible through
/// `ConfigFile::try_from(RawConfigFile)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub task: Vec<TaskConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(config: ConfigSection, task: Vec<TaskConfig>) -> Self {
        Self { config, task }
    }

    pub fn tasks(&self) -> &[TaskConfig] {
        &self.task
    }

    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.task.iter().map(|t| t.name.as_str())
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Quiet period after the last change to a task's sources before the
    /// task is rebuilt.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Maximum number of files processed concurrently within one run.
    /// `0` means the available CPU parallelism.
    #[serde(default)]
    pub workers: usize,

    /// Ignore watch events whose file content hash did not change.
    #[serde(default)]
    pub use_hash: bool,

    /// Build every task once when `watch` starts.
    #[serde(default = "default_initial_build")]
    pub initial_build: bool,
}

fn default_debounce_ms() -> u64 {
    100
}

fn default_initial_build() -> bool {
    true
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            workers: 0,
            use_hash: false,
            initial_build: default_initial_build(),
        }
    }
}

impl ConfigSection {
    /// Worker count with `0` resolved to the machine's parallelism.
    pub fn effective_workers(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}

/// One `[[task]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    pub name: String,

    /// Source glob, relative to the project root (e.g. `"js/src/**/*.js"`).
    pub src: String,

    /// Destination directory, relative to the project root.
    pub dest: String,

    /// Stages in application order (`[[task.stage]]`).
    #[serde(default, rename = "stage")]
    pub stages: Vec<StageConfig>,
}

/// A single `[[task.stage]]` entry, tagged by `type`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StageConfig {
    Command {
        #[serde(default)]
        name: Option<String>,
        cmd: String,
        /// Diagnostic kind used when the command exits non-zero.
        #[serde(default)]
        kind: DiagnosticKind,
        #[serde(default)]
        extension: Option<String>,
    },
    Lint {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        rules: Vec<LintRuleConfig>,
    },
    Compact {
        #[serde(default)]
        name: Option<String>,
    },
    Sourcemap {
        #[serde(default)]
        name: Option<String>,
    },
    Rename {
        #[serde(default)]
        name: Option<String>,
        extension: String,
    },
}

impl StageConfig {
    /// Stage type as written in the config.
    pub fn type_name(&self) -> &'static str {
        match self {
            StageConfig::Command { .. } => "command",
            StageConfig::Lint { .. } => "lint",
            StageConfig::Compact { .. } => "compact",
            StageConfig::Sourcemap { .. } => "sourcemap",
            StageConfig::Rename { .. } => "rename",
        }
    }

    /// Configured name, falling back to the stage type.
    pub fn display_name(&self) -> String {
        let name = match self {
            StageConfig::Command { name, .. }
            | StageConfig::Lint { name, .. }
            | StageConfig::Compact { name }
            | StageConfig::Sourcemap { name }
            | StageConfig::Rename { name, .. } => name,
        };
        name.clone().unwrap_or_else(|| self.type_name().to_string())
    }
}

/// `{ pattern = "...", message = "..." }` inside a lint stage.
#[derive(Debug, Clone, Deserialize)]
pub struct LintRuleConfig {
    pub pattern: String,
    pub message: String,
}
