#![allow(dead_code)]

use stagewatch::config::{
    ConfigFile, ConfigSection, LintRuleConfig, RawConfigFile, StageConfig, TaskConfig,
};
use stagewatch::types::DiagnosticKind;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                task: Vec::new(),
            },
        }
    }

    pub fn with_task(mut self, task: TaskConfig) -> Self {
        self.config.task.push(task);
        self
    }

    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.config.config.debounce_ms = ms;
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.config.config.workers = workers;
        self
    }

    pub fn use_hash(mut self, val: bool) -> Self {
        self.config.config.use_hash = val;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(name: &str, src: &str, dest: &str) -> Self {
        Self {
            task: TaskConfig {
                name: name.to_string(),
                src: src.to_string(),
                dest: dest.to_string(),
                stages: Vec::new(),
            },
        }
    }

    pub fn stage(mut self, stage: StageConfig) -> Self {
        self.task.stages.push(stage);
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}

pub fn command_stage(cmd: &str, kind: DiagnosticKind, extension: Option<&str>) -> StageConfig {
    StageConfig::Command {
        name: None,
        cmd: cmd.to_string(),
        kind,
        extension: extension.map(str::to_string),
    }
}

pub fn lint_stage(rules: &[(&str, &str)]) -> StageConfig {
    StageConfig::Lint {
        name: None,
        rules: rules
            .iter()
            .map(|(pattern, message)| LintRuleConfig {
                pattern: pattern.to_string(),
                message: message.to_string(),
            })
            .collect(),
    }
}

pub fn compact_stage() -> StageConfig {
    StageConfig::Compact { name: None }
}

pub fn sourcemap_stage() -> StageConfig {
    StageConfig::Sourcemap { name: None }
}

pub fn rename_stage(extension: &str) -> StageConfig {
    StageConfig::Rename {
        name: None,
        extension: extension.to_string(),
    }
}
