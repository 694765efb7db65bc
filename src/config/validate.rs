// src/config/validate.rs

use std::collections::HashSet;

use regex::Regex;

use crate::config::model::{ConfigFile, RawConfigFile, StageConfig, TaskConfig};
use crate::errors::{Result, StagewatchError};
use crate::watch::patterns::SourcePattern;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::StagewatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.task))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_global_config(cfg)?;
    validate_task_names(cfg)?;
    for task in cfg.task.iter() {
        validate_task(task)?;
    }
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(StagewatchError::ConfigError(
            "config must contain at least one [[task]] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.debounce_ms == 0 {
        return Err(StagewatchError::ConfigError(
            "[config].debounce_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_task_names(cfg: &RawConfigFile) -> Result<()> {
    let mut seen = HashSet::new();
    for task in cfg.task.iter() {
        if task.name.trim().is_empty() {
            return Err(StagewatchError::ConfigError(
                "every [[task]] needs a non-empty `name`".to_string(),
            ));
        }
        if !seen.insert(task.name.as_str()) {
            return Err(StagewatchError::ConfigError(format!(
                "task '{}' is declared more than once",
                task.name
            )));
        }
    }
    Ok(())
}

fn validate_task(task: &TaskConfig) -> Result<()> {
    let invalid = |reason: String| StagewatchError::InvalidTask {
        name: task.name.clone(),
        reason,
    };

    if task.src.trim().is_empty() {
        return Err(invalid("`src` must not be empty".to_string()));
    }
    if is_absolute(&task.src) {
        return Err(invalid(format!(
            "`src` must be relative to the project root (got {:?})",
            task.src
        )));
    }
    if task.dest.trim().is_empty() {
        return Err(invalid("`dest` must not be empty".to_string()));
    }
    if task.stages.is_empty() {
        return Err(invalid("at least one [[task.stage]] is required".to_string()));
    }

    SourcePattern::parse(&task.src).map_err(|e| invalid(format!("{e:#}")))?;

    for stage in task.stages.iter() {
        validate_stage(stage).map_err(|reason| {
            invalid(format!("stage '{}': {reason}", stage.display_name()))
        })?;
    }

    Ok(())
}

fn is_absolute(pattern: &str) -> bool {
    let pattern = pattern.trim();
    pattern.starts_with('/')
        || pattern.starts_with('\\')
        || std::path::Path::new(pattern).is_absolute()
}

fn validate_stage(stage: &StageConfig) -> std::result::Result<(), String> {
    match stage {
        StageConfig::Command { cmd, .. } if cmd.trim().is_empty() => {
            Err("`cmd` must not be empty".to_string())
        }
        StageConfig::Lint { rules, .. } => {
            for rule in rules {
                Regex::new(&rule.pattern)
                    .map_err(|e| format!("invalid lint pattern {:?}: {e}", rule.pattern))?;
            }
            Ok(())
        }
        StageConfig::Rename { extension, .. } if extension.trim().is_empty() => {
            Err("`extension` must not be empty".to_string())
        }
        _ => Ok(()),
    }
}
