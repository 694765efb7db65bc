// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file and return the raw, unvalidated `RawConfigFile`.
///
/// Use [`load_and_validate`] for anything that will be executed.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;
    debug!(path = ?path, tasks = config.task.len(), "parsed config file");

    Ok(config)
}

/// Load a configuration file from path and validate it.
///
/// Checks:
/// - at least one task, unique non-empty names,
/// - non-empty `src` / `dest` and stage lists,
/// - compilable source globs and lint patterns,
/// - `[config]` sanity (`debounce_ms >= 1`).
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Parse and validate config text that is already in memory.
pub fn parse_and_validate(contents: &str) -> Result<ConfigFile> {
    let raw: RawConfigFile = toml::from_str(contents)?;
    ConfigFile::try_from(raw)
}

/// Default config path: `Stagewatch.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Stagewatch.toml")
}
