// src/logging.rs

//! Logging setup on `tracing-subscriber`.
//!
//! `--log-level` wins and applies to stagewatch's own events. Otherwise
//! `STAGEWATCH_LOG` is read as an `EnvFilter` directive list, so both
//! `debug` and `stagewatch::engine=trace,info` work. With neither set,
//! stagewatch logs at `info` and its dependencies (notify, tokio) at `warn`.
//!
//! Everything goes to stderr; stdout carries only `list-tasks` output and
//! run summaries.

use std::io::IsTerminal;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::cli::LogLevel;

pub const LOG_ENV_VAR: &str = "STAGEWATCH_LOG";

const DEFAULT_DIRECTIVES: &str = "warn,stagewatch=info";

/// Install the global subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV_VAR).ok();
    let filter = build_filter(cli_level, env.as_deref());
    let ansi = std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(ansi)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing log subscriber: {e}"))
}

/// Resolve the filter from the CLI flag and the raw `STAGEWATCH_LOG` value.
///
/// A value that does not parse falls back to the default; the subscriber is
/// not installed yet, so the complaint goes straight to stderr.
pub fn build_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> EnvFilter {
    if let Some(level) = cli_level {
        let deps = match level {
            LogLevel::Error => "error",
            _ => "warn",
        };
        return EnvFilter::new(format!("{deps},stagewatch={}", level_name(level)));
    }

    match env.map(str::trim).filter(|s| !s.is_empty()) {
        Some(directives) => EnvFilter::try_new(directives).unwrap_or_else(|err| {
            eprintln!("stagewatch: ignoring {LOG_ENV_VAR}={directives:?}: {err}");
            EnvFilter::new(DEFAULT_DIRECTIVES)
        }),
        None => EnvFilter::new(DEFAULT_DIRECTIVES),
    }
}

fn level_name(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}
