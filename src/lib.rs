// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod pipeline;
pub mod reload;
pub mod stage;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::cli::{CliArgs, Command};
use crate::config::{ConfigFile, load_and_validate};
use crate::engine::{RuntimeEvent, RuntimeOptions, WatchCore, WatchRuntime};
use crate::errors::Result;
use crate::fs::{FileSystem, RealFileSystem};
use crate::pipeline::{PipelineRegistry, RunResult};
use crate::reload::{ReloadBroadcaster, spawn_log_observer};
use crate::watch::{ContentFilter, spawn_watcher};

/// Overall outcome of a command, mapped to the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    /// `run` finished but produced diagnostics.
    Diagnostics,
}

impl RunStatus {
    pub fn exit_code(self) -> i32 {
        match self {
            RunStatus::Success => 0,
            RunStatus::Diagnostics => 1,
        }
    }
}

/// High-level entry point used by `main.rs`.
///
/// Loads and validates the config, then dispatches the subcommand. Globs and
/// destinations are resolved against the config file's directory.
pub async fn run(args: CliArgs) -> Result<RunStatus> {
    let cfg = load_and_validate(&args.config)?;

    match args.command {
        Command::ListTasks => {
            for name in cfg.task_names() {
                println!("{name}");
            }
            Ok(RunStatus::Success)
        }
        Command::Run { task } => {
            let root = config_root_dir(&args.config)?;
            let result = run_once(&cfg, &root, &task).await?;
            print_run_result(&result);
            Ok(if result.is_success() {
                RunStatus::Success
            } else {
                RunStatus::Diagnostics
            })
        }
        Command::Watch => {
            let root = config_root_dir(&args.config)?;
            watch(&cfg, &root).await?;
            Ok(RunStatus::Success)
        }
    }
}

/// Build a single task once against the real filesystem.
pub async fn run_once(cfg: &ConfigFile, root: &Path, task: &str) -> Result<RunResult> {
    let registry = PipelineRegistry::from_config(cfg, Arc::new(RealFileSystem), root)?;
    registry.run_task(task).await
}

/// Initial build (if enabled), then rebuild on change until Ctrl-C or a
/// watcher failure.
pub async fn watch(cfg: &ConfigFile, root: &Path) -> Result<()> {
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let registry = Arc::new(PipelineRegistry::from_config(cfg, Arc::clone(&fs), root)?);

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let filter = if cfg.config.use_hash {
        let mut filter = ContentFilter::new(Arc::clone(&fs));
        for task in registry.tasks() {
            match registry.pipeline().source_files(task) {
                Ok(files) => filter.seed(files),
                Err(err) => debug!(task = %task.name(), error = %err, "no sources to seed"),
            }
        }
        Some(filter)
    } else {
        None
    };

    let _watcher = spawn_watcher(root, registry.watch_dirs(), rt_tx.clone(), filter)?;

    let broadcaster = Arc::new(ReloadBroadcaster::default());
    let _observer = spawn_log_observer(broadcaster.subscribe());

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    let mut core = WatchCore::new(
        registry.watch_profiles(),
        RuntimeOptions::from_millis(cfg.config.debounce_ms),
    );

    if cfg.config.initial_build {
        info!(tasks = ?registry.names(), "initial build");
        let now = Instant::now();
        for name in registry.names() {
            core.step(RuntimeEvent::TaskTriggered { task: name.clone() }, now);
        }
    }

    let runtime = WatchRuntime::new(core, rt_rx, rt_tx, registry, broadcaster);
    runtime.run().await
}

/// Directory the config lives in, canonicalized.
///
/// A bare filename like "Stagewatch.toml" (parent = "") resolves to the
/// current working directory.
pub fn config_root_dir(config_path: &Path) -> Result<PathBuf> {
    let dir = match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok(dir.canonicalize()?)
}

fn print_run_result(result: &RunResult) {
    for diagnostic in &result.diagnostics {
        eprintln!("{diagnostic}");
    }
    println!("{}", result.summary());
}
