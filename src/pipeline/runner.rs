// src/pipeline/runner.rs

//! Running one task over all of its source files.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::fs::FileSystem;
use crate::pipeline::{Diagnostic, ErrorSink, RunResult, Task};
use crate::types::DiagnosticKind;
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::{collect_matching_files, is_below};

/// Executes tasks against a project root.
///
/// Files of one run are processed concurrently, at most `workers` at a
/// time. Each file goes through the stages on its own; a failing file
/// reports to the run's [`ErrorSink`] and never affects its siblings.
#[derive(Debug, Clone)]
pub struct Pipeline {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
    workers: usize,
}

impl Pipeline {
    pub fn new(fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>, workers: usize) -> Self {
        Self {
            fs,
            root: root.into(),
            workers: workers.max(1),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All files matching the task's glob, sorted. Anything below the
    /// task's own `dest` is left out so outputs never come back as sources.
    pub fn source_files(&self, task: &Task) -> anyhow::Result<Vec<PathBuf>> {
        let mut files = collect_matching_files(self.fs.as_ref(), &self.root, task.source())?;
        if let Some(dest) = task.dest_prefix() {
            files.retain(|file| {
                relative_str(&self.root, file).is_none_or(|rel| !is_below(&rel, &dest))
            });
        }
        Ok(files)
    }

    /// Keep the first source (in sorted order) for every output path and
    /// report the later ones, so two sources never race for one output.
    fn claim_outputs(&self, task: &Task, files: Vec<PathBuf>, sink: &ErrorSink) -> Vec<PathBuf> {
        let mut claimed: BTreeMap<PathBuf, PathBuf> = BTreeMap::new();
        files
            .into_iter()
            .filter(|file| match claimed.entry(task.output_path(&self.root, file)) {
                Entry::Vacant(slot) => {
                    slot.insert(file.clone());
                    true
                }
                Entry::Occupied(slot) => {
                    sink.report(Diagnostic::new(
                        DiagnosticKind::IoError,
                        "write",
                        file,
                        format!(
                            "output {} is already produced by {}",
                            slot.key().display(),
                            slot.get().display()
                        ),
                    ));
                    false
                }
            })
            .collect()
    }

    pub async fn run(&self, task: Arc<Task>) -> RunResult {
        let sink = Arc::new(ErrorSink::new(task.name()));

        let files = match self.source_files(&task) {
            Ok(files) => files,
            Err(err) => {
                sink.report(Diagnostic::new(
                    DiagnosticKind::IoError,
                    "glob",
                    self.root.join(task.source().base()),
                    format!("{err:#}"),
                ));
                return RunResult {
                    task: task.name().to_string(),
                    written: Vec::new(),
                    diagnostics: sink.take(),
                };
            }
        };

        let files = self.claim_outputs(&task, files, &sink);
        info!(task = %task.name(), files = files.len(), "running task");

        let permits = Arc::new(Semaphore::new(self.workers));
        let mut workers = JoinSet::new();

        for file in files {
            let job = FileJob {
                fs: Arc::clone(&self.fs),
                root: self.root.clone(),
                task: Arc::clone(&task),
                sink: Arc::clone(&sink),
                file,
            };
            let permits = Arc::clone(&permits);

            workers.spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return Vec::new();
                };

                // The inner spawn turns a panicking stage into a diagnostic
                // for the file that caused it.
                let sink = Arc::clone(&job.sink);
                let file = job.file.clone();
                match tokio::spawn(process_file(job)).await {
                    Ok(written) => written,
                    Err(err) => {
                        sink.report(Diagnostic::new(
                            DiagnosticKind::TransformError,
                            "worker",
                            file,
                            format!("worker failed: {err}"),
                        ));
                        Vec::new()
                    }
                }
            });
        }

        let mut written = Vec::new();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(paths) => written.extend(paths),
                Err(err) => sink.report(Diagnostic::new(
                    DiagnosticKind::TransformError,
                    "worker",
                    self.root.join(task.dest()),
                    format!("worker failed: {err}"),
                )),
            }
        }
        written.sort();

        let result = RunResult {
            task: task.name().to_string(),
            written,
            diagnostics: sink.take(),
        };
        info!(
            task = %result.task,
            written = result.written.len(),
            diagnostics = result.diagnostics.len(),
            "task finished"
        );
        result
    }
}

struct FileJob {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
    task: Arc<Task>,
    sink: Arc<ErrorSink>,
    file: PathBuf,
}

/// Run every stage over one file and write the outputs. Returns the paths
/// written; on failure reports to the sink and returns nothing.
async fn process_file(job: FileJob) -> Vec<PathBuf> {
    let FileJob {
        fs,
        root,
        task,
        sink,
        file,
    } = job;

    let mut content = match fs.read(&file) {
        Ok(bytes) => bytes,
        Err(err) => {
            sink.report(Diagnostic::new(
                DiagnosticKind::IoError,
                "read",
                &file,
                format!("{err:#}"),
            ));
            return Vec::new();
        }
    };

    let mut sourcemap = None;
    for stage in task.stages() {
        match stage.apply(content, &file).await {
            Ok(out) => {
                content = out.content;
                if out.sourcemap.is_some() {
                    sourcemap = out.sourcemap;
                }
            }
            Err(diagnostic) => {
                debug!(task = %task.name(), stage = %stage.name(), path = ?file, "stage failed; skipping file");
                sink.report(diagnostic);
                return Vec::new();
            }
        }
    }

    let output = task.output_path(&root, &file);

    // The output goes out before its map; a file counts as written only
    // once both are on disk.
    let map = match sourcemap {
        Some(mut map) => {
            let output_name = output
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            map.file = Some(output_name.clone());

            let json = match map.to_json() {
                Ok(json) => json,
                Err(err) => {
                    sink.report(Diagnostic::new(
                        DiagnosticKind::TransformError,
                        "sourcemap",
                        &file,
                        format!("serializing source map failed: {err}"),
                    ));
                    return Vec::new();
                }
            };

            if !content.is_empty() && !content.ends_with(b"\n") {
                content.push(b'\n');
            }
            content.extend_from_slice(format!("/*# sourceMappingURL={output_name}.map */\n").as_bytes());
            Some((map_path_for(&output), json))
        }
        None => None,
    };

    if let Err(err) = fs.write(&output, &content) {
        sink.report(Diagnostic::new(
            DiagnosticKind::IoError,
            "write",
            &output,
            format!("{err:#}"),
        ));
        return Vec::new();
    }

    let mut written = vec![output];
    if let Some((map_path, json)) = map {
        if let Err(err) = fs.write(&map_path, json.as_bytes()) {
            sink.report(Diagnostic::new(
                DiagnosticKind::IoError,
                "write",
                &map_path,
                format!("{err:#}"),
            ));
            return Vec::new();
        }
        written.push(map_path);
    }
    debug!(task = %task.name(), source = ?file, written = ?written, "wrote output");

    written
}

fn map_path_for(output: &Path) -> PathBuf {
    let mut name = OsString::from(output.as_os_str());
    name.push(".map");
    PathBuf::from(name)
}
