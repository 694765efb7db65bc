// src/stage/command.rs

//! External-program stage.

use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::pipeline::Diagnostic;
use crate::stage::{Stage, StageFuture, StageOutput, StageResult};
use crate::types::DiagnosticKind;

/// Environment variable carrying the source path into the command.
pub const SOURCE_ENV_VAR: &str = "STAGEWATCH_SOURCE";

/// Lines of stderr kept in a diagnostic message.
const MAX_STDERR_LINES: usize = 20;

/// Pipes file content through a shell command.
///
/// The content is written to the command's stdin and its stdout becomes the
/// new content. A non-zero exit status turns into a diagnostic of the
/// configured `kind` carrying the command's stderr.
#[derive(Debug, Clone)]
pub struct CommandStage {
    name: String,
    cmd: String,
    kind: DiagnosticKind,
    extension: Option<String>,
}

impl CommandStage {
    pub fn new(
        name: impl Into<String>,
        cmd: impl Into<String>,
        kind: DiagnosticKind,
        extension: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            cmd: cmd.into(),
            kind,
            extension,
        }
    }

    async fn run(&self, content: Vec<u8>, path: &Path) -> StageResult {
        let mut cmd = shell_command(&self.cmd);
        cmd.env(SOURCE_ENV_VAR, path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            Diagnostic::new(
                self.kind,
                &self.name,
                path,
                format!("failed to spawn `{}`: {e}", self.cmd),
            )
        })?;

        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(&content).await?;
                stdin.shutdown().await?;
            }
            Ok::<(), std::io::Error>(())
        };

        let (fed, output) = tokio::join!(feed, child.wait_with_output());

        if let Err(err) = fed {
            // Commands that don't read stdin close the pipe early.
            if err.kind() != ErrorKind::BrokenPipe {
                debug!(stage = %self.name, error = %err, "writing stage stdin failed");
            }
        }

        let output = output.map_err(|e| {
            Diagnostic::new(
                self.kind,
                &self.name,
                path,
                format!("waiting for `{}` failed: {e}", self.cmd),
            )
        })?;

        if !output.status.success() {
            let code = output
                .status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            let stderr = tail_lines(&output.stderr);
            let message = if stderr.is_empty() {
                format!("`{}` exited with status {code}", self.cmd)
            } else {
                format!("`{}` exited with status {code}: {stderr}", self.cmd)
            };
            return Err(Diagnostic::new(self.kind, &self.name, path, message));
        }

        Ok(StageOutput::new(output.stdout))
    }
}

impl Stage for CommandStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn output_extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }

    fn apply<'a>(&'a self, content: Vec<u8>, path: &'a Path) -> StageFuture<'a> {
        Box::pin(self.run(content, path))
    }
}

fn shell_command(line: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(line);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(line);
        c
    }
}

fn tail_lines(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(MAX_STDERR_LINES);
    lines[start..].join("\n")
}
