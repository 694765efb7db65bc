// src/stage/lint.rs

use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;

use crate::pipeline::Diagnostic;
use crate::stage::{Stage, StageFuture, StageOutput};
use crate::types::DiagnosticKind;

/// A single forbidden pattern, checked line by line.
#[derive(Debug, Clone)]
pub struct LintRule {
    regex: Regex,
    message: String,
}

impl LintRule {
    pub fn new(pattern: &str, message: &str) -> Result<Self> {
        let regex =
            Regex::new(pattern).with_context(|| format!("invalid lint pattern: {pattern}"))?;
        Ok(Self {
            regex,
            message: message.to_string(),
        })
    }
}

/// Rejects a file when any rule matches any of its lines.
///
/// Passing files go through unchanged. A failing file yields one
/// `lint-error` diagnostic listing every violation as `line N: message`.
#[derive(Debug, Clone)]
pub struct LintStage {
    name: String,
    rules: Vec<LintRule>,
}

impl LintStage {
    pub fn new(name: impl Into<String>, rules: Vec<LintRule>) -> Self {
        Self {
            name: name.into(),
            rules,
        }
    }

    fn violations(&self, content: &[u8]) -> Vec<(usize, &str)> {
        let text = String::from_utf8_lossy(content);
        let mut found = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            for rule in self.rules.iter() {
                if rule.regex.is_match(line) {
                    found.push((idx + 1, rule.message.as_str()));
                }
            }
        }
        found
    }
}

impl Stage for LintStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply<'a>(&'a self, content: Vec<u8>, path: &'a Path) -> StageFuture<'a> {
        Box::pin(async move {
            let violations = self.violations(&content);
            let Some(&(first_line, _)) = violations.first() else {
                return Ok(StageOutput::new(content));
            };

            let message = violations
                .iter()
                .map(|(line, msg)| format!("line {line}: {msg}"))
                .collect::<Vec<_>>()
                .join("; ");

            Err(
                Diagnostic::new(DiagnosticKind::LintError, &self.name, path, message)
                    .with_line(first_line),
            )
        })
    }
}
