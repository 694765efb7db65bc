// src/stage/compact.rs

use std::path::Path;

use crate::pipeline::Diagnostic;
use crate::stage::{Stage, StageFuture, StageOutput};
use crate::types::DiagnosticKind;

/// Minifier for C-style syntaxes (CSS, SCSS, JS).
///
/// Removes `/* ... */` comments outside of string literals, trims every line
/// and drops blank lines. Line breaks between code lines are kept so that
/// statement boundaries survive. Text inside string and template literals
/// is copied untouched, including any line breaks it spans. `//` comments
/// are kept as written, and quotes inside them do not open a string.
#[derive(Debug, Clone)]
pub struct CompactStage {
    name: String,
}

impl CompactStage {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Stage for CompactStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply<'a>(&'a self, content: Vec<u8>, path: &'a Path) -> StageFuture<'a> {
        Box::pin(async move {
            let text = String::from_utf8(content).map_err(|e| {
                Diagnostic::new(
                    DiagnosticKind::CompileError,
                    &self.name,
                    path,
                    format!("source is not valid UTF-8: {e}"),
                )
            })?;

            let compacted = compact(&text).map_err(|line| {
                Diagnostic::new(
                    DiagnosticKind::CompileError,
                    &self.name,
                    path,
                    "unterminated block comment",
                )
                .with_line(line)
            })?;

            Ok(StageOutput::new(compacted))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Code,
    Quoted(char),
    LineComment,
}

/// Strip block comments and compact lines in one pass. A "line" here ends
/// only at a break outside any literal, so trimming never reaches into a
/// string. On an unterminated comment returns the line it started on.
fn compact(text: &str) -> Result<String, usize> {
    let mut out = String::with_capacity(text.len());
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    let mut mode = Mode::Code;
    let mut line = 1;

    while let Some(c) = chars.next() {
        if c == '\n' {
            line += 1;
        }

        match mode {
            Mode::Quoted(q) => {
                current.push(c);
                if c == '\\' {
                    if let Some(escaped) = chars.next() {
                        if escaped == '\n' {
                            line += 1;
                        }
                        current.push(escaped);
                    }
                } else if c == q {
                    mode = Mode::Code;
                } else if c == '\n' && q != '`' {
                    // Only template literals span lines; a bare break
                    // closes any other quote.
                    current.pop();
                    finish_line(&mut out, &mut current);
                    mode = Mode::Code;
                }
            }
            Mode::LineComment => {
                if c == '\n' {
                    finish_line(&mut out, &mut current);
                    mode = Mode::Code;
                } else {
                    current.push(c);
                }
            }
            Mode::Code => match c {
                '"' | '\'' | '`' => {
                    mode = Mode::Quoted(c);
                    current.push(c);
                }
                '/' if chars.peek() == Some(&'/') => {
                    chars.next();
                    mode = Mode::LineComment;
                    current.push_str("//");
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    let start = line;
                    let mut prev = '\0';
                    let mut closed = false;
                    for n in chars.by_ref() {
                        if n == '\n' {
                            line += 1;
                            // Code on either side of the comment stays on separate lines.
                            finish_line(&mut out, &mut current);
                        }
                        if prev == '*' && n == '/' {
                            closed = true;
                            break;
                        }
                        prev = n;
                    }
                    if !closed {
                        return Err(start);
                    }
                }
                '\n' => finish_line(&mut out, &mut current),
                _ => current.push(c),
            },
        }
    }

    finish_line(&mut out, &mut current);

    Ok(out)
}

fn finish_line(out: &mut String, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        out.push_str(trimmed);
        out.push('\n');
    }
    current.clear();
}
