// src/watch/patterns.rs

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobMatcher};

use crate::fs::FileSystem;
use crate::pipeline::TaskName;
use crate::watch::path_utils::relative_str;

const GLOB_META: &[char] = &['*', '?', '[', '{'];

/// A compiled source glob such as `css/src/**/*.scss`.
///
/// Patterns are relative to the project root. The *base* is the leading run
/// of literal path components (`css/src`); output paths preserve the part of
/// a source path below the base. A fully literal pattern uses its parent
/// directory as the base.
#[derive(Clone)]
pub struct SourcePattern {
    raw: String,
    base: PathBuf,
    matcher: GlobMatcher,
}

impl fmt::Debug for SourcePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourcePattern")
            .field("raw", &self.raw)
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

impl SourcePattern {
    pub fn parse(pattern: &str) -> Result<Self> {
        let normalized = pattern.trim().trim_start_matches("./").to_string();

        // `*` must not cross directories; `**` still does.
        let matcher = GlobBuilder::new(&normalized)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob pattern: {pattern}"))?
            .compile_matcher();

        Ok(Self {
            raw: normalized.clone(),
            base: glob_base(&normalized),
            matcher,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Literal directory prefix, relative to the project root.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// `rel_path` is relative to the project root with forward slashes.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.matcher.is_match(rel_path)
    }
}

fn glob_base(pattern: &str) -> PathBuf {
    let parts: Vec<&str> = pattern.split('/').filter(|p| !p.is_empty()).collect();
    let literal = parts
        .iter()
        .take_while(|p| !p.contains(GLOB_META))
        .count();

    let take = if literal == parts.len() {
        literal.saturating_sub(1)
    } else {
        literal
    };

    parts[..take].iter().collect()
}

/// Watch interest of one task: its name, compiled source pattern and the
/// directory its outputs land in.
///
/// The watcher core passes root-relative paths (e.g. `"js/src/main.js"`)
/// into [`TaskWatchProfile::matches`]. Paths below the excluded directory
/// never match, so a task does not retrigger on its own writes.
#[derive(Debug, Clone)]
pub struct TaskWatchProfile {
    name: TaskName,
    pattern: SourcePattern,
    excluded: Option<String>,
}

impl TaskWatchProfile {
    pub fn new(name: impl Into<TaskName>, pattern: SourcePattern) -> Self {
        Self {
            name: name.into(),
            pattern,
            excluded: None,
        }
    }

    /// Ignore everything below the root-relative directory `dir`.
    pub fn excluding(mut self, dir: Option<String>) -> Self {
        self.excluded = dir;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &SourcePattern {
        &self.pattern
    }

    pub fn matches(&self, rel_path: &str) -> bool {
        if let Some(dir) = &self.excluded {
            if is_below(rel_path, dir) {
                return false;
            }
        }
        self.pattern.matches(rel_path)
    }
}

/// `rel_path` equals `dir` or lies inside it. Both are root-relative with
/// forward slashes.
pub fn is_below(rel_path: &str, dir: &str) -> bool {
    rel_path
        .strip_prefix(dir)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Collect all files below `root/<pattern base>` matching `pattern`,
/// sorted lexicographically.
///
/// Fails when the base directory does not exist. A literal pattern naming a
/// single existing file yields just that file.
pub fn collect_matching_files(
    fs: &dyn FileSystem,
    root: &Path,
    pattern: &SourcePattern,
) -> Result<Vec<PathBuf>> {
    let base = root.join(pattern.base());
    if !fs.is_dir(&base) {
        anyhow::bail!(
            "source directory {:?} for pattern '{}' does not exist",
            base,
            pattern.as_str()
        );
    }

    let mut files = Vec::new();
    let mut stack = vec![base];

    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            if fs.is_dir(&path) {
                stack.push(path);
            } else if fs.is_file(&path) {
                if let Some(rel_str) = relative_str(root, &path) {
                    if pattern.matches(&rel_str) {
                        files.push(path);
                    }
                }
            }
        }
    }

    files.sort();
    Ok(files)
}
