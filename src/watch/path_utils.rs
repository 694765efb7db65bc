// src/watch/path_utils.rs

//! Path helpers shared by the watcher and the pipeline.

use std::path::{Component, Path, PathBuf};

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// - First a lexical `strip_prefix(root)`, ignoring `.` components so that
///   `./src/a.js` relativizes against `.`.
/// - If that fails (symlinks, `/private/var` vs `/var` on macOS), both paths
///   are canonicalized and compared again.
///
/// Returns `None` if the path cannot be related to `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = strip_cur_dir(path).strip_prefix(strip_cur_dir(root)) {
        return Some(to_slash(rel));
    }

    if let (Ok(root_canon), Ok(path_canon)) = (root.canonicalize(), path.canonicalize()) {
        if let Ok(rel) = path_canon.strip_prefix(&root_canon) {
            return Some(to_slash(rel));
        }
    }

    None
}

fn strip_cur_dir(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

fn to_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
