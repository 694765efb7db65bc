// src/fs/mock.rs

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{anyhow, Result};

use super::FileSystem;

#[derive(Debug, Default)]
struct MockState {
    files: BTreeMap<PathBuf, Vec<u8>>,
    /// Writes to any path below one of these prefixes fail.
    failing_writes: BTreeSet<PathBuf>,
    write_count: usize,
}

/// In-memory filesystem for tests.
///
/// Directories are implicit: a directory exists when some file lives below
/// it. Paths are normalized lexically (`./a/../b` == `b`) so tests can mix
/// `"."`-rooted and bare relative paths.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    state: Arc<Mutex<MockState>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = normalize(path.as_ref());
        self.lock().files.insert(path, content.into());
    }

    pub fn remove_file(&self, path: impl AsRef<Path>) {
        let path = normalize(path.as_ref());
        self.lock().files.remove(&path);
    }

    /// Make every write below `prefix` fail with an error.
    pub fn fail_writes_under(&self, prefix: impl AsRef<Path>) {
        let prefix = normalize(prefix.as_ref());
        self.lock().failing_writes.insert(prefix);
    }

    /// Read a file as UTF-8 text, if it exists.
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
        let path = normalize(path.as_ref());
        self.lock()
            .files
            .get(&path)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    /// All file paths currently stored, sorted.
    pub fn file_paths(&self) -> Vec<PathBuf> {
        self.lock().files.keys().cloned().collect()
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.lock().write_count
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl FileSystem for MockFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let key = normalize(path);
        let state = self.lock();
        match state.files.get(&key) {
            Some(content) => Ok(content.clone()),
            None if is_dir_in(&state, &key) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        let key = normalize(path);
        let mut state = self.lock();
        if state.failing_writes.iter().any(|prefix| key.starts_with(prefix)) {
            return Err(anyhow!("permission denied writing {:?}", path));
        }
        state.files.insert(key, contents.to_vec());
        state.write_count += 1;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.is_file(path) || self.is_dir(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.lock().files.contains_key(&normalize(path))
    }

    fn is_dir(&self, path: &Path) -> bool {
        let key = normalize(path);
        is_dir_in(&self.lock(), &key)
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let key = normalize(path);
        let state = self.lock();
        if !is_dir_in(&state, &key) {
            return Err(anyhow!("Not a directory or not found: {:?}", path));
        }

        // Immediate children, reported relative to the caller's spelling of `path`.
        let mut children: BTreeSet<PathBuf> = BTreeSet::new();
        for file in state.files.keys() {
            if let Ok(rest) = file.strip_prefix(&key) {
                if let Some(first) = rest.components().next() {
                    children.insert(path.join(first.as_os_str()));
                }
            }
        }
        Ok(children.into_iter().collect())
    }
}

fn is_dir_in(state: &MockState, key: &Path) -> bool {
    state
        .files
        .keys()
        .any(|file| file != key && file.starts_with(key))
}

/// Lexical normalization: drop `.`, resolve `..`, keep everything else.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
