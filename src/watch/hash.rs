use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::fs::FileSystem;

/// blake3 hex digest of a single file's contents.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let bytes = fs.read(path)?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

/// Drops watch events for files whose content did not actually change.
///
/// Editors frequently rewrite a file byte-for-byte on save, or emit several
/// events per save. The filter remembers the last seen hash per path and
/// only lets an event through when the hash differs (or is unknown).
#[derive(Debug)]
pub struct ContentFilter {
    fs: Arc<dyn FileSystem>,
    hashes: HashMap<PathBuf, String>,
}

impl ContentFilter {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            hashes: HashMap::new(),
        }
    }

    /// Record the current hashes of `paths` without reporting them as changed.
    pub fn seed<I>(&mut self, paths: I)
    where
        I: IntoIterator<Item = PathBuf>,
    {
        for path in paths {
            match compute_file_hash(self.fs.as_ref(), &path) {
                Ok(hash) => {
                    self.hashes.insert(path, hash);
                }
                Err(err) => debug!(?path, error = %err, "could not seed content hash"),
            }
        }
        debug!(seeded = self.hashes.len(), "content filter seeded");
    }

    /// Returns true if `path` changed since it was last seen.
    ///
    /// Unreadable files count as changed so that the pipeline gets to report
    /// the real error.
    pub fn has_changed(&mut self, path: &Path) -> bool {
        let hash = match compute_file_hash(self.fs.as_ref(), path) {
            Ok(h) => h,
            Err(err) => {
                debug!(?path, error = %err, "hashing failed; treating as changed");
                self.hashes.remove(path);
                return true;
            }
        };

        match self.hashes.insert(path.to_path_buf(), hash.clone()) {
            Some(old) if old == hash => {
                debug!(?path, "content unchanged; dropping event");
                false
            }
            _ => true,
        }
    }

    /// Forget a path (e.g. after it was deleted).
    pub fn forget(&mut self, path: &Path) {
        if self.hashes.remove(path).is_some() {
            debug!(?path, "forgot content hash");
        }
    }
}
