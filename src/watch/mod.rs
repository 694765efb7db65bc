// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Compiling each task's source glob and enumerating matching files.
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - (Optionally) hashing file content to drop events for files that did
//!   not actually change.
//!
//! It does not debounce or decide which task runs; it only turns
//! filesystem changes into [`RuntimeEvent`](crate::engine::RuntimeEvent)s.

pub mod hash;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use hash::{ContentFilter, compute_file_hash};
pub use patterns::{SourcePattern, TaskWatchProfile, collect_matching_files};
pub use watcher::{WatcherHandle, spawn_watcher};
