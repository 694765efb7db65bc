// src/pipeline/mod.rs

//! Tasks and their execution.
//!
//! A [`Task`] is an ordered list of stages plus a source glob and a
//! destination directory. [`Pipeline`] runs a task over every matching file,
//! isolating per-file failures through the [`ErrorSink`]. The
//! [`PipelineRegistry`] owns every task of a config and is what the CLI and
//! the watch runtime talk to.

pub mod diagnostic;
pub mod registry;
pub mod result;
pub mod runner;
pub mod sink;
pub mod task;

/// Canonical task name type.
pub type TaskName = String;

pub use diagnostic::Diagnostic;
pub use registry::PipelineRegistry;
pub use result::RunResult;
pub use runner::Pipeline;
pub use sink::ErrorSink;
pub use task::Task;
