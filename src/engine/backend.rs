// src/engine/backend.rs

//! Seam between the watch runtime and whatever executes a task.
//!
//! Production uses [`PipelineRegistry`](crate::pipeline::PipelineRegistry);
//! tests plug in a fake that records invocations and returns canned results.

use std::future::Future;
use std::pin::Pin;

use crate::errors::Result;
use crate::pipeline::RunResult;

pub trait TaskRunner: Send + Sync + 'static {
    /// Run `task` to completion.
    fn execute<'a>(
        &'a self,
        task: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<RunResult>> + Send + 'a>>;
}
