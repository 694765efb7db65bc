// src/stage/rename.rs

use std::path::Path;

use crate::stage::{Stage, StageFuture, StageOutput};

/// Pass-through stage that only changes the output extension.
#[derive(Debug, Clone)]
pub struct RenameStage {
    name: String,
    extension: String,
}

impl RenameStage {
    pub fn new(name: impl Into<String>, extension: impl Into<String>) -> Self {
        let extension = extension.into();
        Self {
            name: name.into(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }
}

impl Stage for RenameStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn output_extension(&self) -> Option<&str> {
        Some(&self.extension)
    }

    fn apply<'a>(&'a self, content: Vec<u8>, _path: &'a Path) -> StageFuture<'a> {
        Box::pin(async move { Ok(StageOutput::new(content)) })
    }
}
