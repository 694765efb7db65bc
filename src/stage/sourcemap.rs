// src/stage/sourcemap.rs

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::stage::{Stage, StageFuture, StageOutput};

/// Source map v3 document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    pub version: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub sources: Vec<String>,
    pub sources_content: Vec<String>,
    pub names: Vec<String>,
    pub mappings: String,
}

impl SourceMap {
    /// Map every line of `content` to the same line of `source`, column 0.
    ///
    /// The first segment is `AAAA` (all zero); each following line is
    /// `AACA`, i.e. source line delta +1.
    pub fn identity(source: &str, content: &str) -> Self {
        let lines = content.lines().count();
        let mappings = if lines == 0 {
            String::new()
        } else {
            let mut m = String::from("AAAA");
            for _ in 1..lines {
                m.push_str(";AACA");
            }
            m
        };

        Self {
            version: 3,
            file: None,
            sources: vec![source.to_string()],
            sources_content: vec![content.to_string()],
            names: Vec::new(),
            mappings,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Attaches an identity source map of the content as it reaches this stage.
#[derive(Debug, Clone)]
pub struct SourcemapStage {
    name: String,
}

impl SourcemapStage {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Stage for SourcemapStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply<'a>(&'a self, content: Vec<u8>, path: &'a Path) -> StageFuture<'a> {
        Box::pin(async move {
            let source = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.to_string_lossy().into_owned());
            let map = SourceMap::identity(&source, &String::from_utf8_lossy(&content));
            Ok(StageOutput::new(content).with_sourcemap(map))
        })
    }
}
