//! Runtime configuration for a regeneration run.

use crate::schema::DEFAULT_ENTRY_POINT;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_entry_point() -> String {
    DEFAULT_ENTRY_POINT.to_string()
}

fn default_diagram_engine() -> String {
    "nodejs".to_string()
}

/// Configuration for one pipeline run.
///
/// `workspace` is the project workspace root: diagrams and scaffold files
/// land under it. `src_workspace` is the directory of the current source
/// tree, used as the root of freshly created code documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub workspace: PathBuf,
    pub src_workspace: PathBuf,
    /// Incremental mode reconciles the prior iteration's sources with the
    /// current tree instead of following the task list alone.
    #[serde(default)]
    pub incremental: bool,
    /// Filename always regenerated fresh, never carried over.
    #[serde(default = "default_entry_point")]
    pub entry_point: String,
    /// Engine identifier handed to the diagram renderer.
    #[serde(default = "default_diagram_engine")]
    pub diagram_engine: String,
}

impl PipelineConfig {
    /// Config rooted at `workspace`, with sources under `<workspace>/src`.
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        let workspace = workspace.into();
        let src_workspace = workspace.join("src");
        Self {
            workspace,
            src_workspace,
            incremental: false,
            entry_point: default_entry_point(),
            diagram_engine: default_diagram_engine(),
        }
    }

    /// Override the current source directory.
    pub fn with_src_workspace(mut self, src_workspace: impl Into<PathBuf>) -> Self {
        self.src_workspace = src_workspace.into();
        self
    }

    /// Toggle incremental mode.
    pub fn with_incremental(mut self, incremental: bool) -> Self {
        self.incremental = incremental;
        self
    }

    /// Override the always-fresh entry-point filename.
    pub fn with_entry_point(mut self, entry_point: &str) -> Self {
        self.entry_point = entry_point.to_string();
        self
    }

    /// Override the diagram engine identifier.
    pub fn with_diagram_engine(mut self, engine: &str) -> Self {
        self.diagram_engine = engine.to_string();
        self
    }
}
