//! Diagram renderer contract.
//!
//! Rendering a graph description to an image or file format is a
//! collaborator concern. The caller guarantees the output path's parent
//! directories exist before invoking `render`.

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

/// Renders a textual graph description to `output_path` using the engine
/// named by `engine_id`.
#[async_trait]
pub trait DiagramRenderer: Send + Sync {
    async fn render(&self, engine_id: &str, graph: &str, output_path: &Path) -> Result<()>;
}
