//! Design synthesis: merge-vs-create decisions over changed requirements.
//!
//! For every requirement file that changed since the baseline, the
//! synthesizer either creates a fresh design document (no design exists yet)
//! or refines the existing one by merging legacy design content with the new
//! requirement text. Either way, the structured result is persisted with a
//! dependency edge back to the requirement, and the interface and call-flow
//! descriptions embedded in it are handed to the diagram renderer.

use crate::backend::{DesignSchema, GenerationBackend};
use crate::config::PipelineConfig;
use crate::detect::detect_changes;
use crate::errors::PipelineError;
use crate::render::DiagramRenderer;
use crate::schema::{
    CALL_FLOW_KEY, DATA_STRUCTURES_KEY, Document, REFINED_CALL_FLOW_KEY,
    REFINED_DATA_STRUCTURES_KEY, structured_field,
};
use crate::store::ProjectStores;
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Sub-directory for rendered interface/data-structure diagrams.
pub const CLASS_VIEW_ROOT: &str = "resources/class-view";
/// Sub-directory for rendered call-flow diagrams.
pub const SEQUENCE_FLOW_ROOT: &str = "resources/sequence-flow";

/// Merge context handed to the backend on the refine path.
fn merge_context(old_design: &str, new_requirement: &str) -> String {
    format!(
        "### Legacy Content\n{old_design}\n\n### New Requirements\n{new_requirement}"
    )
}

/// The two-variant synthesis decision, resolved once per filename before any
/// side effect occurs.
#[derive(Debug, Clone, PartialEq)]
pub enum DesignAction {
    /// No design document exists for this filename yet.
    New,
    /// A design document exists and will be refined in place.
    Refine { existing: Document },
}

impl DesignAction {
    /// Decide based on whether a design document is already present.
    pub fn resolve(existing: Option<Document>) -> Self {
        match existing {
            Some(existing) => Self::Refine { existing },
            None => Self::New,
        }
    }
}

/// Synthesizes design documents from changed requirements.
pub struct DesignSynthesizer {
    backend: Arc<dyn GenerationBackend>,
    renderer: Arc<dyn DiagramRenderer>,
    config: PipelineConfig,
}

impl DesignSynthesizer {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        renderer: Arc<dyn DiagramRenderer>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            backend,
            renderer,
            config,
        }
    }

    /// Regenerate designs for everything that changed since the baseline:
    /// changed requirements first, then changed design files not already
    /// covered. Per-file failures are logged and do not stop the walk.
    pub async fn run(&self, stores: &ProjectStores) -> Vec<Document> {
        let changed = detect_changes(stores.requirements.as_ref(), stores.designs.as_ref());
        if changed.is_empty() {
            info!("Nothing has changed.");
            return Vec::new();
        }

        let mut updated = Vec::new();
        let mut handled = HashSet::new();
        for filename in changed.requirements.keys() {
            match self.synthesize(stores, filename).await {
                Ok(doc) => {
                    handled.insert(filename.clone());
                    updated.push(doc);
                }
                Err(err) => error!("Design synthesis failed for {filename}: {err}"),
            }
        }
        for filename in changed.designs.keys() {
            if handled.contains(filename) {
                continue;
            }
            match self.synthesize(stores, filename).await {
                Ok(doc) => updated.push(doc),
                Err(err) => error!("Design synthesis failed for {filename}: {err}"),
            }
        }
        updated
    }

    /// Create or refine the design document for one filename, then extract
    /// and render its diagram artifacts.
    pub async fn synthesize(
        &self,
        stores: &ProjectStores,
        filename: &str,
    ) -> Result<Document, PipelineError> {
        let requirement = stores.requirements.get(filename).await?;
        if requirement.is_none() {
            warn!("No requirement document for {filename}, using empty content");
        }
        let requirement_content = requirement
            .as_ref()
            .map(|doc| doc.content.clone())
            .unwrap_or_default();
        let dependencies: BTreeSet<String> = requirement
            .as_ref()
            .map(|doc| {
                BTreeSet::from([doc.root_relative_path().to_string_lossy().into_owned()])
            })
            .unwrap_or_default();

        let action = DesignAction::resolve(stores.designs.get(filename).await?);
        let doc = match action {
            DesignAction::New => {
                let result = self
                    .backend
                    .fill(&requirement_content, DesignSchema::Initial)
                    .await?;
                stores
                    .designs
                    .save(filename, &result.dumps(), &dependencies)
                    .await?
            }
            DesignAction::Refine { existing } => {
                let context = merge_context(&existing.content, &requirement_content);
                let result = self.backend.fill(&context, DesignSchema::Refined).await?;
                stores
                    .designs
                    .save(filename, &result.dumps(), &dependencies)
                    .await?
            }
        };

        self.render_class_view(&doc).await;
        self.render_call_flow(&doc).await;
        Ok(doc)
    }

    /// Extract the interface/data-structure description and render it.
    pub async fn render_class_view(&self, doc: &Document) {
        self.render_artifact(
            doc,
            DATA_STRUCTURES_KEY,
            REFINED_DATA_STRUCTURES_KEY,
            CLASS_VIEW_ROOT,
            "class view",
        )
        .await;
    }

    /// Extract the call-flow description and render it.
    pub async fn render_call_flow(&self, doc: &Document) {
        self.render_artifact(
            doc,
            CALL_FLOW_KEY,
            REFINED_CALL_FLOW_KEY,
            SEQUENCE_FLOW_ROOT,
            "sequence flow",
        )
        .await;
    }

    /// Shared extraction path. Failures here never fail synthesis: a design
    /// whose payload does not parse, or a renderer error, is logged and the
    /// artifact skipped.
    async fn render_artifact(
        &self,
        doc: &Document,
        primary_key: &str,
        refined_key: &str,
        subdir: &str,
        what: &str,
    ) {
        let payload: serde_json::Value = match serde_json::from_str(&doc.content) {
            Ok(value) => value,
            Err(err) => {
                warn!("Skipping {what} extraction for {}: {err}", doc.filename);
                return;
            }
        };
        let Some(graph) = structured_field(&payload, primary_key, refined_key)
            .and_then(|value| value.as_str())
        else {
            return;
        };

        let pathname = self
            .config
            .workspace
            .join(subdir)
            .join(Path::new(&doc.filename).with_extension(""));
        if let Some(parent) = pathname.parent() {
            if let Err(err) = fs::create_dir_all(parent) {
                error!("Failed to create {}: {err}", parent.display());
                return;
            }
        }
        match self
            .renderer
            .render(&self.config.diagram_engine, graph, &pathname)
            .await
        {
            Ok(()) => info!("Saved {what} to {}", pathname.display()),
            Err(err) => warn!("Failed to render {what} for {}: {err}", doc.filename),
        }
    }
}
