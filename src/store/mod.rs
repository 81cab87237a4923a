//! Document store contract and the category partitions a run operates on.
//!
//! A store is one named partition (requirements, designs, tasks, current
//! source, prior-iteration source, ...) addressable by a relative sub-path.
//! It exposes point reads and writes plus two snapshots: all files currently
//! present, and files changed relative to a baseline.
//!
//! The persistence layer itself is a collaborator; two reference
//! implementations ship with the crate: [`memory::MemoryDocumentStore`] and
//! [`fs::FsDocumentStore`].

mod fs;
mod memory;

pub use fs::FsDocumentStore;
pub use memory::MemoryDocumentStore;

use crate::errors::StoreError;
use crate::schema::Document;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

/// Conventional sub-path of the requirement category.
pub const REQUIREMENTS_ROOT: &str = "docs/requirements";
/// Conventional sub-path of the design category.
pub const DESIGNS_ROOT: &str = "docs/designs";
/// Conventional sub-path of the task category.
pub const TASKS_ROOT: &str = "docs/tasks";
/// Conventional sub-path of the free-form docs category.
pub const DOCS_ROOT: &str = "docs";
/// Conventional sub-path of the validation-output category.
pub const TEST_OUTPUTS_ROOT: &str = "test_outputs";
/// Conventional sub-path of the current source category.
pub const SOURCES_ROOT: &str = "src";
/// Conventional sub-path of the prior-iteration source category.
pub const PRIOR_SOURCES_ROOT: &str = "old/src";

/// How a file changed relative to the store's baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

/// One category partition of the document collection.
///
/// `get`/`save` are suspension points; `changed_files`/`all_files` are cheap
/// snapshots. Iteration order of both snapshots is the insertion order of the
/// underlying listing, stable for a fixed baseline and working set.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document by filename, or `None` if absent.
    async fn get(&self, filename: &str) -> Result<Option<Document>, StoreError>;

    /// Create or replace a document, recording its provenance.
    async fn save(
        &self,
        filename: &str,
        content: &str,
        dependencies: &BTreeSet<String>,
    ) -> Result<Document, StoreError>;

    /// Files changed relative to the baseline, in insertion order.
    fn changed_files(&self) -> IndexMap<String, ChangeKind>;

    /// Snapshot the current state as the new baseline.
    fn mark_baseline(&self);

    /// All filenames currently present, in insertion order.
    fn all_files(&self) -> Vec<String>;

    /// Root path of this category (relative sub-path or absolute directory).
    fn root(&self) -> &Path;
}

/// The full set of category partitions one pipeline run operates on.
///
/// Passed explicitly to every component call; no component holds ambient
/// mutable state between calls. The current-source and prior-iteration
/// partitions are independent: a filename present in both names two
/// distinct documents until the context assembler reconciles them.
#[derive(Clone)]
pub struct ProjectStores {
    /// Requirement documents, one per artifact group.
    pub requirements: Arc<dyn DocumentStore>,
    /// Design documents, keyed by the same filenames as requirements.
    pub designs: Arc<dyn DocumentStore>,
    /// Task documents, keyed by the same filenames as designs.
    pub tasks: Arc<dyn DocumentStore>,
    /// Free-form docs: the overall requirement text, bug feedback.
    pub docs: Arc<dyn DocumentStore>,
    /// Validation outputs from prior test passes.
    pub test_outputs: Arc<dyn DocumentStore>,
    /// Current source tree.
    pub sources: Arc<dyn DocumentStore>,
    /// Source tree of the previous iteration.
    pub prior_sources: Arc<dyn DocumentStore>,
}

impl ProjectStores {
    /// An all-in-memory store set with the conventional category sub-paths.
    pub fn in_memory() -> Self {
        Self {
            requirements: Arc::new(MemoryDocumentStore::new(REQUIREMENTS_ROOT)),
            designs: Arc::new(MemoryDocumentStore::new(DESIGNS_ROOT)),
            tasks: Arc::new(MemoryDocumentStore::new(TASKS_ROOT)),
            docs: Arc::new(MemoryDocumentStore::new(DOCS_ROOT)),
            test_outputs: Arc::new(MemoryDocumentStore::new(TEST_OUTPUTS_ROOT)),
            sources: Arc::new(MemoryDocumentStore::new(SOURCES_ROOT)),
            prior_sources: Arc::new(MemoryDocumentStore::new(PRIOR_SOURCES_ROOT)),
        }
    }

    /// Replace the current-source partition.
    pub fn with_sources(mut self, sources: Arc<dyn DocumentStore>) -> Self {
        self.sources = sources;
        self
    }

    /// Replace the prior-iteration source partition.
    pub fn with_prior_sources(mut self, prior_sources: Arc<dyn DocumentStore>) -> Self {
        self.prior_sources = prior_sources;
        self
    }
}
