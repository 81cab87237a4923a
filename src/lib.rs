//! Incremental artifact regeneration.
//!
//! `reweave` rebuilds a multi-file generated artifact (design documents and
//! source files) as upstream requirements change, preserving prior work that
//! is still valid. Change detection, design synthesis, context assembly,
//! bounded-retry generation, and the scaffold invariant pass are all here;
//! the generation backend, document persistence, and diagram rendering are
//! collaborators behind traits.

pub mod backend;
pub mod config;
pub mod context;
pub mod design;
pub mod detect;
pub mod errors;
pub mod invoke;
pub mod pipeline;
pub mod render;
pub mod scaffold;
pub mod schema;
pub mod store;

pub use backend::{DesignSchema, GenerationBackend, StructuredResult};
pub use config::PipelineConfig;
pub use context::{AssemblyMode, CodeContextAssembler};
pub use design::{DesignAction, DesignSynthesizer};
pub use detect::{ChangedDocuments, detect_changes};
pub use errors::{BackendError, PipelineError, StoreError};
pub use invoke::{GenerationInvoker, RetryPolicy};
pub use pipeline::{CodeGenerator, RunReport};
pub use render::DiagramRenderer;
pub use scaffold::CriticalFileEnsurer;
pub use schema::{CodingContext, Document, RunCodeResult};
pub use store::{ChangeKind, DocumentStore, FsDocumentStore, MemoryDocumentStore, ProjectStores};
