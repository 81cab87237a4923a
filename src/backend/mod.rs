//! Generation backend contract.
//!
//! The backend turns a prompt into text (`ask`) or into a structured object
//! conforming to a named schema (`fill`). The pipeline never talks to a
//! model directly; everything goes through this trait so runs are drivable
//! by fakes.

use crate::errors::BackendError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Which structured design schema a `fill` call must satisfy.
///
/// First-pass synthesis and incremental refinement produce differently-named
/// structured fields, so the schema choice travels with the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DesignSchema {
    /// Fresh design for a requirement with no prior design document.
    Initial,
    /// Refinement merging a legacy design with new requirements.
    Refined,
}

/// Structured result of a `fill` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredResult {
    /// The structured payload, keyed by the schema's field names.
    pub instruct_content: serde_json::Value,
}

impl StructuredResult {
    /// Serialize the payload for persistence as document content.
    pub fn dumps(&self) -> String {
        self.instruct_content.to_string()
    }
}

/// A generation backend. Failures distinguish transient conditions (which
/// the retry policy may re-issue) from outright rejections.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Produce a structured object for the given context under a schema.
    async fn fill(
        &self,
        context: &str,
        schema: DesignSchema,
    ) -> Result<StructuredResult, BackendError>;

    /// Produce free-form text for the given prompt.
    async fn ask(&self, prompt: &str) -> Result<String, BackendError>;
}
