//! Typed error hierarchy for the regeneration pipeline.
//!
//! Three top-level enums cover the three subsystems:
//! - `BackendError` - generation backend failures, with a distinguishable
//!   transient condition the retry policy can catch
//! - `StoreError` - document persistence failures
//! - `PipelineError` - per-file pipeline failures (retry exhaustion,
//!   malformed structured payloads, store errors)

use thiserror::Error;

/// Errors reported by the generation backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// A transient failure (timeout, overload, connection reset). Eligible
    /// for retry under the pipeline's backoff policy.
    #[error("Transient backend failure: {0}")]
    Transient(String),

    /// The backend rejected the request outright. Not retried.
    #[error("Backend rejected request: {0}")]
    Rejected(String),
}

impl BackendError {
    /// Whether the retry policy may re-issue the call after this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Errors from a document store implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to read document {filename}: {source}")]
    ReadFailed {
        filename: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to save document {filename}: {source}")]
    SaveFailed {
        filename: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Store rejected {filename}: {reason}")]
    Rejected { filename: String, reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors from a single file's trip through the pipeline.
///
/// None of these abort a multi-file batch: the batch driver logs the failure,
/// downgrades the file to an empty-content result, and moves on.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Generation failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: BackendError,
    },

    #[error("Malformed structured payload in {filename}: {source}")]
    MalformedPayload {
        filename: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
