//! Bounded-retry invocation of the generation backend.
//!
//! Wraps a single `ask` call with randomized exponential backoff, extracts
//! the fenced code block from the raw response, and runs a best-effort lint
//! for known nested-path anti-patterns. Only the backend call itself is
//! retried; decisions made before the call are never re-run.

use crate::backend::GenerationBackend;
use crate::errors::{BackendError, PipelineError};
use rand::Rng;
use regex::Regex;
use std::sync::Arc;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::warn;

static CODE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[^\n`]*\n(.*?)```").unwrap());

/// Substrings indicating the backend nested directories incorrectly.
/// Findings are advisory only; the scaffold pass compensates for structural
/// damage, so nothing here blocks the return.
pub const NESTED_PATH_PATTERNS: [&str; 3] =
    ["frontend/frontend/", "backend/backend/", "/project_name/"];

/// Scan generated code for the known nested-path anti-patterns.
pub fn detect_nested_paths(code: &str) -> Vec<&'static str> {
    NESTED_PATH_PATTERNS
        .iter()
        .copied()
        .filter(|pattern| code.contains(pattern))
        .collect()
}

/// Extract the body of the first fenced code block. A response without a
/// fence is returned as-is; block markers are never invented.
pub fn extract_code_block(text: &str) -> String {
    match CODE_BLOCK.captures(text) {
        Some(caps) => caps[1].to_string(),
        None => text.to_string(),
    }
}

/// Retry policy: bounded attempts with a randomized, exponentially widening
/// wait window.
///
/// The wait before retrying attempt `n` is drawn uniformly from
/// `0..=min(max_wait, initial_wait * 2^(n-1))`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_wait: Duration,
    pub max_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            initial_wait: Duration::from_secs(1),
            max_wait: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Policy with no waiting, for drivers that want bounded attempts only.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_wait: Duration::ZERO,
            max_wait: Duration::ZERO,
        }
    }

    /// Upper bound of the wait window before retrying `attempt` (1-based).
    pub fn wait_window(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(30);
        self.initial_wait
            .checked_mul(1u32 << shift)
            .unwrap_or(self.max_wait)
            .min(self.max_wait)
    }

    /// Draw the randomized wait before retrying `attempt`.
    pub fn wait_before(&self, attempt: u32) -> Duration {
        let window = self.wait_window(attempt);
        if window.is_zero() {
            return Duration::ZERO;
        }
        let secs = rand::thread_rng().gen_range(0.0..=window.as_secs_f64());
        Duration::from_secs_f64(secs)
    }
}

/// Invokes the generation backend for free-form code generation.
pub struct GenerationInvoker {
    backend: Arc<dyn GenerationBackend>,
    policy: RetryPolicy,
}

impl GenerationInvoker {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self {
            backend,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(backend: Arc<dyn GenerationBackend>, policy: RetryPolicy) -> Self {
        Self { backend, policy }
    }

    /// Ask the backend for code. Transient failures are retried under the
    /// policy; exhaustion surfaces as `RetriesExhausted` for the caller to
    /// downgrade. The extracted code is linted but never blocked.
    pub async fn invoke(&self, prompt: &str) -> Result<String, PipelineError> {
        let raw = self.ask_with_retry(prompt).await?;
        let code = extract_code_block(&raw);
        for pattern in detect_nested_paths(&code) {
            warn!("Detected potentially problematic nested path {pattern} in generated code");
        }
        Ok(code)
    }

    async fn ask_with_retry(&self, prompt: &str) -> Result<String, PipelineError> {
        let attempts = self.policy.max_attempts.max(1);
        let mut last_error = None;
        for attempt in 1..=attempts {
            match self.backend.ask(prompt).await {
                Ok(response) => return Ok(response),
                Err(err) if err.is_transient() => {
                    warn!("Generation attempt {attempt}/{attempts} failed: {err}");
                    last_error = Some(err);
                    if attempt < attempts {
                        tokio::time::sleep(self.policy.wait_before(attempt)).await;
                    }
                }
                Err(err) => return Err(PipelineError::Backend(err)),
            }
        }
        Err(PipelineError::RetriesExhausted {
            attempts,
            source: last_error
                .unwrap_or_else(|| BackendError::Transient("no attempt made".to_string())),
        })
    }
}
