//! Shared fakes for the integration suite.

use async_trait::async_trait;
use reweave::backend::{DesignSchema, GenerationBackend, StructuredResult};
use reweave::errors::BackendError;
use reweave::render::DiagramRenderer;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Backend with a programmable number of transient failures before success,
/// a canned `ask` response, and a canned `fill` payload.
pub struct ScriptedBackend {
    failures_before_success: u32,
    attempts: Mutex<u32>,
    response: String,
    payload: serde_json::Value,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new(response: &str) -> Self {
        Self {
            failures_before_success: 0,
            attempts: Mutex::new(0),
            response: response.to_string(),
            payload: serde_json::json!({}),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(failures_before_success: u32, response: &str) -> Self {
        Self {
            failures_before_success,
            ..Self::new(response)
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn attempts(&self) -> u32 {
        *self.attempts.lock().unwrap()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn fill(
        &self,
        _context: &str,
        _schema: DesignSchema,
    ) -> Result<StructuredResult, BackendError> {
        Ok(StructuredResult {
            instruct_content: self.payload.clone(),
        })
    }

    async fn ask(&self, prompt: &str) -> Result<String, BackendError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let mut attempts = self.attempts.lock().unwrap();
        *attempts += 1;
        if *attempts <= self.failures_before_success {
            Err(BackendError::Transient(format!(
                "scripted failure {attempts}"
            )))
        } else {
            Ok(self.response.clone())
        }
    }
}

/// Renderer that records every call instead of producing output.
#[derive(Default)]
pub struct RecordingRenderer {
    pub calls: Mutex<Vec<(String, String, PathBuf)>>,
}

#[async_trait]
impl DiagramRenderer for RecordingRenderer {
    async fn render(&self, engine_id: &str, graph: &str, output_path: &Path) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push((
            engine_id.to_string(),
            graph.to_string(),
            output_path.to_path_buf(),
        ));
        Ok(())
    }
}

/// Install a test subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}
