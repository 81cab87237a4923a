//! Per-file generation pass and the sequential batch driver.
//!
//! Files are processed one at a time in task-list / union order; each
//! backend or store call is a suspension point with at most one in flight.
//! No failure aborts the batch: a file whose generation fails ends up as an
//! empty-content document and the driver moves on.

pub mod prompts;

use crate::backend::GenerationBackend;
use crate::config::PipelineConfig;
use crate::context::{AssemblyMode, CodeContextAssembler};
use crate::invoke::{GenerationInvoker, RetryPolicy};
use crate::scaffold::CriticalFileEnsurer;
use crate::schema::{
    BUGFIX_FILENAME, CodingContext, Document, REQUIREMENT_FILENAME, RunCodeResult,
    test_output_filename,
};
use crate::store::ProjectStores;
use chrono::{DateTime, Utc};
use prompts::{PromptInputs, file_generation_prompt, incremental_generation_prompt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Audit record of one batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Files whose generation and persistence both succeeded.
    pub generated: Vec<String>,
    /// Files downgraded to an empty-content result.
    pub failed: Vec<String>,
    /// Scaffold files created by the invariant pass.
    pub scaffolded: Vec<PathBuf>,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            ended_at: None,
            generated: Vec::new(),
            failed: Vec::new(),
            scaffolded: Vec::new(),
        }
    }

    pub fn finish(&mut self) {
        self.ended_at = Some(Utc::now());
    }

    /// True when every file made it through.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of one file's trip through the pipeline.
#[derive(Debug)]
pub struct FileOutcome {
    pub context: CodingContext,
    /// False when the file was downgraded to empty content.
    pub generated: bool,
    pub scaffolded: BTreeSet<PathBuf>,
}

/// Drives code generation for a batch of target files.
pub struct CodeGenerator {
    invoker: GenerationInvoker,
    assembler: CodeContextAssembler,
    config: PipelineConfig,
}

impl CodeGenerator {
    pub fn new(backend: Arc<dyn GenerationBackend>, config: PipelineConfig) -> Self {
        Self {
            invoker: GenerationInvoker::new(backend),
            assembler: CodeContextAssembler::new(&config.entry_point),
            config,
        }
    }

    /// Use a non-default retry policy for the backend call.
    pub fn with_retry_policy(
        backend: Arc<dyn GenerationBackend>,
        policy: RetryPolicy,
        config: PipelineConfig,
    ) -> Self {
        Self {
            invoker: GenerationInvoker::with_policy(backend, policy),
            assembler: CodeContextAssembler::new(&config.entry_point),
            config,
        }
    }

    /// Process targets sequentially. Later files are unaffected by earlier
    /// failures; documents persisted before an abrupt termination stand.
    pub async fn run(&self, stores: &ProjectStores, targets: Vec<CodingContext>) -> RunReport {
        let mut report = RunReport::new();
        for target in targets {
            let filename = target.filename.clone();
            let outcome = self.generate_file(stores, target).await;
            if outcome.generated {
                report.generated.push(filename);
            } else {
                report.failed.push(filename);
            }
            report.scaffolded.extend(outcome.scaffolded);
        }
        report.finish();
        info!(
            "Run {} finished: {} generated, {} failed",
            report.run_id,
            report.generated.len(),
            report.failed.len()
        );
        report
    }

    /// Generate one file. Never fails: every error is downgraded to an
    /// empty-content result so the batch can continue.
    pub async fn generate_file(
        &self,
        stores: &ProjectStores,
        mut context: CodingContext,
    ) -> FileOutcome {
        let bug_feedback = self.optional_doc(stores, BUGFIX_FILENAME).await;
        let requirement = self.optional_doc(stores, REQUIREMENT_FILENAME).await;
        let logs = self.gather_logs(stores, &context.filename).await;

        let mut failed = false;
        let code_context = if bug_feedback.is_some() {
            // Bug-fix passes stay focused on the current file body.
            context
                .code_doc
                .as_ref()
                .map(|doc| doc.content.clone())
                .unwrap_or_default()
        } else {
            let mode = if self.config.incremental {
                AssemblyMode::Incremental
            } else {
                AssemblyMode::Normal
            };
            match self
                .assembler
                .assemble(stores, context.task_doc.as_ref(), &context.filename, mode)
                .await
            {
                Ok(text) => text,
                Err(err) => {
                    error!("Failed to assemble context for {}: {err}", context.filename);
                    failed = true;
                    String::new()
                }
            }
        };

        let code = if failed {
            String::new()
        } else {
            let inputs = PromptInputs {
                filename: &context.filename,
                design: doc_content(&context.design_doc),
                task: doc_content(&context.task_doc),
                code: &code_context,
                logs: &logs,
                feedback: doc_content(&bug_feedback),
                user_requirement: doc_content(&requirement),
                plan_and_change: doc_content(&context.code_plan_and_change_doc),
            };
            let prompt = if self.config.incremental {
                incremental_generation_prompt(&inputs)
            } else {
                file_generation_prompt(&inputs)
            };
            info!("Writing {}..", context.filename);
            match self.invoker.invoke(&prompt).await {
                Ok(code) => {
                    info!("Generated code for {}", context.filename);
                    code
                }
                Err(err) => {
                    error!("Failed to generate code for {}: {err}", context.filename);
                    failed = true;
                    String::new()
                }
            }
        };

        match &mut context.code_doc {
            Some(doc) => doc.content = code.clone(),
            None => {
                context.code_doc = Some(
                    Document::new(&context.filename, &code)
                        .with_root(self.config.src_workspace.clone()),
                );
            }
        }

        let scaffolded = CriticalFileEnsurer::ensure(&context, stores.sources.as_ref()).await;
        if !scaffolded.is_empty() {
            info!("Created critical files: {scaffolded:?}");
        }

        let dependencies = context.upstream_dependencies();
        if let Err(err) = stores
            .sources
            .save(&context.filename, &code, &dependencies)
            .await
        {
            error!("Failed to persist {}: {err}", context.filename);
            failed = true;
        }

        FileOutcome {
            context,
            generated: !failed,
            scaffolded,
        }
    }

    /// Fetch an optional docs-category document; read errors degrade to
    /// absence.
    async fn optional_doc(&self, stores: &ProjectStores, filename: &str) -> Option<Document> {
        match stores.docs.get(filename).await {
            Ok(doc) => doc,
            Err(err) => {
                warn!("Failed to read {filename}: {err}");
                None
            }
        }
    }

    /// Stderr of the prior validation pass for this target, if any.
    async fn gather_logs(&self, stores: &ProjectStores, filename: &str) -> String {
        let name = test_output_filename(filename);
        let doc = match stores.test_outputs.get(&name).await {
            Ok(Some(doc)) => doc,
            Ok(None) => return String::new(),
            Err(err) => {
                warn!("Failed to read test output for {filename}: {err}");
                return String::new();
            }
        };
        match RunCodeResult::loads(&doc.content) {
            Ok(result) => result.stderr,
            Err(err) => {
                warn!("Malformed test output for {filename}: {err}");
                String::new()
            }
        }
    }
}

fn doc_content(doc: &Option<Document>) -> &str {
    doc.as_ref().map(|d| d.content.as_str()).unwrap_or("")
}
