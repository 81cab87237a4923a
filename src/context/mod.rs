//! Sibling-code context assembly for a single generation target.
//!
//! Given a task document and the filename about to be generated, builds the
//! textual context of every other relevant file. Normal mode follows the
//! task list. Incremental mode reconciles the current source tree with the
//! prior iteration's tree: it walks the union of both filename sets, shows
//! the target's prior-iteration content first (marked for rewriting), and
//! fills in carried-over files from the old tree when the current tree lacks
//! them.

use crate::errors::PipelineError;
use crate::schema::{Document, REFINED_TASK_LIST_KEY, TASK_LIST_KEY, structured_field};
use crate::store::ProjectStores;
use tracing::debug;

/// Which filename listing and reconciliation rules apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyMode {
    /// Follow the task list in order.
    Normal,
    /// Union of current and prior-iteration trees, rewritten target first.
    Incremental,
}

/// Builds the sibling-code context for one generation target.
pub struct CodeContextAssembler {
    entry_point: String,
}

impl CodeContextAssembler {
    /// `entry_point` is the filename that is always regenerated fresh; its
    /// prior-iteration content is never offered for rewriting.
    pub fn new(entry_point: &str) -> Self {
        Self {
            entry_point: entry_point.to_string(),
        }
    }

    /// Assemble the context text for generating `exclude`: every relevant
    /// sibling file except the target itself.
    pub async fn assemble(
        &self,
        stores: &ProjectStores,
        task_doc: Option<&Document>,
        exclude: &str,
        mode: AssemblyMode,
    ) -> Result<String, PipelineError> {
        let Some(task_doc) = task_doc else {
            return Ok(String::new());
        };
        if task_doc.is_empty() {
            return Ok(String::new());
        }

        let payload: serde_json::Value = serde_json::from_str(&task_doc.content)
            .map_err(|source| PipelineError::MalformedPayload {
                filename: task_doc.filename.clone(),
                source,
            })?;

        match mode {
            AssemblyMode::Normal => self.assemble_normal(stores, &payload, exclude).await,
            AssemblyMode::Incremental => self.assemble_incremental(stores, exclude).await,
        }
    }

    async fn assemble_normal(
        &self,
        stores: &ProjectStores,
        payload: &serde_json::Value,
        exclude: &str,
    ) -> Result<String, PipelineError> {
        let filenames = task_list(payload, TASK_LIST_KEY, REFINED_TASK_LIST_KEY);
        let mut blocks = Vec::new();
        for filename in filenames {
            if filename == exclude {
                continue;
            }
            let Some(doc) = stores.sources.get(&filename).await? else {
                debug!("No current source for {filename}, skipping");
                continue;
            };
            blocks.push(sibling_block(&filename, &doc.content));
        }
        Ok(blocks.join("\n"))
    }

    /// Walk the union of current and prior-iteration filenames. The target's
    /// prior content (when eligible) is inserted at the front so the backend
    /// sees the file it must rewrite before any other context.
    async fn assemble_incremental(
        &self,
        stores: &ProjectStores,
        exclude: &str,
    ) -> Result<String, PipelineError> {
        let current = stores.sources.all_files();
        let prior = stores.prior_sources.all_files();
        let mut union = current.clone();
        for filename in &prior {
            if !current.contains(filename) {
                union.push(filename.clone());
            }
        }

        let mut blocks = Vec::new();
        for filename in &union {
            if filename == exclude {
                if filename == &self.entry_point {
                    continue;
                }
                let Some(doc) = stores.prior_sources.get(filename).await? else {
                    continue;
                };
                blocks.insert(0, rewrite_block(filename, &doc.content));
                continue;
            }
            let doc = match stores.sources.get(filename).await? {
                Some(doc) => Some(doc),
                None => stores.prior_sources.get(filename).await?,
            };
            let Some(doc) = doc else {
                debug!("No source in either tree for {filename}, skipping");
                continue;
            };
            blocks.push(sibling_block(filename, &doc.content));
        }
        Ok(blocks.join("\n"))
    }
}

/// Ordered filenames from the task-list field, primary key first.
fn task_list(payload: &serde_json::Value, primary_key: &str, refined_key: &str) -> Vec<String> {
    structured_field(payload, primary_key, refined_key)
        .and_then(|value| value.as_array())
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| entry.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn sibling_block(filename: &str, content: &str) -> String {
    format!("----- {filename}\n```{content}```")
}

fn rewrite_block(filename: &str, content: &str) -> String {
    format!("-----Now, {filename} to be rewritten\n```{content}```\n=====")
}
