//! Core document types shared across the pipeline.
//!
//! A [`Document`] is a named, versioned unit of content with recorded
//! provenance (its `dependencies` name the upstream documents that produced
//! it). A [`CodingContext`] bundles the documents that justify one code
//! generation pass; it lives for the duration of that pass and is dropped
//! once the result is persisted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Recognized keys of a structured task document.
///
/// A task list is a JSON object; the filename sequence lives under
/// `TASK_LIST_KEY` for a first-pass document and `REFINED_TASK_LIST_KEY`
/// after an incremental refinement. Both may coexist across pipeline
/// generations; consumers check the primary key first.
pub const TASK_LIST_KEY: &str = "Task list";
/// Refined variant of [`TASK_LIST_KEY`], written by incremental passes.
pub const REFINED_TASK_LIST_KEY: &str = "Refined Task list";

/// Primary key of the interface/data-structure description in a design
/// document's structured payload.
pub const DATA_STRUCTURES_KEY: &str = "Data structures and interfaces";
/// Refined variant of [`DATA_STRUCTURES_KEY`].
pub const REFINED_DATA_STRUCTURES_KEY: &str = "Refined Data structures and interfaces";

/// Primary key of the call-flow description in a design document's
/// structured payload.
pub const CALL_FLOW_KEY: &str = "Program call flow";
/// Refined variant of [`CALL_FLOW_KEY`].
pub const REFINED_CALL_FLOW_KEY: &str = "Refined Program call flow";

/// Filename of the free-form requirement document in the docs category.
pub const REQUIREMENT_FILENAME: &str = "requirement.txt";
/// Filename of the bug-feedback document in the docs category.
pub const BUGFIX_FILENAME: &str = "bugfix.md";
/// The root manifest every generated project must carry.
pub const MANIFEST_FILENAME: &str = "package.json";
/// Default entry-point filename. The entry point is always regenerated
/// fresh, never carried over from a prior iteration.
pub const DEFAULT_ENTRY_POINT: &str = "main.py";

/// A named document with content and provenance.
///
/// Identity is `filename` within a store; the same filename may exist in the
/// current-source and prior-iteration stores as two distinct entities until
/// the context assembler reconciles them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Store-relative filename, possibly containing path separators.
    pub filename: String,
    /// Full document content.
    pub content: String,
    /// Root directory of the category this document belongs to. Relative
    /// sub-path for doc categories, absolute for source workspaces.
    #[serde(default)]
    pub root_path: PathBuf,
    /// Root-relative paths of the upstream documents that produced this one.
    #[serde(default)]
    pub dependencies: BTreeSet<String>,
}

impl Document {
    /// Create a document with no root and no dependencies.
    pub fn new(filename: &str, content: &str) -> Self {
        Self {
            filename: filename.to_string(),
            content: content.to_string(),
            root_path: PathBuf::new(),
            dependencies: BTreeSet::new(),
        }
    }

    /// Set the category root this document belongs to.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root_path = root.into();
        self
    }

    /// Record the upstream documents that produced this one.
    pub fn with_dependencies(mut self, dependencies: BTreeSet<String>) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// The provenance key recorded by downstream documents: category root
    /// joined with the filename.
    pub fn root_relative_path(&self) -> PathBuf {
        self.root_path.join(&self.filename)
    }

    /// Whether the document carries no usable content.
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// Everything justifying one code generation pass for a single target file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodingContext {
    /// The file to generate.
    pub filename: String,
    /// Design document backing this file, if any.
    #[serde(default)]
    pub design_doc: Option<Document>,
    /// Task document backing this file, if any.
    #[serde(default)]
    pub task_doc: Option<Document>,
    /// The code document being (re)generated.
    #[serde(default)]
    pub code_doc: Option<Document>,
    /// Plan-and-change document from the incremental planning step, if any.
    #[serde(default)]
    pub code_plan_and_change_doc: Option<Document>,
}

impl CodingContext {
    /// Create a context for the given target filename.
    pub fn new(filename: &str) -> Self {
        Self {
            filename: filename.to_string(),
            ..Self::default()
        }
    }

    /// Attach the design document.
    pub fn with_design_doc(mut self, doc: Document) -> Self {
        self.design_doc = Some(doc);
        self
    }

    /// Attach the task document.
    pub fn with_task_doc(mut self, doc: Document) -> Self {
        self.task_doc = Some(doc);
        self
    }

    /// Attach the code document being regenerated.
    pub fn with_code_doc(mut self, doc: Document) -> Self {
        self.code_doc = Some(doc);
        self
    }

    /// Attach the plan-and-change document.
    pub fn with_plan_and_change_doc(mut self, doc: Document) -> Self {
        self.code_plan_and_change_doc = Some(doc);
        self
    }

    /// Provenance paths of the design and task documents, for dependency
    /// edges on saved artifacts.
    pub fn upstream_dependencies(&self) -> BTreeSet<String> {
        let mut deps = BTreeSet::new();
        if let Some(doc) = &self.design_doc {
            deps.insert(doc.root_relative_path().to_string_lossy().into_owned());
        }
        if let Some(doc) = &self.task_doc {
            deps.insert(doc.root_relative_path().to_string_lossy().into_owned());
        }
        deps
    }
}

/// Output of a prior validation/test pass for a target file, consulted
/// read-only as generation feedback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCodeResult {
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
}

impl RunCodeResult {
    /// Parse a serialized result. Unknown fields are ignored.
    pub fn loads(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }
}

/// Look up a structured-payload field, trying the primary key first and the
/// refined key second. NEW and REFINE passes produce differently-named
/// fields; absence of both is not an error.
pub fn structured_field<'a>(
    payload: &'a serde_json::Value,
    primary_key: &str,
    refined_key: &str,
) -> Option<&'a serde_json::Value> {
    payload.get(primary_key).or_else(|| payload.get(refined_key))
}

/// Test-output document name for a target file.
pub fn test_output_filename(target: &str) -> String {
    format!("test_{target}.json")
}

/// First path segment of a filename, if any.
pub fn first_path_segment(filename: &str) -> Option<&str> {
    Path::new(filename)
        .components()
        .next()
        .and_then(|c| match c {
            std::path::Component::Normal(part) => part.to_str(),
            _ => None,
        })
}
