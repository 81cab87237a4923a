//! Change detection across document generations.
//!
//! Derives, from the requirement and design stores, which filenames changed
//! since the last baseline. Pure: no side effects, and the same baseline plus
//! the same working set always yields the same result set. Order is the
//! insertion order of the underlying store listing.

use crate::store::{ChangeKind, DocumentStore};
use indexmap::IndexMap;

/// Changed filenames per upstream document category.
#[derive(Debug, Default)]
pub struct ChangedDocuments {
    pub requirements: IndexMap<String, ChangeKind>,
    pub designs: IndexMap<String, ChangeKind>,
}

impl ChangedDocuments {
    /// True when neither category has changes.
    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty() && self.designs.is_empty()
    }
}

/// Snapshot the changed requirement and design files.
pub fn detect_changes(
    requirements: &dyn DocumentStore,
    designs: &dyn DocumentStore,
) -> ChangedDocuments {
    ChangedDocuments {
        requirements: requirements.changed_files(),
        designs: designs.changed_files(),
    }
}
