//! In-memory reference store.
//!
//! Holds documents in insertion order and tracks changes against a baseline
//! of content hashes. `mark_baseline` snapshots the current state; until the
//! next call, `changed_files` reports everything added, rewritten, or
//! removed since.

use super::{ChangeKind, DocumentStore};
use crate::errors::StoreError;
use crate::schema::Document;
use async_trait::async_trait;
use indexmap::IndexMap;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub(crate) fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Default)]
struct Inner {
    docs: IndexMap<String, Document>,
    baseline: HashMap<String, String>,
    baseline_order: Vec<String>,
}

/// In-memory [`DocumentStore`] with content-hash baselines.
pub struct MemoryDocumentStore {
    root: PathBuf,
    inner: Mutex<Inner>,
}

impl MemoryDocumentStore {
    /// Create an empty store for a category rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Insert a document directly, bypassing provenance recording. Intended
    /// for seeding fixtures and baselines.
    pub fn seed(&self, filename: &str, content: &str) {
        let mut inner = self.inner.lock().expect("store lock");
        let doc = Document::new(filename, content).with_root(self.root.clone());
        inner.docs.insert(filename.to_string(), doc);
    }

}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, filename: &str) -> Result<Option<Document>, StoreError> {
        let inner = self.inner.lock().expect("store lock");
        Ok(inner.docs.get(filename).cloned())
    }

    async fn save(
        &self,
        filename: &str,
        content: &str,
        dependencies: &BTreeSet<String>,
    ) -> Result<Document, StoreError> {
        let doc = Document::new(filename, content)
            .with_root(self.root.clone())
            .with_dependencies(dependencies.clone());
        let mut inner = self.inner.lock().expect("store lock");
        inner.docs.insert(filename.to_string(), doc.clone());
        Ok(doc)
    }

    fn changed_files(&self) -> IndexMap<String, ChangeKind> {
        let inner = self.inner.lock().expect("store lock");
        let mut changed = IndexMap::new();
        for (name, doc) in &inner.docs {
            match inner.baseline.get(name) {
                None => {
                    changed.insert(name.clone(), ChangeKind::Added);
                }
                Some(hash) if *hash != content_hash(&doc.content) => {
                    changed.insert(name.clone(), ChangeKind::Modified);
                }
                Some(_) => {}
            }
        }
        for name in &inner.baseline_order {
            if !inner.docs.contains_key(name) {
                changed.insert(name.clone(), ChangeKind::Deleted);
            }
        }
        changed
    }

    fn mark_baseline(&self) {
        let mut inner = self.inner.lock().expect("store lock");
        let hashes: HashMap<String, String> = inner
            .docs
            .iter()
            .map(|(name, doc)| (name.clone(), content_hash(&doc.content)))
            .collect();
        let order: Vec<String> = inner.docs.keys().cloned().collect();
        inner.baseline = hashes;
        inner.baseline_order = order;
    }

    fn all_files(&self) -> Vec<String> {
        let inner = self.inner.lock().expect("store lock");
        inner.docs.keys().cloned().collect()
    }

    fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_returns_none_for_absent_document() {
        let store = MemoryDocumentStore::new("docs/requirements");
        assert!(store.get("missing.md").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_records_root_and_dependencies() {
        let store = MemoryDocumentStore::new("docs/designs");
        let deps = BTreeSet::from(["docs/requirements/app.md".to_string()]);
        let saved = store.save("app.md", "design", &deps).await.unwrap();
        assert_eq!(saved.root_relative_path(), Path::new("docs/designs/app.md"));
        assert_eq!(saved.dependencies, deps);
        let fetched = store.get("app.md").await.unwrap().unwrap();
        assert_eq!(fetched, saved);
    }

    #[tokio::test]
    async fn changed_files_reports_added_modified_deleted() {
        let store = MemoryDocumentStore::new("src");
        store.seed("a.js", "one");
        store.seed("b.js", "two");
        store.mark_baseline();

        store.seed("a.js", "one-changed");
        store.seed("c.js", "three");
        {
            let mut inner = store.inner.lock().unwrap();
            inner.docs.shift_remove("b.js");
        }

        let changed = store.changed_files();
        assert_eq!(changed.get("a.js"), Some(&ChangeKind::Modified));
        assert_eq!(changed.get("c.js"), Some(&ChangeKind::Added));
        assert_eq!(changed.get("b.js"), Some(&ChangeKind::Deleted));
    }

    #[tokio::test]
    async fn changed_files_empty_after_mark_baseline() {
        let store = MemoryDocumentStore::new("src");
        store.seed("a.js", "one");
        store.mark_baseline();
        assert!(store.changed_files().is_empty());
    }

    #[tokio::test]
    async fn changed_files_preserves_insertion_order() {
        let store = MemoryDocumentStore::new("src");
        store.mark_baseline();
        store.seed("z.js", "1");
        store.seed("a.js", "2");
        store.seed("m.js", "3");
        let order: Vec<String> = store.changed_files().keys().cloned().collect();
        assert_eq!(order, vec!["z.js", "a.js", "m.js"]);
    }

    #[tokio::test]
    async fn unchanged_resave_is_not_reported() {
        let store = MemoryDocumentStore::new("src");
        store.seed("a.js", "same");
        store.mark_baseline();
        store.save("a.js", "same", &BTreeSet::new()).await.unwrap();
        assert!(store.changed_files().is_empty());
    }

    #[test]
    fn content_hash_is_stable_and_content_sensitive() {
        assert_eq!(content_hash("x"), content_hash("x"));
        assert_ne!(content_hash("x"), content_hash("y"));
    }
}
