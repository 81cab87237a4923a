//! Filesystem-backed store.
//!
//! Documents are plain files under the category directory; filenames may
//! contain path separators. Change tracking hashes file contents at baseline
//! time and compares on demand, so the store needs no cooperation from
//! whatever mutates the directory.

use super::{ChangeKind, DocumentStore};
use crate::errors::StoreError;
use crate::schema::Document;
use async_trait::async_trait;
use indexmap::IndexMap;
use std::collections::BTreeSet;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use walkdir::WalkDir;

use super::memory::content_hash;

#[derive(Default)]
struct Baseline {
    hashes: HashMap<String, String>,
    order: Vec<String>,
}

/// Filesystem [`DocumentStore`] rooted at one category directory.
pub struct FsDocumentStore {
    dir: PathBuf,
    baseline: Mutex<Baseline>,
}

impl FsDocumentStore {
    /// Open (creating if needed) the category directory and snapshot its
    /// current contents as the baseline.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StoreError::SaveFailed {
            filename: dir.display().to_string(),
            source,
        })?;
        let store = Self {
            dir,
            baseline: Mutex::new(Baseline::default()),
        };
        store.mark_baseline();
        Ok(store)
    }

    /// Relative filename → content hash for every file under the category
    /// directory, in a stable traversal order.
    fn scan(&self) -> Vec<(String, String)> {
        let mut files = Vec::new();
        let walker = WalkDir::new(&self.dir).sort_by_file_name();
        for entry in walker.into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.dir) else {
                continue;
            };
            let name = relative.to_string_lossy().into_owned();
            match fs::read_to_string(entry.path()) {
                Ok(content) => files.push((name, content_hash(&content))),
                Err(err) => {
                    tracing::warn!("Skipping unreadable file {name}: {err}");
                }
            }
        }
        files
    }

    /// Resolve a filename to its on-disk path. Absolute filenames (as the
    /// scaffold pass produces) are used verbatim.
    fn resolve(&self, filename: &str) -> PathBuf {
        let path = Path::new(filename);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.dir.join(path)
        }
    }
}

#[async_trait]
impl DocumentStore for FsDocumentStore {
    async fn get(&self, filename: &str) -> Result<Option<Document>, StoreError> {
        let path = self.resolve(filename);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(
                Document::new(filename, &content).with_root(self.dir.clone()),
            )),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::ReadFailed {
                filename: filename.to_string(),
                source,
            }),
        }
    }

    async fn save(
        &self,
        filename: &str,
        content: &str,
        dependencies: &BTreeSet<String>,
    ) -> Result<Document, StoreError> {
        let path = self.resolve(filename);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| StoreError::SaveFailed {
                filename: filename.to_string(),
                source,
            })?;
        }
        fs::write(&path, content).map_err(|source| StoreError::SaveFailed {
            filename: filename.to_string(),
            source,
        })?;
        Ok(Document::new(filename, content)
            .with_root(self.dir.clone())
            .with_dependencies(dependencies.clone()))
    }

    fn changed_files(&self) -> IndexMap<String, ChangeKind> {
        let scan = self.scan();
        let baseline = self.baseline.lock().expect("baseline lock");
        let mut changed = IndexMap::new();
        let mut present = HashMap::new();
        for (name, hash) in scan {
            match baseline.hashes.get(&name) {
                None => {
                    changed.insert(name.clone(), ChangeKind::Added);
                }
                Some(old) if *old != hash => {
                    changed.insert(name.clone(), ChangeKind::Modified);
                }
                Some(_) => {}
            }
            present.insert(name, ());
        }
        for name in &baseline.order {
            if !present.contains_key(name) {
                changed.insert(name.clone(), ChangeKind::Deleted);
            }
        }
        changed
    }

    fn mark_baseline(&self) {
        let scan = self.scan();
        let mut baseline = self.baseline.lock().expect("baseline lock");
        baseline.order = scan.iter().map(|(name, _)| name.clone()).collect();
        baseline.hashes = scan.into_iter().collect();
    }

    fn all_files(&self) -> Vec<String> {
        self.scan().into_iter().map(|(name, _)| name).collect()
    }

    fn root(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn save_and_get_round_trip_with_nested_path() {
        let dir = tempdir().unwrap();
        let store = FsDocumentStore::new(dir.path().join("src")).unwrap();
        store
            .save("myapp/backend/server.js", "express()", &BTreeSet::new())
            .await
            .unwrap();
        let doc = store.get("myapp/backend/server.js").await.unwrap().unwrap();
        assert_eq!(doc.content, "express()");
        assert!(dir.path().join("src/myapp/backend/server.js").exists());
    }

    #[tokio::test]
    async fn get_absent_file_is_none() {
        let dir = tempdir().unwrap();
        let store = FsDocumentStore::new(dir.path().join("src")).unwrap();
        assert!(store.get("nope.js").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn changed_files_against_construction_baseline() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("kept.js"), "same").unwrap();
        fs::write(src.join("edited.js"), "v1").unwrap();
        fs::write(src.join("removed.js"), "bye").unwrap();

        let store = FsDocumentStore::new(&src).unwrap();
        fs::write(src.join("edited.js"), "v2").unwrap();
        fs::write(src.join("fresh.js"), "hi").unwrap();
        fs::remove_file(src.join("removed.js")).unwrap();

        let changed = store.changed_files();
        assert_eq!(changed.get("edited.js"), Some(&ChangeKind::Modified));
        assert_eq!(changed.get("fresh.js"), Some(&ChangeKind::Added));
        assert_eq!(changed.get("removed.js"), Some(&ChangeKind::Deleted));
        assert!(!changed.contains_key("kept.js"));
    }

    #[tokio::test]
    async fn mark_baseline_resets_change_tracking() {
        let dir = tempdir().unwrap();
        let store = FsDocumentStore::new(dir.path().join("src")).unwrap();
        store.save("a.js", "x", &BTreeSet::new()).await.unwrap();
        assert_eq!(store.changed_files().len(), 1);
        store.mark_baseline();
        assert!(store.changed_files().is_empty());
    }

    #[tokio::test]
    async fn absolute_filename_is_written_verbatim() {
        let dir = tempdir().unwrap();
        let store = FsDocumentStore::new(dir.path().join("src")).unwrap();
        let target = dir.path().join("elsewhere/package.json");
        store
            .save(&target.to_string_lossy(), "{}", &BTreeSet::new())
            .await
            .unwrap();
        assert!(target.exists());
    }

    #[tokio::test]
    async fn all_files_lists_relative_paths() {
        let dir = tempdir().unwrap();
        let store = FsDocumentStore::new(dir.path().join("src")).unwrap();
        store.save("a.js", "1", &BTreeSet::new()).await.unwrap();
        store
            .save("sub/b.js", "2", &BTreeSet::new())
            .await
            .unwrap();
        let files = store.all_files();
        assert!(files.contains(&"a.js".to_string()));
        assert!(files.contains(&"sub/b.js".to_string()));
    }
}
