//! Post-generation invariant pass: mandatory scaffold files must exist.
//!
//! Whatever the backend produced, the generated project needs its root
//! manifest and both sub-area directories to be structurally valid. This
//! pass is idempotent and strictly write-if-absent: an existing file is
//! never overwritten, stale or not.

use crate::schema::{CodingContext, MANIFEST_FILENAME, first_path_segment};
use crate::store::DocumentStore;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// The two sub-areas every generated project is split into.
pub const SUB_AREAS: [&str; 2] = ["frontend", "backend"];

/// Default root manifest, written when no better information exists. The
/// exact content is part of the external contract.
pub const DEFAULT_ROOT_MANIFEST: &str = r#"{
  "name": "project",
  "version": "1.0.0",
  "description": "A full-stack application",
  "scripts": {
    "start": "concurrently \"npm run start:frontend\" \"npm run start:backend\"",
    "start:frontend": "cd frontend && react-scripts start",
    "start:backend": "cd backend && node server.js",
    "build": "cd frontend && react-scripts build",
    "test": "cd frontend && react-scripts test",
    "eject": "cd frontend && react-scripts eject"
  },
  "dependencies": {
    "concurrently": "^7.6.0"
  },
  "frontend": {
    "dependencies": {
      "react": "^18.2.0",
      "react-dom": "^18.2.0",
      "react-scripts": "5.0.1"
    }
  },
  "backend": {
    "dependencies": {
      "express": "^4.18.2",
      "cors": "^2.8.5",
      "body-parser": "^1.20.1"
    }
  },
  "browserslist": {
    "production": [
      ">0.2%",
      "not dead",
      "not op_mini all"
    ],
    "development": [
      "last 1 chrome version",
      "last 1 firefox version",
      "last 1 safari version"
    ]
  }
}"#;

/// A file whose existence is mandatory for the generated project.
#[derive(Debug, Clone, Copy)]
pub struct CriticalFileSpec {
    pub relative_path: &'static str,
    pub default_content: &'static str,
}

/// The fixed table of mandatory scaffold files: a single project-root
/// manifest enumerating both sub-area dependency sets.
pub const CRITICAL_FILES: &[CriticalFileSpec] = &[CriticalFileSpec {
    relative_path: MANIFEST_FILENAME,
    default_content: DEFAULT_ROOT_MANIFEST,
}];

/// Ensures mandatory scaffold files exist at the inferred project root.
pub struct CriticalFileEnsurer;

impl CriticalFileEnsurer {
    /// Infer the project root for a target filename. A leading path segment
    /// that is not a sub-area name or the manifest itself is the project's
    /// own directory; otherwise the workspace root is the project root.
    pub fn infer_project_root(workspace: &Path, filename: &str) -> PathBuf {
        match first_path_segment(filename) {
            Some(segment)
                if !SUB_AREAS.contains(&segment) && segment != MANIFEST_FILENAME =>
            {
                workspace.join(segment)
            }
            _ => workspace.to_path_buf(),
        }
    }

    /// Guarantee every critical file exists under the inferred project root.
    ///
    /// Every failure in here is non-fatal and independently logged; the
    /// returned set holds exactly the paths actually created, even if
    /// partial.
    pub async fn ensure(
        context: &CodingContext,
        code_store: &dyn DocumentStore,
    ) -> BTreeSet<PathBuf> {
        let mut added = BTreeSet::new();
        let Some(code_doc) = &context.code_doc else {
            return added;
        };
        if code_doc.root_path.as_os_str().is_empty() {
            return added;
        }
        let workspace = code_doc.root_path.clone();
        info!("Ensuring critical files in workspace {}", workspace.display());

        let project_dir = Self::infer_project_root(&workspace, &context.filename);
        if project_dir != workspace {
            info!("Using project directory {}", project_dir.display());
            for sub_area in SUB_AREAS {
                let dir = project_dir.join(sub_area);
                if let Err(err) = fs::create_dir_all(&dir) {
                    error!("Failed to create {}: {err}", dir.display());
                }
            }
        }

        let dependencies = context.upstream_dependencies();
        for spec in CRITICAL_FILES {
            let full_path = project_dir.join(spec.relative_path);
            if let Some(parent) = full_path.parent() {
                if let Err(err) = fs::create_dir_all(parent) {
                    error!("Failed to create {}: {err}", parent.display());
                    continue;
                }
            }
            if full_path.exists() {
                continue;
            }
            match code_store
                .save(
                    &full_path.to_string_lossy(),
                    spec.default_content,
                    &dependencies,
                )
                .await
            {
                Ok(_) => {
                    info!("Created critical file {}", full_path.display());
                    added.insert(full_path);
                }
                Err(err) => {
                    error!("Failed to create critical file {}: {err}", full_path.display());
                    match fs::write(&full_path, spec.default_content) {
                        Ok(()) => {
                            info!("Created critical file (direct write) {}", full_path.display());
                            added.insert(full_path);
                        }
                        Err(err) => {
                            error!("Failed direct write for {}: {err}", full_path.display());
                        }
                    }
                }
            }
        }
        added
    }
}
