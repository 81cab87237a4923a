//! Integration tests for the regeneration pipeline.
//!
//! These drive the public API end to end: change detection through design
//! synthesis, context assembly, generation, and the scaffold invariant pass.

mod common;

use common::{RecordingRenderer, ScriptedBackend, init_tracing};
use reweave::scaffold::DEFAULT_ROOT_MANIFEST;
use reweave::schema::{
    CALL_FLOW_KEY, DATA_STRUCTURES_KEY, REFINED_TASK_LIST_KEY, TASK_LIST_KEY,
};
use reweave::{
    AssemblyMode, CodeContextAssembler, CodeGenerator, CodingContext, CriticalFileEnsurer,
    DesignSynthesizer, Document, FsDocumentStore, GenerationInvoker, PipelineConfig,
    PipelineError, ProjectStores, RetryPolicy,
};
use std::collections::BTreeSet;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn fs_stores(dir: &TempDir) -> ProjectStores {
    ProjectStores::in_memory()
        .with_sources(Arc::new(FsDocumentStore::new(dir.path()).unwrap()))
}

fn config(dir: &TempDir) -> PipelineConfig {
    PipelineConfig::new(dir.path()).with_src_workspace(dir.path())
}

fn task_doc(filenames: &[&str]) -> Document {
    Document::new(
        "app.md",
        &serde_json::json!({ TASK_LIST_KEY: filenames }).to_string(),
    )
    .with_root("docs/tasks")
}

fn target(filename: &str, task: &Document) -> CodingContext {
    CodingContext::new(filename)
        .with_design_doc(Document::new("app.md", "design notes").with_root("docs/designs"))
        .with_task_doc(task.clone())
}

// =============================================================================
// Scaffold invariants
// =============================================================================

mod scaffold_invariants {
    use super::*;

    #[tokio::test]
    async fn nested_target_creates_project_root_and_sub_areas() {
        init_tracing();
        let dir = TempDir::new().unwrap();
        let stores = fs_stores(&dir);
        let backend = Arc::new(ScriptedBackend::new("```js\nconst app = 1;\n```"));
        let generator = CodeGenerator::new(backend, config(&dir));

        let task = task_doc(&["myapp/backend/server.js"]);
        let report = generator
            .run(&stores, vec![target("myapp/backend/server.js", &task)])
            .await;

        assert_eq!(report.generated, vec!["myapp/backend/server.js"]);
        assert!(dir.path().join("myapp/frontend").is_dir());
        assert!(dir.path().join("myapp/backend").is_dir());
        assert_eq!(
            fs::read_to_string(dir.path().join("myapp/package.json")).unwrap(),
            DEFAULT_ROOT_MANIFEST
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("myapp/backend/server.js")).unwrap(),
            "const app = 1;\n"
        );
        assert_eq!(
            report.scaffolded,
            vec![dir.path().join("myapp/package.json")]
        );
    }

    #[tokio::test]
    async fn bare_manifest_target_stays_at_workspace_root() {
        init_tracing();
        let dir = TempDir::new().unwrap();
        let stores = fs_stores(&dir);
        let backend = Arc::new(ScriptedBackend::new("```json\n{\"name\": \"generated\"}\n```"));
        let generator = CodeGenerator::new(backend, config(&dir));

        let task = task_doc(&["package.json"]);
        generator
            .run(&stores, vec![target("package.json", &task)])
            .await;

        assert!(!dir.path().join("frontend").exists());
        assert!(!dir.path().join("backend").exists());
        // The generated manifest replaces the scaffold default.
        assert_eq!(
            fs::read_to_string(dir.path().join("package.json")).unwrap(),
            "{\"name\": \"generated\"}\n"
        );
    }

    #[tokio::test]
    async fn ensure_is_idempotent_across_calls() {
        init_tracing();
        let dir = TempDir::new().unwrap();
        let store = FsDocumentStore::new(dir.path()).unwrap();
        let ctx = CodingContext::new("shop/frontend/App.js")
            .with_code_doc(Document::new("shop/frontend/App.js", "").with_root(dir.path()));

        let first = CriticalFileEnsurer::ensure(&ctx, &store).await;
        assert_eq!(first.len(), 1);
        let manifest = dir.path().join("shop/package.json");
        let before = fs::read_to_string(&manifest).unwrap();

        let second = CriticalFileEnsurer::ensure(&ctx, &store).await;
        assert!(second.is_empty());
        assert_eq!(fs::read_to_string(&manifest).unwrap(), before);
    }
}

// =============================================================================
// Incremental context assembly
// =============================================================================

mod incremental_assembly {
    use super::*;

    async fn seeded_stores() -> ProjectStores {
        let stores = ProjectStores::in_memory();
        for (name, content) in [("a.js", "current a"), ("b.js", "current b")] {
            stores
                .sources
                .save(name, content, &BTreeSet::new())
                .await
                .unwrap();
        }
        for (name, content) in [("b.js", "old b"), ("c.js", "old c")] {
            stores
                .prior_sources
                .save(name, content, &BTreeSet::new())
                .await
                .unwrap();
        }
        stores
    }

    #[tokio::test]
    async fn union_assembly_marks_rewrite_target_first() {
        init_tracing();
        let stores = seeded_stores().await;
        let task = Document::new(
            "app.md",
            &serde_json::json!({ REFINED_TASK_LIST_KEY: ["a.js", "b.js"] }).to_string(),
        );

        let out = CodeContextAssembler::new("main.py")
            .assemble(&stores, Some(&task), "b.js", AssemblyMode::Incremental)
            .await
            .unwrap();

        assert!(out.starts_with("-----Now, b.js to be rewritten\n```old b```\n====="));
        assert!(out.contains("----- a.js\n```current a```"));
        assert!(out.contains("----- c.js\n```old c```"));
        let marker = out.find("to be rewritten").unwrap();
        assert!(marker < out.find("----- a.js").unwrap());
        assert!(marker < out.find("----- c.js").unwrap());
    }

    #[tokio::test]
    async fn incremental_pipeline_feeds_marker_first_prompt() {
        init_tracing();
        let dir = TempDir::new().unwrap();
        let stores = seeded_stores().await;
        let backend = Arc::new(ScriptedBackend::new("```js\nrewritten b\n```"));
        let generator = CodeGenerator::new(
            backend.clone(),
            config(&dir).with_incremental(true).with_src_workspace(""),
        );

        let task = Document::new(
            "app.md",
            &serde_json::json!({ REFINED_TASK_LIST_KEY: ["a.js", "b.js"] }).to_string(),
        )
        .with_root("docs/tasks");
        let report = generator
            .run(&stores, vec![target("b.js", &task)])
            .await;

        assert_eq!(report.generated, vec!["b.js"]);
        let prompt = &backend.prompts()[0];
        let marker = prompt.find("-----Now, b.js to be rewritten").unwrap();
        assert!(marker < prompt.find("----- a.js").unwrap());

        let saved = stores.sources.get("b.js").await.unwrap().unwrap();
        assert_eq!(saved.content, "rewritten b\n");
    }

    #[tokio::test]
    async fn entry_point_is_regenerated_without_legacy_content() {
        init_tracing();
        let stores = ProjectStores::in_memory();
        stores
            .prior_sources
            .save("main.py", "old entry", &BTreeSet::new())
            .await
            .unwrap();
        let task = Document::new(
            "app.md",
            &serde_json::json!({ REFINED_TASK_LIST_KEY: ["main.py"] }).to_string(),
        );

        let out = CodeContextAssembler::new("main.py")
            .assemble(&stores, Some(&task), "main.py", AssemblyMode::Incremental)
            .await
            .unwrap();

        assert_eq!(out, "");
    }
}

// =============================================================================
// Retry behavior
// =============================================================================

mod retry_behavior {
    use super::*;

    #[tokio::test]
    async fn result_of_the_sixth_attempt_is_returned() {
        init_tracing();
        let backend = Arc::new(ScriptedBackend::failing(5, "```\nfinally\n```"));
        let invoker = GenerationInvoker::with_policy(backend.clone(), RetryPolicy::immediate(6));

        let code = invoker.invoke("prompt").await.unwrap();
        assert_eq!(code, "finally\n");
        assert_eq!(backend.attempts(), 6);
    }

    #[tokio::test]
    async fn six_consecutive_failures_propagate() {
        init_tracing();
        let backend = Arc::new(ScriptedBackend::failing(6, "unreachable"));
        let invoker = GenerationInvoker::with_policy(backend.clone(), RetryPolicy::immediate(6));

        let err = invoker.invoke("prompt").await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::RetriesExhausted { attempts: 6, .. }
        ));
        assert_eq!(backend.attempts(), 6);
    }

    #[tokio::test]
    async fn exhausted_file_is_downgraded_and_batch_continues() {
        init_tracing();
        let dir = TempDir::new().unwrap();
        let stores = fs_stores(&dir);
        let backend = Arc::new(ScriptedBackend::failing(u32::MAX, ""));
        let generator = CodeGenerator::with_retry_policy(
            backend,
            RetryPolicy::immediate(6),
            config(&dir).with_src_workspace(""),
        );

        let task = task_doc(&["a.js", "b.js"]);
        let report = generator
            .run(
                &stores,
                vec![target("a.js", &task), target("b.js", &task)],
            )
            .await;

        assert_eq!(report.failed, vec!["a.js", "b.js"]);
        assert!(report.generated.is_empty());
        // Both files exist as empty-content documents; nothing aborted.
        assert_eq!(stores.sources.get("a.js").await.unwrap().unwrap().content, "");
        assert_eq!(stores.sources.get("b.js").await.unwrap().unwrap().content, "");
    }
}

// =============================================================================
// Regeneration flow: requirements -> designs -> code
// =============================================================================

mod regeneration_flow {
    use super::*;

    #[tokio::test]
    async fn changed_requirement_flows_to_design_diagrams_and_code() {
        init_tracing();
        let dir = TempDir::new().unwrap();
        let payload = serde_json::json!({
            DATA_STRUCTURES_KEY: "classDiagram\n  class Server",
            CALL_FLOW_KEY: "sequenceDiagram\n  A->>B: hi",
        });
        let backend = Arc::new(
            ScriptedBackend::new("```js\nconst server = 1;\n```").with_payload(payload.clone()),
        );
        let renderer = Arc::new(RecordingRenderer::default());
        let stores = fs_stores(&dir);
        stores.requirements.mark_baseline();
        stores.designs.mark_baseline();

        // A requirement appears after the baseline.
        stores
            .requirements
            .save("app.md", "build a shop", &BTreeSet::new())
            .await
            .unwrap();

        let synthesizer =
            DesignSynthesizer::new(backend.clone(), renderer.clone(), config(&dir));
        let updated = synthesizer.run(&stores).await;
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].filename, "app.md");
        assert_eq!(
            updated[0].dependencies,
            BTreeSet::from(["docs/requirements/app.md".to_string()])
        );

        // Both diagram artifacts were handed to the renderer under the
        // fixed sub-directories.
        let calls = renderer.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[0].2,
            dir.path().join("resources/class-view/app")
        );
        assert_eq!(
            calls[1].2,
            dir.path().join("resources/sequence-flow/app")
        );
        drop(calls);

        // The design document feeds the code generation prompt.
        let design = stores.designs.get("app.md").await.unwrap().unwrap();
        let task = task_doc(&["server.js"]);
        let generator = CodeGenerator::new(backend.clone(), config(&dir));
        let ctx = CodingContext::new("server.js")
            .with_design_doc(design.clone())
            .with_task_doc(task);
        let report = generator.run(&stores, vec![ctx]).await;

        assert_eq!(report.generated, vec!["server.js"]);
        let prompt = backend.prompts().pop().unwrap();
        assert!(prompt.contains(&design.content));

        let saved = stores.sources.get("server.js").await.unwrap().unwrap();
        assert_eq!(saved.content, "const server = 1;\n");
        assert!(
            saved
                .dependencies
                .contains("docs/designs/app.md")
        );
    }

    #[tokio::test]
    async fn refine_preserves_design_identity() {
        init_tracing();
        let dir = TempDir::new().unwrap();
        let payload = serde_json::json!({"Refined Implementation Approach": "v2"});
        let backend = Arc::new(ScriptedBackend::new("").with_payload(payload.clone()));
        let renderer = Arc::new(RecordingRenderer::default());
        let stores = ProjectStores::in_memory();
        stores
            .designs
            .save("app.md", "{\"Implementation approach\": \"v1\"}", &BTreeSet::new())
            .await
            .unwrap();
        stores.requirements.mark_baseline();
        stores.designs.mark_baseline();
        stores
            .requirements
            .save("app.md", "changed requirement", &BTreeSet::new())
            .await
            .unwrap();

        let synthesizer = DesignSynthesizer::new(backend, renderer, config(&dir));
        let updated = synthesizer.run(&stores).await;

        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].filename, "app.md");
        let stored = stores.designs.get("app.md").await.unwrap().unwrap();
        assert_eq!(stored.content, payload.to_string());
        assert_eq!(stores.designs.all_files(), vec!["app.md"]);
    }
}
