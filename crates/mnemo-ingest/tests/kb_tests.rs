// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Knowledge base lifecycle against a real on-disk store.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mnemo_config::model::{ChunkingConfig, IndexConfig, MemoryConfig};
use mnemo_core::{
    AdapterType, ChatMessage, Chunk, HealthStatus, MnemoError, ModelAdapter, ModelOptions, ModelResponse,
    ModelStream, PluginAdapter,
};
use mnemo_ingest::{
    document_chunker, ExportFormat, IngestionPipeline, KnowledgeBaseManager, SegmentBasis,
};
use mnemo_index::VectorIndex;
use mnemo_storage::Database;
use tempfile::TempDir;

struct Fixture {
    dir: TempDir,
    index: VectorIndex,
    kb: KnowledgeBaseManager,
}

async fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("mnemo.db");
    let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
    let index = mnemo_index::open(&db, &IndexConfig::default()).unwrap();
    let pipeline = IngestionPipeline::new(
        index.clone(),
        document_chunker(&ChunkingConfig::default()),
    );
    let kb = KnowledgeBaseManager::new(
        dir.path().join("kb"),
        pipeline,
        MemoryConfig::default().namespace,
    );
    Fixture { dir, index, kb }
}

fn survey() -> String {
    (1..=12)
        .map(|i| format!("第{i}节：量子计算研究进展，涉及量子比特、纠错与算法的第{i}个方面。"))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Records the prompt and answers with a fixed string.
#[derive(Default)]
struct CannedModel {
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl PluginAdapter for CannedModel {
    fn name(&self) -> &str {
        "canned"
    }
    fn version(&self) -> semver::Version {
        semver::Version::new(0, 0, 0)
    }
    fn adapter_type(&self) -> AdapterType {
        AdapterType::Model
    }
    async fn health_check(&self) -> Result<HealthStatus, MnemoError> {
        Ok(HealthStatus::Healthy)
    }
    async fn shutdown(&self) -> Result<(), MnemoError> {
        Ok(())
    }
}

#[async_trait]
impl ModelAdapter for CannedModel {
    async fn complete(&self, messages: Vec<ChatMessage>, _: ModelOptions) -> Result<ModelResponse, MnemoError> {
        let prompt = messages.into_iter().map(|m| m.content).collect::<String>();
        self.prompts.lock().unwrap().push(prompt);
        Ok(ModelResponse {
            content: "量子纠错是关键。".into(),
            model: "canned".into(),
            finish_reason: Some("stop".into()),
            usage: None,
        })
    }

    async fn stream(&self, _: Vec<ChatMessage>, _: ModelOptions) -> Result<ModelStream, MnemoError> {
        Err(MnemoError::model("streaming not scripted"))
    }
}

#[tokio::test]
async fn create_upload_list_and_status() {
    let f = fixture().await;
    f.kb.create("research").await.unwrap();
    let report = f.kb.upload("research", "survey.md", survey().as_bytes()).await.unwrap();
    assert!(report.chunks >= 1);

    let kbs = f.kb.list().await.unwrap();
    assert_eq!(kbs.len(), 1);
    assert_eq!(kbs[0].name, "research");
    assert_eq!(kbs[0].documents, 1);
    assert_eq!(kbs[0].chunks, report.chunks);
    assert_eq!(kbs[0].size, survey().len() as u64);

    let status = f.kb.status("research").await.unwrap();
    assert!(status.exists);
    assert_eq!(status.chunks, report.chunks);
    assert!(!f.kb.status("missing").await.unwrap().exists);

    let docs = f.kb.list_documents("research").await.unwrap();
    assert_eq!(docs[0].file_name, "survey.md");
    assert_eq!(docs[0].chunks, report.chunks);
}

#[tokio::test]
async fn create_rejects_bad_and_duplicate_names() {
    let f = fixture().await;
    assert!(matches!(f.kb.create("a/b").await, Err(MnemoError::InvalidInput(_))));
    f.kb.create("docs").await.unwrap();
    assert!(matches!(f.kb.create("docs").await, Err(MnemoError::InvalidInput(_))));
}

#[tokio::test]
async fn uploading_to_unknown_kb_is_not_found() {
    let f = fixture().await;
    let err = f.kb.upload("ghost", "a.txt", b"hello").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn unsupported_upload_is_saved_with_zero_chunks() {
    let f = fixture().await;
    f.kb.create("kb").await.unwrap();
    let report = f.kb.upload("kb", "scan.pdf", b"%PDF-1.7 binary").await.unwrap();
    assert_eq!(report.chunks, 0);
    assert_eq!(f.kb.list_documents("kb").await.unwrap().len(), 1);
}

#[tokio::test]
async fn reupload_replaces_previous_chunks() {
    let f = fixture().await;
    f.kb.create("kb").await.unwrap();
    let first = f.kb.upload("kb", "a.txt", survey().as_bytes()).await.unwrap();
    let second = f.kb.upload("kb", "a.txt", survey().as_bytes()).await.unwrap();
    assert_eq!(first.chunks, second.chunks);
    assert_eq!(f.kb.status("kb").await.unwrap().chunks, second.chunks);
}

#[tokio::test]
async fn rename_moves_files_and_vectors() {
    let f = fixture().await;
    f.kb.create("old").await.unwrap();
    f.kb.create("taken").await.unwrap();
    let report = f.kb.upload("old", "a.txt", survey().as_bytes()).await.unwrap();

    assert!(matches!(f.kb.rename("old", "taken").await, Err(MnemoError::InvalidInput(_))));
    assert!(f.kb.rename("nope", "other").await.unwrap_err().is_not_found());

    f.kb.rename("old", "new").await.unwrap();
    assert!(!f.kb.exists("old").await);
    let status = f.kb.status("new").await.unwrap();
    assert_eq!((status.documents, status.chunks), (1, report.chunks));
}

#[tokio::test]
async fn delete_document_keeps_or_removes_file() {
    let f = fixture().await;
    f.kb.create("kb").await.unwrap();
    f.kb.upload("kb", "a.txt", "甲乙丙".as_bytes()).await.unwrap();
    f.kb.upload("kb", "b.txt", "丁戊己".as_bytes()).await.unwrap();

    let kept = f.kb.delete_document("kb", "a.txt", true).await.unwrap();
    assert_eq!((kept.removed_vectors, kept.removed_file), (1, false));
    assert_eq!(f.kb.list_documents("kb").await.unwrap().len(), 2);

    let gone = f.kb.delete_document("kb", "b.txt", false).await.unwrap();
    assert!(gone.removed_file);
    let docs = f.kb.list_documents("kb").await.unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].chunks, 0);
}

#[tokio::test]
async fn rebuild_restores_chunks_from_files_and_skips_unreadable() {
    let f = fixture().await;
    f.kb.create("kb").await.unwrap();
    let a = f.kb.upload("kb", "a.txt", survey().as_bytes()).await.unwrap();
    f.kb.upload("kb", "b.bin", &[0u8, 1, 2]).await.unwrap();
    f.kb.delete_document("kb", "a.txt", true).await.unwrap();
    assert_eq!(f.kb.status("kb").await.unwrap().chunks, 0);

    let report = f.kb.rebuild("kb").await.unwrap();
    assert_eq!((report.files, report.skipped), (1, 1));
    assert_eq!(report.chunks, a.chunks);
    assert_eq!(f.kb.status("kb").await.unwrap().chunks, a.chunks);
}

#[tokio::test]
async fn delete_kb_removes_everything() {
    let f = fixture().await;
    f.kb.create("kb").await.unwrap();
    f.kb.upload("kb", "a.txt", survey().as_bytes()).await.unwrap();
    f.kb.delete("kb").await.unwrap();
    assert!(f.kb.list().await.unwrap().is_empty());
    assert_eq!(f.kb.pipeline().index().count("kb").await.unwrap(), 0);
    assert!(f.kb.delete("kb").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn preview_segments_and_export() {
    let f = fixture().await;
    f.kb.create("kb").await.unwrap();
    f.kb.upload("kb", "notes.md", survey().as_bytes()).await.unwrap();

    let preview = f.kb.preview("kb", "notes.md", 10).await.unwrap();
    assert_eq!(preview.preview.chars().count(), 10);
    assert_eq!(preview.meta.paragraphs, 12);
    assert!(!preview.meta.has_tables);

    let page = f.kb.segments("kb", "notes.md", 2, 5, SegmentBasis::Auto).await.unwrap();
    assert_eq!((page.page, page.pages, page.total), (2, 3, 12));
    assert!(page.items[0].starts_with("第6节"));

    let md = f.kb.export("kb", "notes.md", ExportFormat::Md).await.unwrap();
    assert!(md.starts_with("# notes.md\n\n第1节"));
    let txt = f.kb.export("kb", "notes.md", ExportFormat::Txt).await.unwrap();
    assert_eq!(txt, survey());

    assert!(f.kb.preview("kb", "missing.md", 10).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn query_grounds_the_prompt_in_retrieved_chunks() {
    let f = fixture().await;
    f.kb.create("research").await.unwrap();
    f.kb.upload("research", "survey.md", survey().as_bytes()).await.unwrap();

    let model = Arc::new(CannedModel::default());
    let answer = f.kb.query(model.as_ref(), "research", "量子纠错", 2).await.unwrap();
    assert_eq!(answer.answer, "量子纠错是关键。");
    assert!(!answer.sources.is_empty());
    assert!(answer.sources.iter().all(|s| s.metadata.namespace == "research"));

    let prompts = model.prompts.lock().unwrap();
    assert!(prompts[0].contains("问题：量子纠错"));
    assert!(prompts[0].contains(&answer.sources[0].content));
}

#[tokio::test]
async fn internal_namespaces_are_not_knowledge_bases() {
    let f = fixture().await;
    f.index
        .upsert("long_term", vec![Chunk::new("用户喜欢量子计算", "long_term", "c1")])
        .await
        .unwrap();

    for name in ["long_term", "ltm_c1", "conv_c1"] {
        assert!(
            matches!(f.kb.create(name).await, Err(MnemoError::InvalidInput(_))),
            "{name} accepted"
        );
    }

    // A stray directory under the root does not expose the namespace either.
    std::fs::create_dir_all(f.kb.root().join("long_term")).unwrap();
    assert!(f.kb.list().await.unwrap().is_empty());
    let status = f.kb.status("long_term").await.unwrap();
    assert_eq!((status.exists, status.chunks), (false, 0));
    assert!(f.kb.rebuild("long_term").await.unwrap_err().is_not_found());
    assert!(f.kb.delete("long_term").await.unwrap_err().is_not_found());

    assert_eq!(f.index.count("long_term").await.unwrap(), 1);
}

#[tokio::test]
async fn renaming_onto_an_existing_namespace_is_rejected() {
    let f = fixture().await;
    f.kb.create("old").await.unwrap();
    let report = f.kb.upload("old", "a.txt", survey().as_bytes()).await.unwrap();
    f.index
        .upsert("orphan", vec![Chunk::new("遗留数据", "orphan", "x.txt")])
        .await
        .unwrap();
    f.index
        .upsert("long_term", vec![Chunk::new("记忆", "long_term", "c1")])
        .await
        .unwrap();

    for target in ["orphan", "long_term", "ltm_c1", "conv_c1"] {
        assert!(
            matches!(f.kb.rename("old", target).await, Err(MnemoError::InvalidInput(_))),
            "rename onto {target} accepted"
        );
    }

    assert!(f.kb.exists("old").await);
    assert_eq!(f.kb.status("old").await.unwrap().chunks, report.chunks);
    assert_eq!(f.index.count("orphan").await.unwrap(), 1);
    assert_eq!(f.index.count("long_term").await.unwrap(), 1);
}

#[tokio::test]
async fn ingest_existing_copies_the_file_in() {
    let f = fixture().await;
    f.kb.create("research").await.unwrap();
    let source = f.dir.path().join("survey.md");
    std::fs::write(&source, survey()).unwrap();

    let report = f.kb.ingest_existing("research", &source).await.unwrap();
    assert_eq!(report.file_name, "survey.md");
    assert_eq!(report.size, survey().len() as u64);
    assert!(report.chunks >= 1);

    assert!(source.exists());
    let copy = f.kb.root().join("research").join("survey.md");
    assert_eq!(std::fs::read_to_string(copy).unwrap(), survey());
    assert_eq!(f.kb.status("research").await.unwrap().chunks, report.chunks);
}

#[tokio::test]
async fn ingest_existing_reports_a_missing_file() {
    let f = fixture().await;
    f.kb.create("research").await.unwrap();
    let missing = f.dir.path().join("nope.txt");

    let err = f.kb.ingest_existing("research", &missing).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().starts_with("file not found"));
    assert!(f.kb.list_documents("research").await.unwrap().is_empty());

    std::fs::write(&missing, "内容").unwrap();
    let err = f.kb.ingest_existing("ghost", &missing).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn summarize_and_export_summary() {
    let f = fixture().await;
    f.kb.create("research").await.unwrap();
    f.kb.upload("research", "survey.md", survey().as_bytes()).await.unwrap();
    let model = CannedModel::default();

    let summary = f.kb.summarize(&model, "research", "survey.md").await.unwrap();
    assert_eq!(summary.statistics.paragraph_count, 12);
    assert_eq!(summary.statistics.character_count, survey().chars().count());
    assert!(summary.keywords.iter().any(|k| k.word == "量子"));
    assert!(summary.summaries.summary_100.starts_with("第1节"));
    assert!(summary.summaries.summary_100.chars().count() <= 100 + 12);
    assert_eq!(summary.summaries.llm_summary.as_deref(), Some("量子纠错是关键。"));
    assert!(model.prompts.lock().unwrap()[0].contains("第1节"));

    let md = f
        .kb
        .export_summary(&model, "research", "survey.md", ExportFormat::Md)
        .await
        .unwrap();
    assert!(md.starts_with("# 文档摘要 - survey.md\n字数: "));
    assert!(md.contains("【100字摘要】"));
    assert!(md.ends_with("【LLM摘要】\n量子纠错是关键。"));

    let err = f.kb.summarize(&model, "research", "missing.md").await.unwrap_err();
    assert!(err.is_not_found());
}
