// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `mnemo ingest` and `mnemo kb` command implementations.

use std::path::Path;

use mnemo_config::model::MnemoConfig;
use mnemo_core::MnemoError;
use mnemo_ingest::{IngestionPipeline, KnowledgeBaseManager, document_chunker};
use mnemo_storage::Database;

/// Opens the database and the knowledge base directory named by `config`.
async fn open_manager(config: &MnemoConfig) -> Result<KnowledgeBaseManager, MnemoError> {
    crate::serve::init_tracing(&config.agent.log_level);
    let database = Database::open(&config.storage.database_path).await?;
    let index = mnemo_index::open(&database, &config.index)?;
    let pipeline = IngestionPipeline::new(index, document_chunker(&config.chunking));
    Ok(KnowledgeBaseManager::new(
        &config.knowledge.root_dir,
        pipeline,
        &config.memory.namespace,
    ))
}

/// Copy `path` into knowledge base `kb` and index it. The KB is created when missing.
pub async fn run_ingest(config: &MnemoConfig, kb: &str, path: &Path) -> Result<(), MnemoError> {
    let manager = open_manager(config).await?;
    if !manager.exists(kb).await {
        manager.create(kb).await?;
        println!("created knowledge base {kb}");
    }
    let report = manager.ingest_existing(kb, path).await?;
    println!(
        "ingested {} into {}: {} chunks ({} bytes)",
        report.file_name, report.kb, report.chunks, report.size
    );
    Ok(())
}

pub async fn run_list(config: &MnemoConfig) -> Result<(), MnemoError> {
    let manager = open_manager(config).await?;
    let kbs = manager.list().await?;
    if kbs.is_empty() {
        println!("no knowledge bases under {}", manager.root().display());
        return Ok(());
    }
    println!("{:<24} {:>9} {:>8} {:>12}", "NAME", "DOCUMENTS", "CHUNKS", "BYTES");
    for kb in kbs {
        println!(
            "{:<24} {:>9} {:>8} {:>12}",
            kb.name, kb.documents, kb.chunks, kb.size
        );
    }
    Ok(())
}

pub async fn run_create(config: &MnemoConfig, name: &str) -> Result<(), MnemoError> {
    open_manager(config).await?.create(name).await?;
    println!("created knowledge base {name}");
    Ok(())
}

pub async fn run_delete(config: &MnemoConfig, name: &str) -> Result<(), MnemoError> {
    open_manager(config).await?.delete(name).await?;
    println!("deleted knowledge base {name}");
    Ok(())
}

pub async fn run_rebuild(config: &MnemoConfig, name: &str) -> Result<(), MnemoError> {
    let report = open_manager(config).await?.rebuild(name).await?;
    println!(
        "rebuilt {}: {} files, {} skipped, {} chunks",
        report.kb, report.files, report.skipped, report.chunks
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config(dir: &Path) -> MnemoConfig {
        let mut config = MnemoConfig::default();
        config.storage.database_path = dir.join("mnemo.db").to_string_lossy().into_owned();
        config.knowledge.root_dir = dir.join("kb").to_string_lossy().into_owned();
        config
    }

    #[tokio::test]
    async fn ingest_creates_missing_kb() {
        let dir = tempfile::tempdir().unwrap();
        let config = temp_config(dir.path());
        let source = dir.path().join("notes.md");
        std::fs::write(&source, "# Notes\n\nRust ownership rules.\n\nBorrowing.").unwrap();

        run_ingest(&config, "notes", &source).await.unwrap();

        let manager = open_manager(&config).await.unwrap();
        let status = manager.status("notes").await.unwrap();
        assert!(status.exists);
        assert_eq!(status.documents, 1);
        assert!(status.chunks > 0);
    }

    #[tokio::test]
    async fn ingest_refuses_the_memory_namespace() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = temp_config(dir.path());
        config.memory.namespace = "memories".to_string();
        let source = dir.path().join("notes.md");
        std::fs::write(&source, "Borrowing.").unwrap();

        let err = run_ingest(&config, "memories", &source).await.unwrap_err();
        assert!(matches!(err, MnemoError::InvalidInput(_)));
        assert!(!dir.path().join("kb").join("memories").exists());
    }

    #[tokio::test]
    async fn delete_unknown_kb_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = temp_config(dir.path());
        let err = run_delete(&config, "ghost").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
