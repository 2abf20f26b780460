// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Knowledge base management.
//!
//! A knowledge base is a directory under the configured root holding the
//! uploaded source files, plus a vector namespace of the same name holding
//! their chunks. The directory is the source of truth for documents; the
//! namespace can always be rebuilt from it.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use mnemo_core::{ChatMessage, ChunkMetadata, ExtractedDocument, MnemoError, ModelAdapter, ModelOptions};
use mnemo_index::is_reserved_namespace;

use crate::pipeline::{IngestReport, IngestionPipeline};
use crate::summary::{self, DocumentSummary};

/// Characters that may not appear in knowledge base or document names.
pub const FORBIDDEN_NAME_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Characters of each source quoted back by [`KnowledgeBaseManager::query`].
const SOURCE_SNIPPET_CHARS: usize = 300;

const ANSWER_PROMPT: &str = "你是一个检索增强问答助手。请严格依据提供的知识片段回答问题。\n\
若无法从知识片段中得到答案，回复：\"根据现有知识无法回答该问题\"。\n\n\
上下文：\n{context}\n\n问题：{question}\n";

fn io_err(e: std::io::Error) -> MnemoError {
    MnemoError::Storage { source: Box::new(e) }
}

fn kb_not_found(name: &str) -> MnemoError {
    MnemoError::not_found("knowledge base", name)
}

/// Reject empty names, forbidden characters, and relative path components.
pub fn validate_name(kind: &str, name: &str) -> Result<(), MnemoError> {
    if name.trim().is_empty() {
        return Err(MnemoError::InvalidInput(format!("{kind} name must not be empty")));
    }
    if name.contains(FORBIDDEN_NAME_CHARS) || name == "." || name == ".." {
        return Err(MnemoError::InvalidInput(format!("invalid {kind} name: {name}")));
    }
    Ok(())
}

fn take_chars(text: &str, n: usize) -> String {
    text.chars().take(n).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KbSummary {
    pub name: String,
    pub documents: usize,
    pub chunks: usize,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KbStatus {
    pub name: String,
    pub exists: bool,
    pub documents: usize,
    pub chunks: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentInfo {
    pub file_name: String,
    pub size: u64,
    pub modified: Option<String>,
    pub chunks: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadReport {
    pub kb: String,
    pub file_name: String,
    pub size: u64,
    pub chunks: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteDocumentReport {
    pub kb: String,
    pub file_name: String,
    pub removed_file: bool,
    pub removed_vectors: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RebuildReport {
    pub kb: String,
    pub files: usize,
    pub skipped: usize,
    pub chunks: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewMeta {
    pub pages: usize,
    pub paragraphs: usize,
    pub slides: usize,
    pub has_tables: bool,
    pub total_length: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentPreview {
    pub kb: String,
    pub file_name: String,
    pub preview: String,
    pub meta: PreviewMeta,
}

/// Which structured section backs segment pagination.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::EnumString, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SegmentBasis {
    #[default]
    Auto,
    Pages,
    Paragraphs,
    Slides,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentPage {
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub pages: usize,
    pub items: Vec<String>,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::EnumString, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Txt,
    Md,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceSnippet {
    pub content: String,
    pub metadata: ChunkMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryAnswer {
    pub answer: String,
    pub sources: Vec<SourceSnippet>,
}

/// Split a document into the segments shown by the segment browser.
pub fn segments_of(doc: &ExtractedDocument, basis: SegmentBasis) -> Vec<String> {
    match basis {
        SegmentBasis::Pages => doc.pages.clone(),
        SegmentBasis::Paragraphs => doc.paragraphs.clone(),
        SegmentBasis::Slides => doc.slides.clone(),
        SegmentBasis::Auto => [&doc.pages, &doc.paragraphs, &doc.slides]
            .into_iter()
            .find(|s| !s.is_empty())
            .cloned()
            .unwrap_or_else(|| {
                doc.text()
                    .split("\n\n")
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            }),
    }
}

/// Slice `segments` into one page. `page` is 1-based and clamped into range.
pub fn paginate(segments: Vec<String>, page: usize, page_size: usize) -> SegmentPage {
    let page_size = page_size.max(1);
    let total = segments.len();
    let pages = if total == 0 { 1 } else { total.div_ceil(page_size) };
    let page = page.clamp(1, pages);
    let items = segments
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .collect();
    SegmentPage {
        page,
        page_size,
        total,
        pages,
        items,
    }
}

/// File-backed knowledge bases over the shared vector index.
#[derive(Clone)]
pub struct KnowledgeBaseManager {
    root: PathBuf,
    pipeline: IngestionPipeline,
    /// Shared long-term memory namespace; see [`is_reserved_namespace`].
    global_memory: String,
}

impl KnowledgeBaseManager {
    /// `global_memory` is the configured long-term memory namespace, which
    /// like every other internal namespace can never name a knowledge base.
    pub fn new(
        root: impl Into<PathBuf>,
        pipeline: IngestionPipeline,
        global_memory: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            pipeline,
            global_memory: global_memory.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn pipeline(&self) -> &IngestionPipeline {
        &self.pipeline
    }

    fn kb_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn is_reserved(&self, name: &str) -> bool {
        is_reserved_namespace(name, &self.global_memory)
    }

    /// [`validate_name`] plus the reserved namespaces.
    fn validate_kb_name(&self, name: &str) -> Result<(), MnemoError> {
        validate_name("knowledge base", name)?;
        if self.is_reserved(name) {
            return Err(MnemoError::InvalidInput(format!(
                "knowledge base name {name} is reserved"
            )));
        }
        Ok(())
    }

    pub async fn exists(&self, name: &str) -> bool {
        self.validate_kb_name(name).is_ok()
            && tokio::fs::metadata(self.kb_dir(name))
                .await
                .is_ok_and(|m| m.is_dir())
    }

    async fn require(&self, name: &str) -> Result<PathBuf, MnemoError> {
        validate_name("knowledge base", name)?;
        if !self.exists(name).await {
            return Err(kb_not_found(name));
        }
        Ok(self.kb_dir(name))
    }

    async fn require_document(&self, kb: &str, file_name: &str) -> Result<PathBuf, MnemoError> {
        let dir = self.require(kb).await?;
        validate_name("document", file_name)?;
        let path = dir.join(file_name);
        match tokio::fs::metadata(&path).await {
            Ok(m) if m.is_file() => Ok(path),
            _ => Err(MnemoError::not_found("document", format!("{kb}/{file_name}"))),
        }
    }

    /// Regular files directly inside a KB directory, sorted by name.
    async fn files(&self, dir: &Path) -> Result<Vec<(String, std::fs::Metadata)>, MnemoError> {
        let mut out = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await.map_err(io_err)?;
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let meta = entry.metadata().await.map_err(io_err)?;
            if !meta.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                out.push((name.to_string(), meta));
            }
        }
        out.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(out)
    }

    pub async fn list(&self) -> Result<Vec<KbSummary>, MnemoError> {
        let mut names = Vec::new();
        match tokio::fs::read_dir(&self.root).await {
            Ok(mut entries) => {
                while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
                    if entry.file_type().await.map_err(io_err)?.is_dir()
                        && let Some(name) = entry.file_name().to_str()
                        && !self.is_reserved(name)
                    {
                        names.push(name.to_string());
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_err(e)),
        }
        names.sort();

        let mut kbs = Vec::with_capacity(names.len());
        for name in names {
            let files = self.files(&self.kb_dir(&name)).await?;
            kbs.push(KbSummary {
                documents: files.len(),
                size: files.iter().map(|(_, m)| m.len()).sum(),
                chunks: self.pipeline.index().count(&name).await?,
                name,
            });
        }
        Ok(kbs)
    }

    pub async fn create(&self, name: &str) -> Result<(), MnemoError> {
        self.validate_kb_name(name)?;
        if self.exists(name).await {
            return Err(MnemoError::InvalidInput(format!("knowledge base {name} already exists")));
        }
        tokio::fs::create_dir_all(self.kb_dir(name)).await.map_err(io_err)?;
        self.pipeline.index().create_namespace(name).await?;
        info!(kb = name, "knowledge base created");
        Ok(())
    }

    /// Remove the KB directory and its namespace.
    pub async fn delete(&self, name: &str) -> Result<(), MnemoError> {
        let dir = self.require(name).await?;
        tokio::fs::remove_dir_all(&dir).await.map_err(io_err)?;
        self.pipeline.index().delete_namespace(name).await?;
        info!(kb = name, "knowledge base deleted");
        Ok(())
    }

    /// Move the directory and the namespace to `to`.
    ///
    /// Fails with `InvalidInput` when `to` is reserved or already taken,
    /// either as a directory or as a namespace.
    pub async fn rename(&self, from: &str, to: &str) -> Result<(), MnemoError> {
        let old_dir = self.require(from).await?;
        self.validate_kb_name(to)?;
        let index = self.pipeline.index();
        if self.exists(to).await || index.namespace_exists(to).await? {
            return Err(MnemoError::InvalidInput(format!("knowledge base {to} already exists")));
        }
        tokio::fs::rename(&old_dir, self.kb_dir(to)).await.map_err(io_err)?;
        // `false` only when `from` had no namespace yet, since `to` is free.
        if !index.rename_namespace(from, to).await? {
            index.create_namespace(to).await?;
        }
        info!(from, to, "knowledge base renamed");
        Ok(())
    }

    /// Save `bytes` as `file_name` in the KB and ingest it.
    ///
    /// Re-uploading a file replaces its previous chunks.
    pub async fn upload(&self, kb: &str, file_name: &str, bytes: &[u8]) -> Result<UploadReport, MnemoError> {
        let dir = self.require(kb).await?;
        validate_name("document", file_name)?;
        let path = dir.join(file_name);
        tokio::fs::write(&path, bytes).await.map_err(io_err)?;

        self.pipeline.index().delete_by_source(kb, file_name).await?;
        let IngestReport { chunk_count } = self.pipeline.ingest(kb, file_name, &path).await?;
        Ok(UploadReport {
            kb: kb.to_string(),
            file_name: file_name.to_string(),
            size: bytes.len() as u64,
            chunks: chunk_count,
        })
    }

    /// Copy an existing file into the KB and ingest it.
    pub async fn ingest_existing(&self, kb: &str, path: &Path) -> Result<UploadReport, MnemoError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| MnemoError::InvalidInput(format!("not a file path: {}", path.display())))?;
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(MnemoError::not_found("file", path.display().to_string()));
            }
            Err(e) => return Err(io_err(e)),
        };
        self.upload(kb, file_name, &bytes).await
    }

    pub async fn status(&self, name: &str) -> Result<KbStatus, MnemoError> {
        if !self.exists(name).await {
            return Ok(KbStatus {
                name: name.to_string(),
                exists: false,
                documents: 0,
                chunks: 0,
            });
        }
        let files = self.files(&self.kb_dir(name)).await?;
        Ok(KbStatus {
            name: name.to_string(),
            exists: true,
            documents: files.len(),
            chunks: self.pipeline.index().count(name).await?,
        })
    }

    pub async fn list_documents(&self, kb: &str) -> Result<Vec<DocumentInfo>, MnemoError> {
        let dir = self.require(kb).await?;
        let mut docs = Vec::new();
        for (file_name, meta) in self.files(&dir).await? {
            docs.push(DocumentInfo {
                chunks: self.pipeline.index().count_by_source(kb, &file_name).await?,
                size: meta.len(),
                modified: meta.modified().ok().map(|t| DateTime::<Utc>::from(t).to_rfc3339()),
                file_name,
            });
        }
        Ok(docs)
    }

    /// Drop a document's chunks and, unless `keep_file`, the file itself.
    pub async fn delete_document(&self, kb: &str, file_name: &str, keep_file: bool) -> Result<DeleteDocumentReport, MnemoError> {
        self.require(kb).await?;
        validate_name("document", file_name)?;
        let index = self.pipeline.index();
        let removed_vectors = index.count_by_source(kb, file_name).await?;
        index.delete_by_source(kb, file_name).await?;

        let removed_file = if keep_file {
            false
        } else {
            match tokio::fs::remove_file(self.kb_dir(kb).join(file_name)).await {
                Ok(()) => true,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
                Err(e) => return Err(io_err(e)),
            }
        };
        Ok(DeleteDocumentReport {
            kb: kb.to_string(),
            file_name: file_name.to_string(),
            removed_file,
            removed_vectors,
        })
    }

    /// Re-extract every file and swap the namespace contents in one write.
    ///
    /// Files that fail extraction are skipped.
    pub async fn rebuild(&self, kb: &str) -> Result<RebuildReport, MnemoError> {
        let dir = self.require(kb).await?;
        let mut chunks = Vec::new();
        let (mut files, mut skipped) = (0, 0);
        for (file_name, _) in self.files(&dir).await? {
            match self.pipeline.extract(&dir.join(&file_name)).await {
                Ok(doc) => {
                    chunks.extend(self.pipeline.chunk(kb, &file_name, &doc.text()));
                    files += 1;
                }
                Err(e) => {
                    warn!(kb, file = %file_name, error = %e, "skipping file during rebuild");
                    skipped += 1;
                }
            }
        }
        let chunks = self.pipeline.index().replace(kb, chunks).await?;
        info!(kb, files, skipped, chunks, "knowledge base rebuilt");
        Ok(RebuildReport {
            kb: kb.to_string(),
            files,
            skipped,
            chunks,
        })
    }

    async fn extract_document(&self, kb: &str, file_name: &str) -> Result<ExtractedDocument, MnemoError> {
        let path = self.require_document(kb, file_name).await?;
        self.pipeline.extract(&path).await
    }

    pub async fn preview(&self, kb: &str, file_name: &str, max_len: usize) -> Result<DocumentPreview, MnemoError> {
        let doc = self.extract_document(kb, file_name).await?;
        let text = doc.text();
        Ok(DocumentPreview {
            kb: kb.to_string(),
            file_name: file_name.to_string(),
            preview: take_chars(&text, max_len),
            meta: PreviewMeta {
                pages: doc.pages.len(),
                paragraphs: doc.paragraphs.len(),
                slides: doc.slides.len(),
                has_tables: !doc.tables.is_empty(),
                total_length: text.chars().count(),
            },
        })
    }

    pub async fn segments(
        &self,
        kb: &str,
        file_name: &str,
        page: usize,
        page_size: usize,
        basis: SegmentBasis,
    ) -> Result<SegmentPage, MnemoError> {
        let doc = self.extract_document(kb, file_name).await?;
        Ok(paginate(segments_of(&doc, basis), page, page_size))
    }

    pub async fn export(&self, kb: &str, file_name: &str, format: ExportFormat) -> Result<String, MnemoError> {
        let text = self.extract_document(kb, file_name).await?.text();
        Ok(match format {
            ExportFormat::Txt => text,
            ExportFormat::Md => format!("# {file_name}\n\n{text}"),
        })
    }

    /// Statistics, keywords and digests of one document.
    pub async fn summarize(
        &self,
        model: &dyn ModelAdapter,
        kb: &str,
        file_name: &str,
    ) -> Result<DocumentSummary, MnemoError> {
        let doc = self.extract_document(kb, file_name).await?;
        Ok(summary::summarize(model, kb, file_name, &doc).await)
    }

    /// [`Self::summarize`] rendered for download.
    pub async fn export_summary(
        &self,
        model: &dyn ModelAdapter,
        kb: &str,
        file_name: &str,
        format: ExportFormat,
    ) -> Result<String, MnemoError> {
        let summary = self.summarize(model, kb, file_name).await?;
        Ok(summary::render(&summary, format))
    }

    /// Answer `question` from the KB's top chunks.
    pub async fn query(
        &self,
        model: &dyn ModelAdapter,
        kb: &str,
        question: &str,
        top_k: usize,
    ) -> Result<QueryAnswer, MnemoError> {
        self.require(kb).await?;
        let hits = self.pipeline.index().retrieve(kb, question, top_k).await?;
        let context = hits
            .iter()
            .map(|h| h.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = ANSWER_PROMPT
            .replace("{context}", &context)
            .replace("{question}", question);
        let response = model
            .complete(vec![ChatMessage::user(prompt)], ModelOptions::default())
            .await?;
        Ok(QueryAnswer {
            answer: response.content,
            sources: hits
                .into_iter()
                .map(|h| SourceSnippet {
                    content: take_chars(&h.chunk.text, SOURCE_SNIPPET_CHARS),
                    metadata: h.chunk.metadata,
                })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_with_forbidden_chars_are_rejected() {
        for bad in ["", "  ", "a/b", "a\\b", "c:", "x*", "q?", "\"", "<", ">", "|", "..", "."] {
            assert!(validate_name("knowledge base", bad).is_err(), "{bad:?} accepted");
        }
        assert!(validate_name("knowledge base", "研究资料").is_ok());
    }

    #[test]
    fn pagination_clamps_and_rounds_up() {
        let segs: Vec<String> = (1..=5).map(|i| i.to_string()).collect();
        let p = paginate(segs.clone(), 2, 2);
        assert_eq!((p.page, p.pages, p.total), (2, 3, 5));
        assert_eq!(p.items, vec!["3", "4"]);

        let last = paginate(segs.clone(), 99, 2);
        assert_eq!(last.page, 3);
        assert_eq!(last.items, vec!["5"]);

        let first = paginate(segs, 0, 0);
        assert_eq!((first.page, first.page_size), (1, 1));
        assert_eq!(first.items, vec!["1"]);
    }

    #[test]
    fn pagination_of_nothing_has_one_page() {
        let p = paginate(Vec::new(), 3, 10);
        assert_eq!((p.page, p.pages, p.total), (1, 1, 0));
        assert!(p.items.is_empty());
    }

    #[test]
    fn auto_basis_prefers_structured_sections() {
        let doc = ExtractedDocument {
            full_text: "a\n\nb".into(),
            paragraphs: vec!["p1".into(), "p2".into()],
            ..Default::default()
        };
        assert_eq!(segments_of(&doc, SegmentBasis::Auto), vec!["p1", "p2"]);
        assert!(segments_of(&doc, SegmentBasis::Pages).is_empty());

        let plain = ExtractedDocument {
            full_text: "first\n\n\n  \n\nsecond".into(),
            ..Default::default()
        };
        assert_eq!(segments_of(&plain, SegmentBasis::Auto), vec!["first", "second"]);
    }

    #[test]
    fn basis_parses_from_query_strings() {
        assert_eq!("paragraphs".parse::<SegmentBasis>().unwrap(), SegmentBasis::Paragraphs);
        assert_eq!("md".parse::<ExportFormat>().unwrap(), ExportFormat::Md);
        assert!("bogus".parse::<SegmentBasis>().is_err());
    }
}
