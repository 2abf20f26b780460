// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Extraction, chunking, deduplication, and upsert as one operation.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use mnemo_core::{Chunk, ExtractedDocument, ExtractionAdapter, MnemoError};
use mnemo_index::types::content_hash;
use mnemo_index::VectorIndex;

use crate::chunker::Chunker;
use crate::extract::PlainTextExtractor;

/// Outcome of one ingestion call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub chunk_count: usize,
}

/// Trim chunk texts, then drop empty ones and exact repeats, keeping first occurrences.
pub fn dedup(texts: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    texts
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(content_hash(t)))
        .collect()
}

/// Turns documents into indexed chunks.
#[derive(Clone)]
pub struct IngestionPipeline {
    index: VectorIndex,
    chunker: Chunker,
    extractors: Vec<Arc<dyn ExtractionAdapter>>,
}

impl IngestionPipeline {
    /// A pipeline with the bundled plain-text extractor registered.
    pub fn new(index: VectorIndex, chunker: Chunker) -> Self {
        Self {
            index,
            chunker,
            extractors: vec![Arc::new(PlainTextExtractor::new())],
        }
    }

    /// Register an extractor. Later registrations win over earlier ones.
    pub fn with_extractor(mut self, extractor: Arc<dyn ExtractionAdapter>) -> Self {
        self.extractors.insert(0, extractor);
        self
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Extract a document with the first extractor that supports it.
    pub async fn extract(&self, path: &Path) -> Result<ExtractedDocument, MnemoError> {
        let extractor = self
            .extractors
            .iter()
            .find(|x| x.supports(path))
            .ok_or_else(|| MnemoError::Extraction {
                message: format!("no extractor for {}", path.display()),
            })?;
        debug!(path = %path.display(), extractor = extractor.name(), "extracting");
        extractor.extract(path).await
    }

    /// Normalize, chunk, and deduplicate `text` into chunks for `namespace`.
    pub fn chunk(&self, namespace: &str, source_file: &str, text: &str) -> Vec<Chunk> {
        let spans = self.chunker.split_normalized(text);
        dedup(spans.into_iter().map(|s| s.text).collect())
            .into_iter()
            .map(|text| Chunk::new(text, namespace, source_file))
            .collect()
    }

    /// Extract and chunk a file without touching the index.
    ///
    /// Extraction failures degrade to an empty chunk list.
    pub async fn prepare(&self, namespace: &str, source_file: &str, path: &Path) -> Vec<Chunk> {
        match self.extract(path).await {
            Ok(doc) => self.chunk(namespace, source_file, &doc.text()),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "extraction failed, ingesting nothing");
                Vec::new()
            }
        }
    }

    /// Ingest the file at `path` into `namespace` under the name `source_file`.
    ///
    /// A document that yields no text is a no-op with `chunk_count == 0`.
    /// Index failures propagate.
    pub async fn ingest(&self, namespace: &str, source_file: &str, path: &Path) -> Result<IngestReport, MnemoError> {
        let chunks = self.prepare(namespace, source_file, path).await;
        self.upsert(namespace, source_file, chunks).await
    }

    /// Ingest raw text, skipping extraction.
    pub async fn ingest_text(&self, namespace: &str, source_file: &str, text: &str) -> Result<IngestReport, MnemoError> {
        let chunks = self.chunk(namespace, source_file, text);
        self.upsert(namespace, source_file, chunks).await
    }

    async fn upsert(&self, namespace: &str, source_file: &str, chunks: Vec<Chunk>) -> Result<IngestReport, MnemoError> {
        if chunks.is_empty() {
            return Ok(IngestReport { chunk_count: 0 });
        }
        let chunk_count = self.index.upsert(namespace, chunks).await?;
        info!(namespace, source_file, chunk_count, "ingested");
        Ok(IngestReport { chunk_count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_keeps_first_occurrence_and_drops_blank() {
        let out = dedup(vec![
            "页眉".into(),
            "正文一".into(),
            "  \n".into(),
            "页眉\n\n".into(),
            "正文二".into(),
        ]);
        assert_eq!(out, vec!["页眉", "正文一", "正文二"]);
    }
}
