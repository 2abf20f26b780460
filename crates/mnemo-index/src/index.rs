// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The namespaced vector index: embed, store, and retrieve with MMR.

use std::sync::Arc;

use mnemo_config::model::IndexConfig;
use mnemo_core::{Chunk, EmbeddingAdapter, EmbeddingInput, MnemoError};
use tracing::{debug, warn};

use crate::mmr::maximal_marginal_relevance;
use crate::store::VectorStore;
use crate::types::{cosine_similarity, NamespaceInfo, ScoredChunk, VectorRecord};

/// Texts sent to the embedder per call.
const EMBED_BATCH: usize = 64;

/// Vector index partitioned by namespace.
///
/// Cheap to clone; clones share the same store and embedder.
#[derive(Clone)]
pub struct VectorIndex {
    store: VectorStore,
    embedder: Arc<dyn EmbeddingAdapter>,
    fetch_k: usize,
    lambda: f32,
}

impl VectorIndex {
    pub fn new(store: VectorStore, embedder: Arc<dyn EmbeddingAdapter>, config: &IndexConfig) -> Self {
        Self {
            store,
            embedder,
            fetch_k: config.fetch_k,
            lambda: config.mmr_lambda,
        }
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingAdapter> {
        &self.embedder
    }

    /// Embed `chunks` and append them to `namespace`, creating it if needed.
    ///
    /// Returns the number of records written. Identical content across calls
    /// is stored again; deduplication is the caller's concern.
    pub async fn upsert(&self, namespace: &str, chunks: Vec<Chunk>) -> Result<usize, MnemoError> {
        if chunks.is_empty() {
            return Ok(0);
        }
        let records = self.embed_records(namespace, chunks).await?;
        let written = self.store.insert(namespace, records).await?;
        debug!(namespace, written, "upserted vectors");
        Ok(written)
    }

    /// Replace the whole content of `namespace` with `chunks` in one write.
    ///
    /// Concurrent readers observe either the previous set or the new one.
    pub async fn replace(&self, namespace: &str, chunks: Vec<Chunk>) -> Result<usize, MnemoError> {
        let records = self.embed_records(namespace, chunks).await?;
        let written = self.store.replace(namespace, records).await?;
        debug!(namespace, written, "replaced namespace contents");
        Ok(written)
    }

    /// Up to `k` chunks from `namespace`, ordered by maximal marginal relevance.
    ///
    /// `k` is clamped to at least 1. An unknown or empty namespace yields an
    /// empty result.
    pub async fn retrieve(&self, namespace: &str, query: &str, k: usize) -> Result<Vec<ScoredChunk>, MnemoError> {
        let k = k.max(1);
        let records = self.store.records(namespace).await?;
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let query_vec = self.embed_query(query).await?;
        let mut scored: Vec<(f32, VectorRecord)> = Vec::with_capacity(records.len());
        for record in records {
            if record.embedding.len() != query_vec.len() {
                warn!(
                    namespace,
                    id = %record.id,
                    stored = record.embedding.len(),
                    expected = query_vec.len(),
                    "skipping vector with mismatched dimensions"
                );
                continue;
            }
            scored.push((cosine_similarity(&query_vec, &record.embedding), record));
        }

        // Stable sort keeps insertion order among equal scores.
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(self.fetch_k.max(k));

        let embeddings: Vec<Vec<f32>> = scored.iter().map(|(_, r)| r.embedding.clone()).collect();
        let picks = maximal_marginal_relevance(&query_vec, &embeddings, k, self.lambda);

        let mut slots: Vec<Option<(f32, VectorRecord)>> = scored.into_iter().map(Some).collect();
        let results = picks
            .into_iter()
            .filter_map(|i| slots.get_mut(i).and_then(Option::take))
            .map(|(score, record)| ScoredChunk {
                chunk: record.chunk,
                score,
            })
            .collect();
        Ok(results)
    }

    /// Remove every vector from `source_file`. Succeeds when nothing matched.
    pub async fn delete_by_source(&self, namespace: &str, source_file: &str) -> Result<bool, MnemoError> {
        let removed = self.store.delete_by_source(namespace, source_file).await?;
        debug!(namespace, source_file, removed, "deleted vectors by source");
        Ok(true)
    }

    /// Drop every vector in `namespace`. The namespace stays registered.
    pub async fn rebuild(&self, namespace: &str) -> Result<(), MnemoError> {
        let removed = self.store.clear(namespace).await?;
        debug!(namespace, removed, "cleared namespace for rebuild");
        Ok(())
    }

    pub async fn count(&self, namespace: &str) -> Result<usize, MnemoError> {
        self.store.count(namespace).await
    }

    pub async fn count_by_source(&self, namespace: &str, source_file: &str) -> Result<usize, MnemoError> {
        self.store.count_by_source(namespace, source_file).await
    }

    /// Stored chunk texts of one source file, in insertion order.
    pub async fn source_texts(&self, namespace: &str, source_file: &str) -> Result<Vec<String>, MnemoError> {
        self.store.source_texts(namespace, source_file).await
    }

    pub async fn create_namespace(&self, namespace: &str) -> Result<bool, MnemoError> {
        self.store.create_namespace(namespace).await
    }

    pub async fn delete_namespace(&self, namespace: &str) -> Result<bool, MnemoError> {
        self.store.delete_namespace(namespace).await
    }

    pub async fn rename_namespace(&self, from: &str, to: &str) -> Result<bool, MnemoError> {
        self.store.rename_namespace(from, to).await
    }

    pub async fn namespace_exists(&self, namespace: &str) -> Result<bool, MnemoError> {
        self.store.namespace_exists(namespace).await
    }

    pub async fn list_namespaces(&self) -> Result<Vec<NamespaceInfo>, MnemoError> {
        self.store.list_namespaces().await
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>, MnemoError> {
        let output = self
            .embedder
            .embed(EmbeddingInput {
                texts: vec![query.to_string()],
            })
            .await?;
        output
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| MnemoError::Internal("embedder returned no vector for query".into()))
    }

    async fn embed_records(&self, namespace: &str, chunks: Vec<Chunk>) -> Result<Vec<VectorRecord>, MnemoError> {
        let mut records = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(EMBED_BATCH) {
            let texts = batch.iter().map(|c| c.text.clone()).collect();
            let output = self.embedder.embed(EmbeddingInput { texts }).await?;
            if output.embeddings.len() != batch.len() {
                return Err(MnemoError::Internal(format!(
                    "embedder returned {} vectors for {} texts",
                    output.embeddings.len(),
                    batch.len()
                )));
            }
            for (chunk, embedding) in batch.iter().zip(output.embeddings) {
                let mut chunk = chunk.clone();
                chunk.metadata.namespace = namespace.to_string();
                records.push(VectorRecord {
                    id: uuid::Uuid::new_v4().to_string(),
                    embedding,
                    chunk,
                });
            }
        }
        Ok(records)
    }
}
