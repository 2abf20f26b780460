// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use mnemo_config::model::{MemoryConfig, MemoryScope};
use mnemo_core::{Chunk, MnemoError};
use mnemo_index::{ScoredChunk, VectorIndex};
use mnemo_ingest::pipeline::dedup;
use mnemo_ingest::Chunker;
use tracing::debug;

/// Always-on memory namespace fed by every dialogue turn.
#[derive(Clone)]
pub struct LongTermMemory {
    index: VectorIndex,
    chunker: Chunker,
    scope: MemoryScope,
    namespace: String,
}

impl LongTermMemory {
    pub fn new(index: VectorIndex, chunker: Chunker, config: &MemoryConfig) -> Self {
        Self {
            index,
            chunker,
            scope: config.scope,
            namespace: config.namespace.clone(),
        }
    }

    pub fn scope(&self) -> MemoryScope {
        self.scope
    }

    /// The shared namespace used under [`MemoryScope::Global`].
    pub fn global_namespace(&self) -> &str {
        &self.namespace
    }

    /// The namespace that holds memories for `conversation_id`.
    pub fn namespace_for(&self, conversation_id: &str) -> String {
        match self.scope {
            MemoryScope::Global => self.namespace.clone(),
            MemoryScope::Conversation => mnemo_index::memory_namespace(conversation_id),
        }
    }

    /// Chunk `text` and store it. Whitespace-only text is ignored.
    ///
    /// Returns the number of entries written.
    pub async fn remember(&self, conversation_id: &str, text: &str) -> Result<usize, MnemoError> {
        if text.trim().is_empty() {
            debug!(conversation_id, "ignoring empty memory");
            return Ok(0);
        }
        let namespace = self.namespace_for(conversation_id);
        let spans = self.chunker.split_normalized(text);
        let chunks: Vec<Chunk> = dedup(spans.into_iter().map(|s| s.text).collect())
            .into_iter()
            .map(|t| Chunk::new(t, namespace.as_str(), conversation_id))
            .collect();
        let written = self.index.upsert(&namespace, chunks).await?;
        debug!(conversation_id, namespace = %namespace, written, "remembered");
        Ok(written)
    }

    /// Up to `k` memories relevant to `query`.
    pub async fn recall(&self, conversation_id: &str, query: &str, k: usize) -> Result<Vec<ScoredChunk>, MnemoError> {
        self.index
            .retrieve(&self.namespace_for(conversation_id), query, k)
            .await
    }

    /// Number of stored entries visible to `conversation_id`.
    pub async fn count(&self, conversation_id: &str) -> Result<usize, MnemoError> {
        self.index.count(&self.namespace_for(conversation_id)).await
    }
}
