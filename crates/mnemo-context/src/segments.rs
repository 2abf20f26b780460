// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retrieval zone: providers that contribute background segments for a turn.
//!
//! The fusion engine calls every registered provider in registration order
//! and concatenates their segments before truncating to the segment budget.

use async_trait::async_trait;
use mnemo_core::MnemoError;
use mnemo_index::{VectorIndex, conversation_namespace};
use mnemo_memory::LongTermMemory;

/// What a provider sees of the current turn.
#[derive(Debug, Clone, Copy)]
pub struct TurnQuery<'a> {
    pub conversation_id: &'a str,
    pub user_message: &'a str,
    pub kb: Option<&'a str>,
}

/// A source of retrieved text for the synthetic system message.
#[async_trait]
pub trait SegmentProvider: Send + Sync {
    /// Short identifier used in logs.
    fn label(&self) -> &str;

    /// Segments for this turn, most relevant first. Empty when nothing applies.
    async fn provide_segments(&self, turn: &TurnQuery<'_>) -> Result<Vec<String>, MnemoError>;
}

/// Long-term memory recall.
pub struct LongTermSegments {
    memory: LongTermMemory,
    top_k: usize,
}

impl LongTermSegments {
    pub fn new(memory: LongTermMemory, top_k: usize) -> Self {
        Self { memory, top_k }
    }
}

#[async_trait]
impl SegmentProvider for LongTermSegments {
    fn label(&self) -> &str {
        "long_term"
    }

    async fn provide_segments(&self, turn: &TurnQuery<'_>) -> Result<Vec<String>, MnemoError> {
        let hits = self
            .memory
            .recall(turn.conversation_id, turn.user_message, self.top_k)
            .await?;
        Ok(hits.into_iter().map(|h| h.chunk.text).collect())
    }
}

/// Retrieval from the documents uploaded into the turn's conversation.
pub struct ConversationDocumentSegments {
    index: VectorIndex,
    top_k: usize,
}

impl ConversationDocumentSegments {
    pub fn new(index: VectorIndex, top_k: usize) -> Self {
        Self { index, top_k }
    }
}

#[async_trait]
impl SegmentProvider for ConversationDocumentSegments {
    fn label(&self) -> &str {
        "conversation_documents"
    }

    async fn provide_segments(&self, turn: &TurnQuery<'_>) -> Result<Vec<String>, MnemoError> {
        let namespace = conversation_namespace(turn.conversation_id);
        let hits = self
            .index
            .retrieve(&namespace, turn.user_message, self.top_k)
            .await?;
        Ok(hits.into_iter().map(|h| h.chunk.text).collect())
    }
}

/// Retrieval from the knowledge base selected for the turn, if any.
pub struct KnowledgeBaseSegments {
    index: VectorIndex,
    top_k: usize,
}

impl KnowledgeBaseSegments {
    pub fn new(index: VectorIndex, top_k: usize) -> Self {
        Self { index, top_k }
    }
}

#[async_trait]
impl SegmentProvider for KnowledgeBaseSegments {
    fn label(&self) -> &str {
        "knowledge_base"
    }

    async fn provide_segments(&self, turn: &TurnQuery<'_>) -> Result<Vec<String>, MnemoError> {
        let Some(kb) = turn.kb else {
            return Ok(Vec::new());
        };
        let hits = self.index.retrieve(kb, turn.user_message, self.top_k).await?;
        Ok(hits.into_iter().map(|h| h.chunk.text).collect())
    }
}
