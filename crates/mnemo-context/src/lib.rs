// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-turn context fusion for Mnemo.
//!
//! Builds the message list sent to the model from two zones:
//! - **Retrieval zone**: segments from registered [`SegmentProvider`]s
//!   (long-term memory first, then documents attached to the conversation,
//!   then the selected knowledge base), truncated
//!   to a segment budget and folded into one synthetic system message
//! - **History zone**: the tail of the conversation, oldest first
//!
//! Retrieved segments are placed ahead of the dialogue so the model treats
//! them as background rather than as the latest turn. When nothing is
//! retrieved the history is returned untouched.

pub mod history;
pub mod segments;

use std::sync::Arc;

use mnemo_config::model::ContextConfig;
use mnemo_core::{ChatMessage, ConversationStore, MnemoError};
use mnemo_index::{VectorIndex, is_reserved_namespace};
use mnemo_memory::LongTermMemory;
use tracing::debug;

pub use history::HistoryWindow;
pub use segments::{
    ConversationDocumentSegments, KnowledgeBaseSegments, LongTermSegments, SegmentProvider,
    TurnQuery,
};

/// Opening marker of the synthetic system message.
pub const MEMORY_HEADER: &str = "【长期记忆相关内容】";
/// Closing marker of the synthetic system message.
pub const DIALOGUE_MARKER: &str = "【当前对话】";

/// Render retrieved segments as the synthetic system prompt.
pub fn system_prompt(segments: &[String]) -> String {
    format!("{MEMORY_HEADER}\n{}\n{DIALOGUE_MARKER}", segments.join("\n\n"))
}

/// Output of one fusion pass.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedContext {
    /// Messages ready for the model.
    pub messages: Vec<ChatMessage>,
    /// The retrieved segments that went into the system message.
    pub segments: Vec<String>,
}

/// The fusion engine. One instance serves every connection.
pub struct ContextFusion {
    store: Arc<dyn ConversationStore>,
    index: VectorIndex,
    history: HistoryWindow,
    providers: Vec<Box<dyn SegmentProvider>>,
    max_segments: usize,
    /// Shared long-term memory namespace, never selectable as a knowledge base.
    global_memory: String,
}

impl ContextFusion {
    /// Engine with long-term memory and knowledge base retrieval registered.
    pub fn new(
        store: Arc<dyn ConversationStore>,
        index: VectorIndex,
        memory: LongTermMemory,
        config: &ContextConfig,
    ) -> Self {
        let mut engine =
            Self::without_providers(store, index.clone(), memory.global_namespace(), config);
        engine.add_provider(Box::new(LongTermSegments::new(memory, config.conv_topk)));
        engine.add_provider(Box::new(ConversationDocumentSegments::new(
            index.clone(),
            config.kb_topk,
        )));
        engine.add_provider(Box::new(KnowledgeBaseSegments::new(index, config.kb_topk)));
        engine
    }

    /// Engine with only the history zone; add providers with [`Self::add_provider`].
    pub fn without_providers(
        store: Arc<dyn ConversationStore>,
        index: VectorIndex,
        global_memory: &str,
        config: &ContextConfig,
    ) -> Self {
        Self {
            store,
            index,
            history: HistoryWindow::new(config.history_window),
            providers: Vec::new(),
            max_segments: config.max_segments,
            global_memory: global_memory.to_string(),
        }
    }

    /// Providers are consulted in registration order.
    pub fn add_provider(&mut self, provider: Box<dyn SegmentProvider>) {
        self.providers.push(provider);
    }

    /// Fail with `NotFound` when `kb` names a knowledge base that does not exist.
    ///
    /// Memory and conversation document namespaces are never knowledge bases.
    pub async fn check_kb(&self, kb: Option<&str>) -> Result<(), MnemoError> {
        let Some(name) = kb else {
            return Ok(());
        };
        if is_reserved_namespace(name, &self.global_memory)
            || !self.index.namespace_exists(name).await?
        {
            return Err(MnemoError::not_found("knowledge base", name));
        }
        Ok(())
    }

    /// Build the model input for the turn carried by `user_message`.
    ///
    /// Expects the user message to be persisted already, so it is the last
    /// entry of the history window.
    pub async fn assemble(
        &self,
        conversation_id: &str,
        user_message: &str,
        kb: Option<&str>,
    ) -> Result<FusedContext, MnemoError> {
        self.check_kb(kb).await?;

        let turn = TurnQuery {
            conversation_id,
            user_message,
            kb,
        };
        let mut segments = Vec::new();
        for provider in &self.providers {
            let found = provider.provide_segments(&turn).await?;
            debug!(conversation_id, provider = provider.label(), found = found.len(), "retrieved segments");
            segments.extend(found);
        }
        segments.truncate(self.max_segments);

        let history = self.history.messages(self.store.as_ref(), conversation_id).await?;
        let mut messages = Vec::with_capacity(history.len() + 1);
        if !segments.is_empty() {
            messages.push(ChatMessage::system(system_prompt(&segments)));
        }
        messages.extend(history);

        Ok(FusedContext { messages, segments })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_layout() {
        let prompt = system_prompt(&["甲".to_string(), "乙".to_string()]);
        assert_eq!(prompt, "【长期记忆相关内容】\n甲\n\n乙\n【当前对话】");
    }
}
