// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Short-term zone: the most recent messages of the conversation.

use mnemo_core::{ChatMessage, ConversationStore, MnemoError};
use tracing::debug;

/// Sliding window over the tail of a conversation.
#[derive(Debug, Clone, Copy)]
pub struct HistoryWindow {
    size: usize,
}

impl HistoryWindow {
    pub fn new(size: usize) -> Self {
        Self { size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// The last `size` messages, role-tagged, oldest first.
    ///
    /// A conversation shorter than the window yields all of its messages.
    pub async fn messages(
        &self,
        store: &dyn ConversationStore,
        conversation_id: &str,
    ) -> Result<Vec<ChatMessage>, MnemoError> {
        let tail = store.last_messages(conversation_id, self.size).await?;
        debug!(conversation_id, window = self.size, loaded = tail.len(), "history window");
        Ok(tail.iter().map(ChatMessage::from).collect())
    }
}
