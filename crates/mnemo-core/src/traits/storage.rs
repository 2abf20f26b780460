// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter traits for persistence backends.

use async_trait::async_trait;

use crate::error::MnemoError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Conversation, Message, Role};

/// Adapter for storage and persistence backends.
///
/// Storage adapters manage the lifecycle of database connections.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), MnemoError>;

    /// Closes the storage backend, flushing pending writes and releasing connections.
    async fn close(&self) -> Result<(), MnemoError>;
}

/// Short-term dialogue log: conversations and their ordered messages.
#[async_trait]
pub trait ConversationStore: StorageAdapter {
    /// Creates a conversation. `None` uses the default title.
    async fn create_conversation(&self, title: Option<&str>) -> Result<Conversation, MnemoError>;

    /// Fetches an active conversation, `None` if unknown or deleted.
    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, MnemoError>;

    /// Appends a message, assigning the next sequence number.
    ///
    /// Fails with [`MnemoError::NotFound`] if the conversation is unknown or deleted.
    async fn add_message(
        &self,
        conversation_id: &str,
        role: Role,
        content: &str,
    ) -> Result<Message, MnemoError>;

    /// All messages of an active conversation, ordered by sequence.
    async fn get_messages(&self, conversation_id: &str) -> Result<Vec<Message>, MnemoError>;

    /// The last `n` messages of an active conversation, oldest first.
    async fn last_messages(
        &self,
        conversation_id: &str,
        n: usize,
    ) -> Result<Vec<Message>, MnemoError>;

    /// Soft-deletes a conversation. Returns `false` if it did not exist or was already deleted.
    async fn delete_conversation(&self, id: &str) -> Result<bool, MnemoError>;
}
