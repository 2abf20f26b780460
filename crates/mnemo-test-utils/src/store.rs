// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation store wrapper that fails writes for one role.

use std::sync::Arc;

use async_trait::async_trait;
use mnemo_core::{
    AdapterType, Conversation, ConversationStore, HealthStatus, Message, MnemoError,
    PluginAdapter, Role, StorageAdapter,
};

/// Delegates to an inner store but fails every `add_message` for `role`.
pub struct RejectingStore {
    inner: Arc<dyn ConversationStore>,
    role: Role,
}

impl RejectingStore {
    pub fn new(inner: Arc<dyn ConversationStore>, role: Role) -> Self {
        Self { inner, role }
    }
}

#[async_trait]
impl PluginAdapter for RejectingStore {
    fn name(&self) -> &str {
        "rejecting-store"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemoError> {
        self.inner.health_check().await
    }

    async fn shutdown(&self) -> Result<(), MnemoError> {
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for RejectingStore {
    async fn initialize(&self) -> Result<(), MnemoError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), MnemoError> {
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for RejectingStore {
    async fn create_conversation(&self, title: Option<&str>) -> Result<Conversation, MnemoError> {
        self.inner.create_conversation(title).await
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, MnemoError> {
        self.inner.get_conversation(id).await
    }

    async fn add_message(
        &self,
        conversation_id: &str,
        role: Role,
        content: &str,
    ) -> Result<Message, MnemoError> {
        if role == self.role {
            return Err(MnemoError::Storage {
                source: format!("{role} messages are rejected").into(),
            });
        }
        self.inner.add_message(conversation_id, role, content).await
    }

    async fn get_messages(&self, conversation_id: &str) -> Result<Vec<Message>, MnemoError> {
        self.inner.get_messages(conversation_id).await
    }

    async fn last_messages(
        &self,
        conversation_id: &str,
        n: usize,
    ) -> Result<Vec<Message>, MnemoError> {
        self.inner.last_messages(conversation_id, n).await
    }

    async fn delete_conversation(&self, id: &str) -> Result<bool, MnemoError> {
        self.inner.delete_conversation(id).await
    }
}
