// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the conversation store.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use mnemo_config::model::StorageConfig;
use mnemo_core::{
    AdapterType, Conversation, ConversationStore, FileRecord, HealthStatus, Message, MnemoError,
    PluginAdapter, Role, StorageAdapter,
};

use crate::database::{map_tr_err, Database};
use crate::queries;
use crate::title::{preview, DEFAULT_TITLE};

/// Most conversations returned by [`SqliteStorage::list_conversations`].
pub const CONVERSATION_LIST_LIMIT: usize = 100;

/// SQLite-backed conversation store.
///
/// Wraps a [`Database`] handle and delegates to the typed query modules.
/// The database is opened on the first call to [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new store. Nothing is opened until [`StorageAdapter::initialize`].
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Wrap an already-open database (shared with the vector index).
    pub fn with_database(config: StorageConfig, db: Database) -> Self {
        Self {
            config,
            db: OnceCell::new_with(Some(db)),
        }
    }

    /// The underlying database, or an error if not initialized.
    pub fn database(&self) -> Result<&Database, MnemoError> {
        self.db.get().ok_or_else(|| MnemoError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    /// Active conversations, most recently updated first.
    pub async fn list_conversations(&self) -> Result<Vec<Conversation>, MnemoError> {
        queries::conversations::list_conversations(self.database()?, CONVERSATION_LIST_LIMIT).await
    }

    /// Create a conversation owned by `user_id`.
    pub async fn create_conversation_for(
        &self,
        title: Option<&str>,
        user_id: Option<&str>,
    ) -> Result<Conversation, MnemoError> {
        let conversation = queries::conversations::create_conversation(
            self.database()?,
            title.unwrap_or(DEFAULT_TITLE),
            user_id,
        )
        .await?;
        debug!(conversation_id = %conversation.id, "conversation created");
        Ok(conversation)
    }

    /// Rename a conversation. Returns `false` if it does not exist.
    pub async fn update_title(&self, id: &str, title: &str) -> Result<bool, MnemoError> {
        queries::conversations::update_title(self.database()?, id, title).await
    }

    /// Remove all messages but keep the conversation.
    pub async fn clear_messages(&self, id: &str) -> Result<bool, MnemoError> {
        queries::messages::clear_messages(self.database()?, id).await
    }

    /// Preview of the latest message, empty when the conversation has none.
    pub async fn conversation_preview(&self, id: &str) -> Result<String, MnemoError> {
        let last = queries::messages::last_messages(self.database()?, id, 1).await?;
        Ok(last.first().map(|m| preview(&m.content)).unwrap_or_default())
    }

    /// Record a file uploaded into a conversation.
    pub async fn add_file_record(
        &self,
        conversation_id: Option<&str>,
        file_name: &str,
        file_path: &str,
        file_info: Option<serde_json::Value>,
    ) -> Result<FileRecord, MnemoError> {
        queries::files::insert_file(self.database()?, conversation_id, file_name, file_path, file_info)
            .await
    }

    pub async fn list_file_records(&self, conversation_id: &str) -> Result<Vec<FileRecord>, MnemoError> {
        queries::files::list_files(self.database()?, conversation_id).await
    }

    pub async fn file_record(&self, id: &str) -> Result<Option<FileRecord>, MnemoError> {
        queries::files::get_file(self.database()?, id).await
    }

    pub async fn delete_file_record(&self, id: &str) -> Result<bool, MnemoError> {
        queries::files::delete_file(self.database()?, id).await
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemoError> {
        let db = self.database()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MnemoError> {
        if self.db.get().is_some() {
            self.close().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), MnemoError> {
        let path = self.config.database_path.clone();
        self.db
            .get_or_try_init(|| Database::open(&path))
            .await?;
        info!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), MnemoError> {
        self.database()?.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for SqliteStorage {
    async fn create_conversation(&self, title: Option<&str>) -> Result<Conversation, MnemoError> {
        self.create_conversation_for(title, None).await
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, MnemoError> {
        queries::conversations::get_conversation(self.database()?, id).await
    }

    async fn add_message(
        &self,
        conversation_id: &str,
        role: Role,
        content: &str,
    ) -> Result<Message, MnemoError> {
        queries::messages::append_message(self.database()?, conversation_id, role, content, None)
            .await
    }

    async fn get_messages(&self, conversation_id: &str) -> Result<Vec<Message>, MnemoError> {
        queries::messages::get_messages(self.database()?, conversation_id).await
    }

    async fn last_messages(
        &self,
        conversation_id: &str,
        n: usize,
    ) -> Result<Vec<Message>, MnemoError> {
        queries::messages::last_messages(self.database()?, conversation_id, n).await
    }

    async fn delete_conversation(&self, id: &str) -> Result<bool, MnemoError> {
        let deleted = queries::conversations::deactivate(self.database()?, id).await?;
        if deleted {
            info!(conversation_id = %id, "conversation deactivated");
        }
        Ok(deleted)
    }
}
