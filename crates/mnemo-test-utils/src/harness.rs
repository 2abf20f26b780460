// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the complete stack (conversation store, vector
//! index, long-term memory, fusion, knowledge bases) on a temp directory
//! with a [`MockModel`], and drives turns through in-memory transports.

use std::sync::Arc;

use mnemo_agent::{
    ChannelClient, ChannelTransport, ControllerState, ServerFrame, TurnController, TurnServices,
};
use mnemo_config::model::{MemoryScope, MnemoConfig};
use mnemo_core::MnemoError;
use mnemo_gateway::GatewayState;
use mnemo_ingest::KnowledgeBaseManager;
use mnemo_storage::{Database, SqliteStorage};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::mock_model::{MockModel, MockReply};

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    replies: Vec<MockReply>,
    config: MnemoConfig,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            replies: Vec::new(),
            config: MnemoConfig::default(),
        }
    }

    /// Script the mock model's replies.
    pub fn with_replies(mut self, replies: Vec<MockReply>) -> Self {
        self.replies = replies;
        self
    }

    pub fn with_memory_scope(mut self, scope: MemoryScope) -> Self {
        self.config.memory.scope = scope;
        self
    }

    pub fn with_heartbeat_secs(mut self, secs: u64) -> Self {
        self.config.gateway.heartbeat_secs = secs;
        self
    }

    pub fn with_frame_segment_size(mut self, size: usize) -> Self {
        self.config.gateway.frame_segment_size = size;
        self
    }

    /// Build the harness, opening all stores under a fresh temp directory.
    pub async fn build(self) -> Result<TestHarness, MnemoError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| MnemoError::Storage { source: e.into() })?;

        let mut config = self.config;
        let root = temp_dir.path();
        config.storage.database_path = root.join("mnemo.db").to_string_lossy().into_owned();
        config.knowledge.root_dir = root.join("kb").to_string_lossy().into_owned();
        config.knowledge.uploads_dir = root.join("uploads").to_string_lossy().into_owned();

        let database = Database::open(&config.storage.database_path).await?;
        let model = Arc::new(MockModel::with_replies(self.replies));
        let shutdown = CancellationToken::new();
        let state = GatewayState::assemble(&config, database, model.clone(), shutdown)?;

        Ok(TestHarness {
            model,
            state,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with a mock model and temp storage.
pub struct TestHarness {
    /// The scripted model.
    pub model: Arc<MockModel>,
    /// Everything the gateway serves from.
    pub state: GatewayState,
    pub config: MnemoConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    pub fn storage(&self) -> &Arc<SqliteStorage> {
        &self.state.storage
    }

    pub fn kb(&self) -> &KnowledgeBaseManager {
        &self.state.kb
    }

    pub fn services(&self) -> TurnServices {
        self.state.services.clone()
    }

    /// The token every connection opened by [`Self::connect`] derives from.
    pub fn shutdown(&self) -> &CancellationToken {
        &self.state.shutdown
    }

    /// Open an in-memory connection served by a fresh controller task.
    pub fn connect(&self) -> (ChannelClient, JoinHandle<ControllerState>) {
        let (transport, client) = ChannelTransport::pair();
        let controller = TurnController::new(
            self.services(),
            self.state.settings.clone(),
            transport,
            self.state.shutdown.child_token(),
        );
        (client, tokio::spawn(controller.run()))
    }

    /// Run one turn on a new connection and return every frame it produced.
    ///
    /// Stops after `stream_end`, or after an `error` that arrives before the
    /// stream started.
    pub async fn send_message(
        &self,
        content: &str,
        conversation_id: Option<&str>,
        kb: Option<&str>,
    ) -> Result<Vec<ServerFrame>, MnemoError> {
        let (mut client, handle) = self.connect();
        client
            .send_json(&serde_json::json!({
                "type": "user_message",
                "content": content,
                "conversation_id": conversation_id,
                "kb": kb,
            }))
            .await?;

        let mut frames = Vec::new();
        let mut started = false;
        while let Some(frame) = client.next_frame().await {
            let done = match &frame {
                ServerFrame::StreamStart => {
                    started = true;
                    false
                }
                ServerFrame::StreamEnd { .. } => true,
                ServerFrame::Error { .. } => !started,
                _ => false,
            };
            frames.push(frame);
            if done {
                break;
            }
        }

        client.disconnect();
        handle.await.map_err(|e| MnemoError::Internal(format!("controller task failed: {e}")))?;
        Ok(frames)
    }
}

/// The conversation id carried by the `stream_end` frame, if any.
pub fn conversation_id_of(frames: &[ServerFrame]) -> Option<String> {
    frames.iter().find_map(|f| match f {
        ServerFrame::StreamEnd {
            conversation_id, ..
        } => Some(conversation_id.clone()),
        _ => None,
    })
}

/// Concatenated `stream_chunk` contents.
pub fn streamed_text(frames: &[ServerFrame]) -> String {
    frames
        .iter()
        .filter_map(|f| match f {
            ServerFrame::StreamChunk { content } => Some(content.as_str()),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemo_core::ConversationStore;

    #[tokio::test]
    async fn harness_runs_a_turn() {
        let harness = TestHarness::builder()
            .with_replies(vec![MockReply::increments(&["Hello", " there"])])
            .build()
            .await
            .unwrap();

        let frames = harness.send_message("hi", None, None).await.unwrap();
        assert_eq!(frames.first(), Some(&ServerFrame::StreamStart));
        assert_eq!(streamed_text(&frames), "Hello there");

        let id = conversation_id_of(&frames).unwrap();
        let messages = harness.storage().get_messages(&id).await.unwrap();
        assert_eq!(messages.len(), 2);
    }

    #[tokio::test]
    async fn harness_uses_isolated_temp_dirs() {
        let a = TestHarness::builder().build().await.unwrap();
        let b = TestHarness::builder().build().await.unwrap();
        assert_ne!(a.config.storage.database_path, b.config.storage.database_path);
        a.kb().create("docs").await.unwrap();
        assert!(!b.kb().exists("docs").await);
    }
}
