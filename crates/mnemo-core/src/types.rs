// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the stores, the retrieval pipeline, and the turn controller.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Embedding,
    Model,
    Extraction,
    Storage,
}

// --- Dialogue ---

/// Author of a message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// A role-tagged message as handed to the model capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// A persisted conversation header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub user_id: Option<String>,
    /// ISO 8601 timestamp.
    pub created_at: String,
    /// ISO 8601 timestamp, touched whenever a message is appended.
    pub updated_at: String,
    pub is_active: bool,
}

/// A persisted message. `sequence` starts at 1 and is gapless per conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub role: Role,
    pub content: String,
    pub sequence: i64,
    pub created_at: String,
    pub tool_call: Option<serde_json::Value>,
}

impl From<&Message> for ChatMessage {
    fn from(msg: &Message) -> Self {
        ChatMessage::new(msg.role, msg.content.clone())
    }
}

/// Metadata about a file attached to a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: String,
    pub conversation_id: Option<String>,
    pub file_name: String,
    pub file_path: String,
    pub file_info: Option<serde_json::Value>,
    pub analysis_data: Option<serde_json::Value>,
    pub insights: Option<serde_json::Value>,
    pub created_at: String,
}

// --- Retrieval ---

/// Where a chunk came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub namespace: String,
    pub source_file: String,
}

/// A bounded span of normalized text, the retrieval unit of the vector index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    pub fn new(
        text: impl Into<String>,
        namespace: impl Into<String>,
        source_file: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            metadata: ChunkMetadata {
                namespace: namespace.into(),
                source_file: source_file.into(),
            },
        }
    }
}

/// A table recovered from a spreadsheet, slide, or document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedTable {
    pub rows: Vec<Vec<String>>,
}

/// Output of an extraction adapter. Which sections are populated depends on the source format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pub full_text: String,
    #[serde(default)]
    pub pages: Vec<String>,
    #[serde(default)]
    pub paragraphs: Vec<String>,
    #[serde(default)]
    pub slides: Vec<String>,
    #[serde(default)]
    pub tables: Vec<ExtractedTable>,
}

impl ExtractedDocument {
    /// The document text: `full_text` when present, otherwise the first populated
    /// structured section joined with newlines.
    pub fn text(&self) -> String {
        if !self.full_text.trim().is_empty() {
            return self.full_text.clone();
        }
        [&self.pages, &self.paragraphs, &self.slides]
            .into_iter()
            .find(|section| !section.is_empty())
            .map(|section| section.join("\n"))
            .unwrap_or_default()
    }
}

// --- Embedding ---

/// Input for an embedding adapter.
#[derive(Debug, Clone)]
pub struct EmbeddingInput {
    pub texts: Vec<String>,
}

/// Output from an embedding adapter. One vector per input text, in order.
#[derive(Debug, Clone)]
pub struct EmbeddingOutput {
    pub embeddings: Vec<Vec<f32>>,
    pub dimensions: usize,
}

// --- Model ---

/// Sampling options for a model call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// Token accounting reported by the model, when available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// A complete, decoded model response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    pub content: String,
    pub model: String,
    pub finish_reason: Option<String>,
    pub usage: Option<TokenUsage>,
}

/// One text increment of a streamed model response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDelta {
    pub text: String,
    /// Set on the final increment when the provider reports why generation stopped.
    pub finish_reason: Option<String>,
}

impl StreamDelta {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            finish_reason: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&Role::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
        assert_eq!(Role::User.to_string(), "user");
        assert_eq!("system".parse::<Role>().unwrap(), Role::System);
    }

    #[test]
    fn extracted_text_prefers_full_text() {
        let doc = ExtractedDocument {
            full_text: "whole".into(),
            pages: vec!["p1".into()],
            ..Default::default()
        };
        assert_eq!(doc.text(), "whole");
    }

    #[test]
    fn extracted_text_falls_back_to_sections_in_order() {
        let doc = ExtractedDocument {
            paragraphs: vec!["a".into(), "b".into()],
            slides: vec!["s".into()],
            ..Default::default()
        };
        assert_eq!(doc.text(), "a\nb");

        let slides_only = ExtractedDocument {
            slides: vec!["s1".into(), "s2".into()],
            ..Default::default()
        };
        assert_eq!(slides_only.text(), "s1\ns2");
        assert_eq!(ExtractedDocument::default().text(), "");
    }

    #[test]
    fn message_converts_to_chat_message() {
        let msg = Message {
            id: "m1".into(),
            conversation_id: "c1".into(),
            role: Role::User,
            content: "hi".into(),
            sequence: 1,
            created_at: "2026-01-01T00:00:00Z".into(),
            tool_call: None,
        };
        assert_eq!(ChatMessage::from(&msg), ChatMessage::user("hi"));
    }
}
