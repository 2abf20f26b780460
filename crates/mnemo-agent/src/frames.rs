// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON frames exchanged over a chat stream connection.

use serde::{Deserialize, Serialize};

/// Client to server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    UserMessage {
        content: String,
        #[serde(default)]
        conversation_id: Option<String>,
        #[serde(default)]
        kb: Option<String>,
    },
    /// Any `type` this server does not handle.
    #[serde(other)]
    Unknown,
}

/// Server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    StreamStart,
    StreamChunk { content: String },
    StreamEnd {
        content: String,
        conversation_id: String,
    },
    Ping,
    Error { content: String },
}

impl ServerFrame {
    pub fn error(content: impl Into<String>) -> Self {
        Self::Error {
            content: content.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::StreamStart => "stream_start",
            Self::StreamChunk { .. } => "stream_chunk",
            Self::StreamEnd { .. } => "stream_end",
            Self::Ping => "ping",
            Self::Error { .. } => "error",
        }
    }
}

/// Why an inbound text could not become a [`ClientFrame`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Not JSON at all.
    InvalidJson(String),
    /// JSON with a known `type` but missing or mistyped fields.
    Malformed(String),
}

impl FrameError {
    pub fn client_message(&self) -> String {
        match self {
            Self::InvalidJson(e) => format!("invalid JSON: {e}"),
            Self::Malformed(e) => format!("malformed message: {e}"),
        }
    }
}

pub fn parse_client_frame(text: &str) -> Result<ClientFrame, FrameError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| FrameError::InvalidJson(e.to_string()))?;
    serde_json::from_value(value).map_err(|e| FrameError::Malformed(e.to_string()))
}

/// Split `text` into segments of at most `size` characters.
///
/// Boundaries fall on char boundaries and carry no meaning; concatenating the
/// segments yields `text`. Empty input yields one empty segment.
pub fn segment(text: &str, size: usize) -> Vec<String> {
    let size = size.max(1);
    if text.is_empty() {
        return vec![String::new()];
    }
    let mut segments = Vec::with_capacity(text.len() / size + 1);
    let mut current = String::new();
    let mut chars = 0;
    for c in text.chars() {
        if chars == size {
            segments.push(std::mem::take(&mut current));
            chars = 0;
        }
        current.push(c);
        chars += 1;
    }
    segments.push(current);
    segments
}
