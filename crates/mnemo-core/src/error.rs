// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Mnemo retrieval chat backend.

use thiserror::Error;

/// The primary error type used across all Mnemo adapter traits and core operations.
#[derive(Debug, Error)]
pub enum MnemoError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Relational storage errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The backing vector store could not be opened, read, or written.
    #[error("index error: {source}")]
    Index {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A source document could not be read or its format is unsupported.
    #[error("extraction error: {message}")]
    Extraction { message: String },

    /// The language model capability failed or returned an undecodable shape.
    #[error("model error: {message}")]
    Model {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Unknown conversation, namespace, or file.
    #[error("{kind} not found: {name}")]
    NotFound { kind: String, name: String },

    /// Caller supplied an argument that can never succeed (bad name, empty content).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Client transport errors (socket closed, send failure).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Adapter health check failed.
    #[error("health check failed for {name}: {source}")]
    HealthCheckFailed {
        name: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MnemoError {
    /// Shorthand for a [`MnemoError::NotFound`].
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Shorthand for a [`MnemoError::Model`] without an underlying source.
    pub fn model(message: impl Into<String>) -> Self {
        Self::Model {
            message: message.into(),
            source: None,
        }
    }

    /// Whether this error describes a missing conversation, namespace, or file.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
