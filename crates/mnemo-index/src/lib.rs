// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Namespaced vector index for Mnemo.
//!
//! Vectors live in the same SQLite database as the conversation store and
//! are partitioned by namespace: one per knowledge base, one per
//! conversation document space, and one for long-term memory. Retrieval
//! ranks a cosine-similarity candidate pool with maximal marginal relevance.

pub mod embedder;
pub mod index;
pub mod mmr;
pub mod store;
pub mod types;

pub use embedder::HashingEmbedder;
#[cfg(feature = "onnx")]
pub use embedder::OnnxEmbedder;
pub use index::VectorIndex;
pub use store::VectorStore;
pub use types::{NamespaceInfo, ScoredChunk, VectorRecord};

use std::sync::Arc;

use mnemo_config::model::IndexConfig;
use mnemo_core::MnemoError;
use mnemo_storage::Database;

/// Build the index on top of an open database, using the configured embedder.
pub fn open(db: &Database, config: &IndexConfig) -> Result<VectorIndex, MnemoError> {
    let embedder = embedder::from_config(config)?;
    Ok(VectorIndex::new(
        VectorStore::new(db.connection().clone()),
        embedder,
        config,
    ))
}

/// Prefix of the namespaces holding documents attached to a conversation.
pub const CONVERSATION_PREFIX: &str = "conv_";

/// Prefix of conversation-scoped long-term memory namespaces.
pub const MEMORY_PREFIX: &str = "ltm_";

/// Namespace holding the documents attached to one conversation.
pub fn conversation_namespace(conversation_id: &str) -> String {
    format!("{CONVERSATION_PREFIX}{conversation_id}")
}

/// Namespace holding the long-term memory of one conversation.
pub fn memory_namespace(conversation_id: &str) -> String {
    format!("{MEMORY_PREFIX}{conversation_id}")
}

/// Whether `name` is owned by the system rather than by a knowledge base.
///
/// `global_memory` is the configured shared long-term memory namespace.
pub fn is_reserved_namespace(name: &str, global_memory: &str) -> bool {
    name == global_memory
        || name.starts_with(CONVERSATION_PREFIX)
        || name.starts_with(MEMORY_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_namespace_is_prefixed() {
        assert_eq!(conversation_namespace("abc"), "conv_abc");
        assert_eq!(memory_namespace("abc"), "ltm_abc");
    }

    #[test]
    fn internal_namespaces_are_reserved() {
        assert!(is_reserved_namespace("long_term", "long_term"));
        assert!(is_reserved_namespace("ltm_abc", "long_term"));
        assert!(is_reserved_namespace("conv_abc", "long_term"));
        assert!(is_reserved_namespace("memories", "memories"));
        assert!(!is_reserved_namespace("long_term", "memories"));
        assert!(!is_reserved_namespace("manuals", "long_term"));
        assert!(!is_reserved_namespace("conversations", "long_term"));
    }
}
