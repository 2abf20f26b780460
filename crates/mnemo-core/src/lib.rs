// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Mnemo retrieval chat backend.
//!
//! This crate provides the foundational trait definitions, error types, and
//! common types used throughout the Mnemo workspace. Stores, embedders,
//! extractors, and model clients implement traits defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::MnemoError;
pub use types::{
    AdapterType, ChatMessage, Chunk, ChunkMetadata, Conversation, EmbeddingInput,
    EmbeddingOutput, ExtractedDocument, ExtractedTable, FileRecord, HealthStatus, Message,
    ModelOptions, ModelResponse, Role, StreamDelta, TokenUsage,
};

pub use traits::{
    ConversationStore, EmbeddingAdapter, ExtractionAdapter, ModelAdapter, ModelStream,
    PluginAdapter, StorageAdapter,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mnemo_error_variants_render() {
        let not_found = MnemoError::not_found("conversation", "abc");
        assert!(not_found.is_not_found());
        assert_eq!(not_found.to_string(), "conversation not found: abc");

        let index = MnemoError::Index {
            source: Box::new(std::io::Error::other("disk gone")),
        };
        assert_eq!(index.to_string(), "index error: disk gone");
        assert!(!index.is_not_found());

        let model = MnemoError::model("rate limited");
        assert_eq!(model.to_string(), "model error: rate limited");

        let _extraction = MnemoError::Extraction {
            message: "unsupported".into(),
        };
        let _timeout = MnemoError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
    }

    #[test]
    fn adapter_type_round_trips_through_display() {
        use std::str::FromStr;

        for variant in [
            AdapterType::Embedding,
            AdapterType::Model,
            AdapterType::Extraction,
            AdapterType::Storage,
        ] {
            let parsed = AdapterType::from_str(&variant.to_string()).expect("should parse back");
            assert_eq!(variant, parsed);
        }
    }

    #[test]
    fn all_traits_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_embedding_adapter<T: EmbeddingAdapter>() {}
        fn _assert_model_adapter<T: ModelAdapter>() {}
        fn _assert_extraction_adapter<T: ExtractionAdapter>() {}
        fn _assert_conversation_store<T: ConversationStore>() {}
    }
}
