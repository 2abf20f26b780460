// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Document ingestion for Mnemo.
//!
//! Source files pass through an [`ExtractionAdapter`](mnemo_core::ExtractionAdapter),
//! are normalized and chunked by the [`Chunker`], deduplicated by content
//! hash, and upserted into a vector namespace. [`KnowledgeBaseManager`]
//! layers named, file-backed knowledge bases on top.

pub mod chunker;
pub mod extract;
pub mod kb;
pub mod pipeline;
pub mod summary;

pub use chunker::{normalize, Chunker, TextSpan};
pub use extract::PlainTextExtractor;
pub use kb::{ExportFormat, KnowledgeBaseManager, SegmentBasis};
pub use pipeline::{IngestReport, IngestionPipeline};
pub use summary::DocumentSummary;

use mnemo_config::model::ChunkingConfig;

/// Chunker for documents, from the `[chunking]` section.
pub fn document_chunker(config: &ChunkingConfig) -> Chunker {
    Chunker::new(config.chunk_size, config.chunk_overlap)
}

/// Chunker for long-term memory entries, from the `[chunking]` section.
pub fn memory_chunker(config: &ChunkingConfig) -> Chunker {
    Chunker::new(config.memory_chunk_size, config.memory_chunk_overlap)
}
