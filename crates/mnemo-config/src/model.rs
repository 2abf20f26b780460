// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Mnemo.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Mnemo configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MnemoConfig {
    /// Process identity and logging.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Conversation store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Vector index settings.
    #[serde(default)]
    pub index: IndexConfig,

    /// Chunker settings.
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Context fusion settings.
    #[serde(default)]
    pub context: ContextConfig,

    /// Long-term memory settings.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Knowledge base settings.
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    /// WebSocket/HTTP gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Language model settings.
    #[serde(default)]
    pub model: ModelConfig,
}

/// Process identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name used in logs and health output.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_agent_name() -> String {
    "mnemo".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Conversation store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database holding conversations, messages, file records,
    /// and every vector index namespace.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn data_path(file: &str) -> String {
    dirs::data_dir()
        .map(|p| p.join("mnemo").join(file))
        .unwrap_or_else(|| std::path::PathBuf::from(file))
        .to_string_lossy()
        .into_owned()
}

fn default_database_path() -> String {
    data_path("mnemo.db")
}

/// Vector index configuration. Vectors live in the storage database.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IndexConfig {
    /// Size of the cosine-ranked candidate pool handed to MMR.
    #[serde(default = "default_fetch_k")]
    pub fetch_k: usize,

    /// MMR trade-off: 1.0 is pure relevance, 0.0 is pure diversity.
    #[serde(default = "default_mmr_lambda")]
    pub mmr_lambda: f32,

    /// Output width of the hashing embedder.
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: usize,

    /// Directory containing `model.onnx` and `tokenizer.json`. When set (and the
    /// `onnx` feature is enabled) the ONNX embedder replaces the hashing embedder.
    #[serde(default)]
    pub onnx_model_dir: Option<String>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            fetch_k: default_fetch_k(),
            mmr_lambda: default_mmr_lambda(),
            embedding_dimensions: default_embedding_dimensions(),
            onnx_model_dir: None,
        }
    }
}

fn default_fetch_k() -> usize {
    20
}

fn default_mmr_lambda() -> f32 {
    0.5
}

fn default_embedding_dimensions() -> usize {
    384
}

/// Chunker configuration. Sizes are in characters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Chunk size used when writing dialogue into long-term memory.
    #[serde(default = "default_chunk_size")]
    pub memory_chunk_size: usize,

    #[serde(default = "default_memory_chunk_overlap")]
    pub memory_chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            memory_chunk_size: default_chunk_size(),
            memory_chunk_overlap: default_memory_chunk_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    800
}

fn default_chunk_overlap() -> usize {
    150
}

fn default_memory_chunk_overlap() -> usize {
    120
}

/// Context fusion configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ContextConfig {
    /// Number of most recent messages forming the short-term window.
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Chunks retrieved from long-term memory per turn.
    #[serde(default = "default_conv_topk")]
    pub conv_topk: usize,

    /// Chunks retrieved from the selected knowledge base per turn.
    #[serde(default = "default_kb_topk")]
    pub kb_topk: usize,

    /// Upper bound on retrieved segments injected into the prompt.
    #[serde(default = "default_max_segments")]
    pub max_segments: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
            conv_topk: default_conv_topk(),
            kb_topk: default_kb_topk(),
            max_segments: default_max_segments(),
        }
    }
}

fn default_history_window() -> usize {
    10
}

fn default_conv_topk() -> usize {
    3
}

fn default_kb_topk() -> usize {
    2
}

fn default_max_segments() -> usize {
    5
}

/// Whether long-term memory is shared across conversations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryScope {
    /// One namespace for every conversation.
    #[default]
    Global,
    /// One namespace per conversation.
    Conversation,
}

/// Long-term memory configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    #[serde(default)]
    pub scope: MemoryScope,

    /// Namespace used when `scope = "global"`.
    #[serde(default = "default_memory_namespace")]
    pub namespace: String,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            scope: MemoryScope::default(),
            namespace: default_memory_namespace(),
        }
    }
}

fn default_memory_namespace() -> String {
    "long_term".to_string()
}

/// Knowledge base configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KnowledgeConfig {
    /// Directory holding one sub-directory of source files per knowledge base.
    #[serde(default = "default_kb_root")]
    pub root_dir: String,

    /// Default number of characters returned by document previews.
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,

    /// Chunks retrieved for a direct knowledge base question.
    #[serde(default = "default_query_topk")]
    pub query_topk: usize,

    /// Directory holding files uploaded into conversations.
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: String,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            root_dir: default_kb_root(),
            preview_chars: default_preview_chars(),
            query_topk: default_query_topk(),
            uploads_dir: default_uploads_dir(),
        }
    }
}

fn default_kb_root() -> String {
    data_path("kb")
}

fn default_uploads_dir() -> String {
    data_path("uploads")
}

fn default_preview_chars() -> usize {
    1200
}

fn default_query_topk() -> usize {
    5
}

/// WebSocket/HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Idle period after which a ping is sent to the client.
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,

    /// Maximum characters per outgoing WebSocket text frame.
    #[serde(default = "default_frame_segment_size")]
    pub frame_segment_size: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            heartbeat_secs: default_heartbeat_secs(),
            frame_segment_size: default_frame_segment_size(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_heartbeat_secs() -> u64 {
    30
}

fn default_frame_segment_size() -> usize {
    2000
}

/// Language model configuration for OpenAI-compatible chat APIs.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key. `None` falls back to `MNEMO_API_KEY`, then `DEEPSEEK_API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: None,
        }
    }
}

fn default_base_url() -> String {
    "https://api.deepseek.com/v1".to_string()
}

fn default_model() -> String {
    "deepseek-chat".to_string()
}

fn default_temperature() -> f32 {
    0.7
}
