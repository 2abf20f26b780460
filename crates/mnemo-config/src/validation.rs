// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks constraints serde cannot express: non-empty paths, chunk overlap
//! smaller than chunk size, ranges for sampling and MMR parameters.

use crate::diagnostic::ConfigError;
use crate::model::MnemoConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure instead of stopping at the first one.
pub fn validate_config(config: &MnemoConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    for (key, value) in [
        ("storage.database_path", &config.storage.database_path),
        ("knowledge.root_dir", &config.knowledge.root_dir),
        ("knowledge.uploads_dir", &config.knowledge.uploads_dir),
        ("memory.namespace", &config.memory.namespace),
        ("model.base_url", &config.model.base_url),
    ] {
        if value.trim().is_empty() {
            errors.push(ConfigError::validation(format!("{key} must not be empty")));
        }
    }

    let host = config.gateway.host.trim();
    let is_ip = host.parse::<std::net::IpAddr>().is_ok();
    let is_hostname = !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-');
    if !is_ip && !is_hostname {
        errors.push(ConfigError::validation(format!(
            "gateway.host `{host}` is not a valid IP address or hostname"
        )));
    }

    let chunking = &config.chunking;
    for (prefix, size, overlap) in [
        ("chunking.chunk", chunking.chunk_size, chunking.chunk_overlap),
        (
            "chunking.memory_chunk",
            chunking.memory_chunk_size,
            chunking.memory_chunk_overlap,
        ),
    ] {
        if size == 0 {
            errors.push(ConfigError::validation(format!(
                "{prefix}_size must be greater than 0"
            )));
        } else if overlap >= size {
            errors.push(ConfigError::validation(format!(
                "{prefix}_overlap ({overlap}) must be smaller than {prefix}_size ({size})"
            )));
        }
    }

    if !(0.0..=1.0).contains(&config.index.mmr_lambda) {
        errors.push(ConfigError::validation(format!(
            "index.mmr_lambda must be within [0, 1], got {}",
            config.index.mmr_lambda
        )));
    }

    if config.index.embedding_dimensions == 0 {
        errors.push(ConfigError::validation(
            "index.embedding_dimensions must be greater than 0",
        ));
    }

    if config.context.history_window == 0 {
        errors.push(ConfigError::validation(
            "context.history_window must be greater than 0",
        ));
    }

    if config.gateway.heartbeat_secs == 0 {
        errors.push(ConfigError::validation(
            "gateway.heartbeat_secs must be greater than 0",
        ));
    }

    if config.gateway.frame_segment_size == 0 {
        errors.push(ConfigError::validation(
            "gateway.frame_segment_size must be greater than 0",
        ));
    }

    if !(0.0..=2.0).contains(&config.model.temperature) {
        errors.push(ConfigError::validation(format!(
            "model.temperature must be within [0, 2], got {}",
            config.model.temperature
        )));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
