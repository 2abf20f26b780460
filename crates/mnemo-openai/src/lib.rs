// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI-compatible chat model adapter for Mnemo.
//!
//! This crate implements [`ModelAdapter`] for any Chat Completions endpoint
//! (DeepSeek by default), providing both single-shot completion and streaming
//! SSE responses.

pub mod client;
pub mod sse;
pub mod types;

use async_trait::async_trait;
use futures::stream::StreamExt;
use mnemo_config::model::ModelConfig;
use mnemo_core::{
    AdapterType, ChatMessage, HealthStatus, MnemoError, ModelAdapter, ModelOptions, ModelResponse,
    ModelStream, PluginAdapter, StreamDelta, TokenUsage,
};
use tracing::{debug, info};

use crate::client::OpenAiClient;
use crate::sse::StreamEvent;
use crate::types::{ApiMessage, ChatCompletionChunk, ChatCompletionRequest};

/// Environment variables consulted, in order, when the config carries no key.
pub const API_KEY_ENV_VARS: [&str; 2] = ["MNEMO_API_KEY", "DEEPSEEK_API_KEY"];

/// Chat model implementing [`ModelAdapter`] over the Chat Completions API.
///
/// API key resolution order: config -> `MNEMO_API_KEY` -> `DEEPSEEK_API_KEY` -> error.
pub struct OpenAiModel {
    client: OpenAiClient,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl OpenAiModel {
    pub fn from_config(config: &ModelConfig) -> Result<Self, MnemoError> {
        let api_key = resolve_api_key(&config.api_key)?;
        let client = OpenAiClient::new(&config.base_url, &api_key, config.model.clone())?;

        info!(
            model = config.model,
            base_url = config.base_url,
            "chat model initialized"
        );

        Ok(Self::with_client(client, config))
    }

    /// Creates a model around an existing client.
    pub fn with_client(client: OpenAiClient, config: &ModelConfig) -> Self {
        Self {
            client,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    fn to_request(&self, messages: Vec<ChatMessage>, options: ModelOptions) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.client.model().to_string(),
            messages: messages
                .into_iter()
                .map(|m| ApiMessage {
                    role: m.role.to_string(),
                    content: m.content,
                })
                .collect(),
            temperature: Some(options.temperature.unwrap_or(self.temperature)),
            max_tokens: options.max_tokens.or(self.max_tokens),
            stream: false,
        }
    }
}

#[async_trait]
impl PluginAdapter for OpenAiModel {
    fn name(&self) -> &str {
        "openai-compatible"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Model
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemoError> {
        // Avoid spending tokens on health checks.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MnemoError> {
        debug!("chat model shutting down");
        Ok(())
    }
}

#[async_trait]
impl ModelAdapter for OpenAiModel {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: ModelOptions,
    ) -> Result<ModelResponse, MnemoError> {
        let request = self.to_request(messages, options);
        let response = self.client.complete_chat(&request).await?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| MnemoError::model("model response contained no choices"))?;
        let content = choice
            .message
            .content
            .ok_or_else(|| MnemoError::model("model response contained no content"))?;

        Ok(ModelResponse {
            content,
            model: response.model,
            finish_reason: choice.finish_reason,
            usage: response.usage.map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            }),
        })
    }

    async fn stream(
        &self,
        messages: Vec<ChatMessage>,
        options: ModelOptions,
    ) -> Result<ModelStream, MnemoError> {
        let request = self.to_request(messages, options);
        let events = self.client.stream_chat(&request).await?;

        let deltas = events.filter_map(|result| {
            let delta = match result {
                Ok(StreamEvent::Chunk(chunk)) => chunk_to_delta(chunk).map(Ok),
                Ok(StreamEvent::Error(e)) => Some(Err(MnemoError::model(format!(
                    "model stream error: {}",
                    e.describe()
                )))),
                Err(e) => Some(Err(e)),
            };
            async move { delta }
        });

        Ok(Box::pin(deltas))
    }
}

/// Collapses a chunk into one increment. `None` when it carries neither text
/// nor a finish reason (role-only openers, keep-alives).
fn chunk_to_delta(chunk: ChatCompletionChunk) -> Option<StreamDelta> {
    let mut text = String::new();
    let mut finish_reason = None;
    for choice in chunk.choices {
        if let Some(content) = choice.delta.content {
            text.push_str(&content);
        }
        if choice.finish_reason.is_some() {
            finish_reason = choice.finish_reason;
        }
    }
    if text.is_empty() && finish_reason.is_none() {
        return None;
    }
    Some(StreamDelta {
        text,
        finish_reason,
    })
}

/// Resolves the API key from config or environment.
fn resolve_api_key(config_key: &Option<String>) -> Result<String, MnemoError> {
    if let Some(key) = config_key
        && !key.is_empty()
    {
        return Ok(key.clone());
    }

    API_KEY_ENV_VARS
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|v| !v.is_empty()))
        .ok_or_else(|| {
            MnemoError::Config(
                "model API key not found. Set model.api_key in config or MNEMO_API_KEY / DEEPSEEK_API_KEY in the environment.".into(),
            )
        })
}
