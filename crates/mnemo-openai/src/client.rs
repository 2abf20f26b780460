// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for OpenAI-compatible Chat Completions endpoints.
//!
//! Provides [`OpenAiClient`] which handles request construction,
//! bearer authentication, streaming SSE responses, and transient error retry.

use std::pin::Pin;
use std::time::Duration;

use futures::Stream;
use mnemo_core::MnemoError;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use tracing::{debug, warn};

use crate::sse::{self, StreamEvent};
use crate::types::{ApiErrorResponse, ChatCompletionRequest, ChatCompletionResponse};

pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, MnemoError>> + Send>>;

/// HTTP client for Chat Completions communication.
///
/// Retries once on transient statuses (429, 500, 502, 503).
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl OpenAiClient {
    /// Creates a client for `{base_url}/chat/completions`.
    pub fn new(base_url: &str, api_key: &str, model: String) -> Result<Self, MnemoError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|e| MnemoError::Config(format!("invalid API key header value: {e}")))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| MnemoError::Model {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model,
            max_retries: 1,
            retry_delay: Duration::from_secs(1),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Overrides the pause between attempts.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Sends a streaming request and returns a stream of SSE events.
    pub async fn stream_chat(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<EventStream, MnemoError> {
        let mut req = request.clone();
        req.stream = true;
        let response = self.send_with_retry(&req).await?;
        Ok(sse::parse_sse_stream(response))
    }

    /// Sends a non-streaming request and returns the decoded response.
    pub async fn complete_chat(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, MnemoError> {
        let mut req = request.clone();
        req.stream = false;
        let response = self.send_with_retry(&req).await?;

        let body = response.text().await.map_err(|e| MnemoError::Model {
            message: format!("failed to read response body: {e}"),
            source: Some(Box::new(e)),
        })?;
        serde_json::from_str(&body).map_err(|e| MnemoError::Model {
            message: format!("failed to parse API response: {e}"),
            source: Some(Box::new(e)),
        })
    }

    /// Posts `req`, returning the first successful response.
    async fn send_with_retry(
        &self,
        req: &ChatCompletionRequest,
    ) -> Result<reqwest::Response, MnemoError> {
        let mut attempt = 0;
        loop {
            if attempt > 0 {
                warn!(attempt, "retrying request after transient error");
                tokio::time::sleep(self.retry_delay).await;
            }

            let response = self
                .client
                .post(&self.endpoint)
                .json(req)
                .send()
                .await
                .map_err(|e| MnemoError::Model {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, stream = req.stream, "response received");

            if status.is_success() {
                return Ok(response);
            }

            let body = response.text().await.unwrap_or_default();
            if is_transient_error(status) && attempt < self.max_retries {
                warn!(status = %status, body = %body, "transient error, will retry");
                attempt += 1;
                continue;
            }

            let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_err) => format!("model API error ({status}): {}", api_err.describe()),
                Err(_) => format!("API returned {status}: {body}"),
            };
            return Err(MnemoError::model(message));
        }
    }
}

/// Returns true for HTTP status codes that indicate transient errors worth retrying.
fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503)
}
