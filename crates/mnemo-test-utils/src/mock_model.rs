// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock chat model for deterministic testing.
//!
//! `MockModel` implements `ModelAdapter` with scripted replies, enabling fast,
//! CI-runnable tests without external API calls.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::{StreamExt, stream};

use mnemo_core::{
    AdapterType, ChatMessage, HealthStatus, MnemoError, ModelAdapter, ModelOptions, ModelResponse,
    ModelStream, PluginAdapter, StreamDelta, TokenUsage,
};

/// Default reply when the script is exhausted.
pub const DEFAULT_REPLY: &str = "mock reply";

/// One scripted model reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Streams the given increments, then completes.
    Increments(Vec<String>),
    /// Streams the increments, then yields a model error.
    FailAfter(Vec<String>, String),
    /// The stream call itself fails.
    Refuse(String),
    /// Streams the increments, then never completes.
    Hang(Vec<String>),
}

impl MockReply {
    pub fn text(text: &str) -> Self {
        Self::Increments(vec![text.to_string()])
    }

    pub fn increments(parts: &[&str]) -> Self {
        Self::Increments(parts.iter().map(|p| p.to_string()).collect())
    }

    fn full_text(&self) -> Result<String, MnemoError> {
        match self {
            Self::Increments(parts) | Self::Hang(parts) => Ok(parts.concat()),
            Self::FailAfter(_, message) | Self::Refuse(message) => {
                Err(MnemoError::model(message.clone()))
            }
        }
    }
}

/// Increments the shared counter when the stream it lives in is dropped.
struct DropGuard(Arc<AtomicUsize>);

impl Drop for DropGuard {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// A mock model that plays back scripted replies.
///
/// Replies are popped from a FIFO queue. When the queue is empty,
/// [`DEFAULT_REPLY`] is streamed.
#[derive(Default)]
pub struct MockModel {
    replies: Mutex<VecDeque<MockReply>>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
    dropped_streams: Arc<AtomicUsize>,
}

impl MockModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replies(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Self::default()
        }
    }

    /// Add a reply to the end of the queue.
    pub fn push(&self, reply: MockReply) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply);
        }
    }

    /// The message lists received so far, in call order.
    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// How many returned streams have been dropped, finished or not.
    pub fn dropped_streams(&self) -> usize {
        self.dropped_streams.load(Ordering::SeqCst)
    }

    fn next_reply(&self, messages: Vec<ChatMessage>) -> MockReply {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(messages);
        }
        self.replies
            .lock()
            .ok()
            .and_then(|mut r| r.pop_front())
            .unwrap_or_else(|| MockReply::text(DEFAULT_REPLY))
    }
}

#[async_trait]
impl PluginAdapter for MockModel {
    fn name(&self) -> &str {
        "mock-model"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Model
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemoError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MnemoError> {
        Ok(())
    }
}

#[async_trait]
impl ModelAdapter for MockModel {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        _options: ModelOptions,
    ) -> Result<ModelResponse, MnemoError> {
        let content = self.next_reply(messages).full_text()?;
        Ok(ModelResponse {
            content,
            model: "mock".into(),
            finish_reason: Some("stop".into()),
            usage: Some(TokenUsage {
                input_tokens: 10,
                output_tokens: 20,
            }),
        })
    }

    async fn stream(
        &self,
        messages: Vec<ChatMessage>,
        _options: ModelOptions,
    ) -> Result<ModelStream, MnemoError> {
        let reply = self.next_reply(messages);
        let guard = DropGuard(self.dropped_streams.clone());

        let deltas = |parts: Vec<String>| {
            stream::iter(parts.into_iter().map(|p| Ok(StreamDelta::text(p))))
        };
        let body: ModelStream = match reply {
            MockReply::Increments(parts) => Box::pin(deltas(parts)),
            MockReply::FailAfter(parts, message) => Box::pin(
                deltas(parts).chain(stream::once(async move { Err(MnemoError::model(message)) })),
            ),
            MockReply::Hang(parts) => Box::pin(deltas(parts).chain(stream::pending())),
            MockReply::Refuse(message) => return Err(MnemoError::model(message)),
        };

        Ok(Box::pin(body.map(move |item| {
            let _ = &guard;
            item
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(model: &MockModel) -> Vec<Result<StreamDelta, MnemoError>> {
        model
            .stream(vec![ChatMessage::user("hi")], ModelOptions::default())
            .await
            .unwrap()
            .collect()
            .await
    }

    #[tokio::test]
    async fn default_reply_when_queue_empty() {
        let model = MockModel::new();
        let items = collect(&model).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap().text, DEFAULT_REPLY);
        assert_eq!(model.calls().len(), 1);
        assert_eq!(model.dropped_streams(), 1);
    }

    #[tokio::test]
    async fn replies_are_played_in_order() {
        let model = MockModel::with_replies(vec![
            MockReply::increments(&["你", "好"]),
            MockReply::text("second"),
        ]);
        let first: Vec<String> = collect(&model)
            .await
            .into_iter()
            .map(|d| d.unwrap().text)
            .collect();
        assert_eq!(first, vec!["你", "好"]);

        let response = model
            .complete(vec![ChatMessage::user("again")], ModelOptions::default())
            .await
            .unwrap();
        assert_eq!(response.content, "second");
    }

    #[tokio::test]
    async fn fail_after_yields_error_last() {
        let model = MockModel::with_replies(vec![MockReply::FailAfter(
            vec!["partial".into()],
            "boom".into(),
        )]);
        let items = collect(&model).await;
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(matches!(items[1], Err(MnemoError::Model { .. })));
    }

    #[tokio::test]
    async fn refuse_fails_the_call() {
        let model = MockModel::with_replies(vec![MockReply::Refuse("down".into())]);
        let result = model
            .stream(vec![ChatMessage::user("hi")], ModelOptions::default())
            .await;
        assert!(result.is_err());
    }
}
