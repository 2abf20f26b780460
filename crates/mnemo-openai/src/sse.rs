// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SSE stream parser for Chat Completions streaming responses.
//!
//! Converts a reqwest response byte stream into typed [`StreamEvent`]s using
//! the `eventsource-stream` crate for SSE protocol compliance. The stream
//! ends at the `[DONE]` sentinel.

use std::pin::Pin;

use eventsource_stream::Eventsource;
use futures::future;
use futures::stream::{Stream, StreamExt};
use mnemo_core::MnemoError;
use serde::Deserialize;

use crate::types::{ApiErrorResponse, ChatCompletionChunk};

/// Payload that terminates a streaming response.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Typed events of a streaming response.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    Chunk(ChatCompletionChunk),
    /// The API reported an error mid-stream.
    Error(ApiErrorResponse),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Payload {
    Chunk(ChatCompletionChunk),
    Error(ApiErrorResponse),
}

/// Decode one `data:` payload. `None` for keep-alive blanks.
pub fn parse_event_data(data: &str) -> Option<Result<StreamEvent, MnemoError>> {
    let data = data.trim();
    if data.is_empty() {
        return None;
    }
    let parsed = serde_json::from_str::<Payload>(data)
        .map(|p| match p {
            Payload::Chunk(c) => StreamEvent::Chunk(c),
            Payload::Error(e) => StreamEvent::Error(e),
        })
        .map_err(|e| MnemoError::Model {
            message: format!("undecodable stream payload: {e}"),
            source: Some(Box::new(e)),
        });
    Some(parsed)
}

/// Parses a reqwest streaming response into a stream of [`StreamEvent`]s.
pub fn parse_sse_stream(
    response: reqwest::Response,
) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, MnemoError>> + Send>> {
    let events = response
        .bytes_stream()
        .eventsource()
        .take_while(|result| {
            future::ready(!matches!(result, Ok(event) if event.data.trim() == DONE_SENTINEL))
        });

    let mapped = events.filter_map(|result| async move {
        match result {
            Ok(event) => parse_event_data(&event.data),
            Err(e) => Some(Err(MnemoError::model(format!("SSE stream error: {e}")))),
        }
    });

    Box::pin(mapped)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Serve `sse_text` from wiremock to get a real reqwest::Response.
    async fn mock_sse_response(sse_text: &str) -> reqwest::Response {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse_text.to_string()),
            )
            .mount(&server)
            .await;

        reqwest::get(&server.uri()).await.unwrap()
    }

    fn chunk(text: &str) -> String {
        format!("data: {{\"choices\":[{{\"index\":0,\"delta\":{{\"content\":\"{text}\"}}}}]}}\n\n")
    }

    #[tokio::test]
    async fn parses_chunks_until_done() {
        let sse = format!("{}{}data: [DONE]\n\n{}", chunk("你"), chunk("好"), chunk("ignored"));
        let events: Vec<_> = parse_sse_stream(mock_sse_response(&sse).await).collect().await;
        assert_eq!(events.len(), 2);
        match &events[1] {
            Ok(StreamEvent::Chunk(c)) => assert_eq!(c.choices[0].delta.content.as_deref(), Some("好")),
            other => panic!("expected chunk, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn error_payload_becomes_error_event() {
        let sse = "data: {\"error\":{\"message\":\"Overloaded\",\"type\":\"server_error\"}}\n\n";
        let mut stream = parse_sse_stream(mock_sse_response(sse).await);
        match stream.next().await {
            Some(Ok(StreamEvent::Error(e))) => assert_eq!(e.error.message, "Overloaded"),
            other => panic!("expected error event, got {other:?}"),
        }
    }

    #[test]
    fn blank_data_is_skipped_and_garbage_is_an_error() {
        assert!(parse_event_data("  ").is_none());
        assert!(matches!(parse_event_data("{not json"), Some(Err(MnemoError::Model { .. }))));
    }
}
