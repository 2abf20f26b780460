// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket endpoint driving one turn controller per connection.
//!
//! Client -> Server (JSON):
//! ```json
//! {"type": "user_message", "content": "你好", "conversation_id": null, "kb": null}
//! ```
//!
//! Server -> Client (JSON, possibly split over several text frames):
//! ```json
//! {"type": "stream_start"}
//! {"type": "stream_chunk", "content": "partial..."}
//! {"type": "stream_end", "content": "full response", "conversation_id": "..."}
//! {"type": "ping"}
//! {"type": "error", "content": "..."}
//! ```

use async_trait::async_trait;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use mnemo_agent::{StreamTransport, TurnController};
use mnemo_core::MnemoError;
use tracing::{Instrument, info_span};

use crate::server::GatewayState;

/// [`StreamTransport`] over an axum WebSocket.
pub struct WsTransport {
    socket: WebSocket,
    closed: bool,
}

impl WsTransport {
    pub fn new(socket: WebSocket) -> Self {
        Self {
            socket,
            closed: false,
        }
    }
}

fn ws_err(context: &str, e: axum::Error) -> MnemoError {
    MnemoError::Channel {
        message: format!("{context}: {e}"),
        source: Some(Box::new(e)),
    }
}

#[async_trait]
impl StreamTransport for WsTransport {
    async fn recv(&mut self) -> Option<Result<String, MnemoError>> {
        loop {
            match self.socket.recv().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_owned())),
                Ok(Message::Close(_)) => return None,
                // Protocol pings are answered by the websocket layer.
                Ok(Message::Binary(_) | Message::Ping(_) | Message::Pong(_)) => continue,
                Err(e) => return Some(Err(ws_err("websocket receive failed", e))),
            }
        }
    }

    async fn send(&mut self, text: String) -> Result<(), MnemoError> {
        self.socket
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| ws_err("websocket send failed", e))
    }

    async fn close(&mut self) -> Result<(), MnemoError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.socket
            .send(Message::Close(None))
            .await
            .map_err(|e| ws_err("websocket close failed", e))
    }
}

/// WebSocket upgrade handler.
///
/// Each connection runs its controller on a tracked task so shutdown can
/// wait for it.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<GatewayState>) -> Response {
    ws.on_upgrade(move |socket| {
        let connection_id = uuid::Uuid::new_v4().to_string();
        let controller = TurnController::new(
            state.services.clone(),
            state.settings.clone(),
            WsTransport::new(socket),
            state.shutdown.child_token(),
        );
        let run = async move {
            tracing::info!("websocket connected");
            let final_state = controller.run().await;
            tracing::info!(state = %final_state, "websocket finished");
        }
        .instrument(info_span!("ws", connection_id = %connection_id));
        state.connections.track_future(run)
    })
}
