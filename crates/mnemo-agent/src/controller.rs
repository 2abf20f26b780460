// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-connection turn controller.
//!
//! Each live connection goes through states: Waiting -> Streaming -> Waiting,
//! ending in Closing. While waiting, the controller races the next inbound
//! frame against the heartbeat timer and the shutdown token; the losers are
//! dropped before the next iteration. While streaming, it forwards model
//! increments to the client and keeps watching the transport so a disconnect
//! abandons the generation.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use mnemo_config::model::{GatewayConfig, ModelConfig};
use mnemo_context::ContextFusion;
use mnemo_core::{
    ChatMessage, ConversationStore, Message, MnemoError, ModelAdapter, ModelOptions, ModelStream,
    Role,
};
use mnemo_memory::LongTermMemory;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::frames::{self, ClientFrame, ServerFrame};
use crate::transport::StreamTransport;

/// States in the connection FSM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// Idle, waiting for a message or the heartbeat.
    Waiting,
    /// Forwarding a model response.
    Streaming,
    /// Terminal: the transport is being (or has been) closed.
    Closing,
}

impl std::fmt::Display for ControllerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControllerState::Waiting => write!(f, "waiting"),
            ControllerState::Streaming => write!(f, "streaming"),
            ControllerState::Closing => write!(f, "closing"),
        }
    }
}

/// Most frames queued while a reply is streaming; further ones are refused.
pub const MAX_PENDING_FRAMES: usize = 32;

/// Stores and capabilities shared by every connection.
#[derive(Clone)]
pub struct TurnServices {
    pub store: Arc<dyn ConversationStore>,
    pub fusion: Arc<ContextFusion>,
    pub memory: LongTermMemory,
    pub model: Arc<dyn ModelAdapter>,
}

impl TurnServices {
    /// Validates the target, records the user message and fuses context.
    ///
    /// Nothing is persisted when the knowledge base or conversation is unknown.
    async fn prepare_turn(
        &self,
        content: &str,
        conversation_id: Option<&str>,
        kb: Option<&str>,
    ) -> Result<PreparedTurn, MnemoError> {
        self.fusion.check_kb(kb).await?;

        let conversation_id = match conversation_id {
            Some(id) => {
                self.store
                    .get_conversation(id)
                    .await?
                    .ok_or_else(|| MnemoError::not_found("conversation", id))?
                    .id
            }
            None => {
                let conversation = self.store.create_conversation(None).await?;
                info!(conversation_id = %conversation.id, "conversation created");
                conversation.id
            }
        };

        self.store
            .add_message(&conversation_id, Role::User, content)
            .await?;
        let fused = self.fusion.assemble(&conversation_id, content, kb).await?;
        // Written after fusion so the turn does not recall itself.
        self.memory.remember(&conversation_id, content).await?;

        debug!(
            conversation_id = %conversation_id,
            kb = kb.unwrap_or(""),
            messages = fused.messages.len(),
            segments = fused.segments.len(),
            "context fused"
        );

        Ok(PreparedTurn {
            conversation_id,
            messages: fused.messages,
        })
    }

    /// Records the (possibly partial) reply and feeds it to long-term memory.
    ///
    /// Blank replies are not stored and yield `None`.
    async fn persist_reply(&self, conversation_id: &str, text: &str) -> Result<Option<Message>, MnemoError> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        let message = self
            .store
            .add_message(conversation_id, Role::Assistant, text)
            .await?;
        self.memory.remember(conversation_id, text).await?;
        Ok(Some(message))
    }

    /// Runs a whole turn without streaming: the reply is generated with
    /// [`ModelAdapter::complete`] and persisted before returning.
    ///
    /// Validation matches the streaming path, so an unknown conversation or
    /// knowledge base leaves no trace.
    pub async fn reply(
        &self,
        content: &str,
        conversation_id: Option<&str>,
        kb: Option<&str>,
        options: ModelOptions,
    ) -> Result<TurnReply, MnemoError> {
        if content.trim().is_empty() {
            return Err(MnemoError::InvalidInput("message content must not be empty".into()));
        }
        let conversation_id = conversation_id.filter(|id| !id.is_empty());
        let kb = kb.filter(|name| !name.is_empty());
        let turn = self.prepare_turn(content, conversation_id, kb).await?;
        let response = self.model.complete(turn.messages, options).await?;
        let message = self
            .persist_reply(&turn.conversation_id, &response.content)
            .await?;
        info!(
            conversation_id = %turn.conversation_id,
            chars = response.content.chars().count(),
            "turn completed without streaming"
        );
        Ok(TurnReply {
            conversation_id: turn.conversation_id,
            content: response.content,
            message,
        })
    }
}

/// Result of [`TurnServices::reply`].
#[derive(Debug, Clone)]
pub struct TurnReply {
    pub conversation_id: String,
    pub content: String,
    /// The stored assistant message, absent when the model replied with blank text.
    pub message: Option<Message>,
}

/// Timing and framing knobs for a controller.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub heartbeat: Duration,
    pub segment_size: usize,
    pub options: ModelOptions,
}

impl ControllerSettings {
    pub fn from_config(gateway: &GatewayConfig, model: &ModelConfig) -> Self {
        Self {
            heartbeat: Duration::from_secs(gateway.heartbeat_secs),
            segment_size: gateway.frame_segment_size,
            options: ModelOptions {
                temperature: Some(model.temperature),
                max_tokens: model.max_tokens,
            },
        }
    }
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self::from_config(&GatewayConfig::default(), &ModelConfig::default())
    }
}

enum Flow {
    Continue,
    Close,
}

enum WaitEvent {
    Inbound(Option<Result<String, MnemoError>>),
    Heartbeat,
    Shutdown,
}

enum StreamEvent {
    Delta(Option<Result<mnemo_core::StreamDelta, MnemoError>>),
    Inbound(Option<Result<String, MnemoError>>),
    Shutdown,
}

enum StreamOutcome {
    Completed,
    ModelFailed(MnemoError),
    Disconnected,
    Cancelled,
}

/// A user turn that passed validation and has its model input ready.
struct PreparedTurn {
    conversation_id: String,
    messages: Vec<ChatMessage>,
}

/// Drives one connection from open to close.
pub struct TurnController<T: StreamTransport> {
    services: TurnServices,
    settings: ControllerSettings,
    transport: T,
    cancel: CancellationToken,
    state: ControllerState,
    /// Frames that arrived while streaming, handled in order afterwards.
    /// Holds at most [`MAX_PENDING_FRAMES`].
    pending: VecDeque<String>,
}

impl<T: StreamTransport> TurnController<T> {
    pub fn new(
        services: TurnServices,
        settings: ControllerSettings,
        transport: T,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            services,
            settings,
            transport,
            cancel,
            state: ControllerState::Waiting,
            pending: VecDeque::new(),
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Runs until the client leaves, the transport fails, or shutdown is
    /// requested. The transport is closed exactly once on every exit path.
    pub async fn run(mut self) -> ControllerState {
        debug!("connection controller started");

        loop {
            let flow = match self.pending.pop_front() {
                Some(text) => self.handle_text(text).await,
                None => self.wait().await,
            };
            if let Flow::Close = flow {
                break;
            }
        }

        self.close().await;
        self.state
    }

    async fn wait(&mut self) -> Flow {
        self.state = ControllerState::Waiting;

        let event = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => WaitEvent::Shutdown,
            inbound = self.transport.recv() => WaitEvent::Inbound(inbound),
            _ = tokio::time::sleep(self.settings.heartbeat) => WaitEvent::Heartbeat,
        };

        match event {
            WaitEvent::Shutdown => {
                info!("shutdown requested, closing connection");
                Flow::Close
            }
            WaitEvent::Inbound(Some(Ok(text))) => self.handle_text(text).await,
            WaitEvent::Inbound(Some(Err(e))) => {
                warn!(error = %e, "transport receive failed");
                Flow::Close
            }
            WaitEvent::Inbound(None) => {
                debug!("client disconnected");
                Flow::Close
            }
            WaitEvent::Heartbeat => {
                debug!("heartbeat");
                self.send_frame(&ServerFrame::Ping).await
            }
        }
    }

    async fn close(&mut self) {
        self.state = ControllerState::Closing;
        if let Err(e) = self.transport.close().await {
            debug!(error = %e, "transport close failed");
        }
        debug!("connection closed");
    }

    /// Serializes `frame` and sends it in wire segments.
    async fn send_frame(&mut self, frame: &ServerFrame) -> Flow {
        let text = match serde_json::to_string(frame) {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, kind = frame.kind(), "failed to serialize frame");
                return Flow::Continue;
            }
        };
        for segment in frames::segment(&text, self.settings.segment_size) {
            if let Err(e) = self.transport.send(segment).await {
                debug!(error = %e, kind = frame.kind(), "send failed");
                return Flow::Close;
            }
        }
        Flow::Continue
    }

    async fn handle_text(&mut self, text: String) -> Flow {
        let frame = match frames::parse_client_frame(&text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = ?e, "rejected inbound frame");
                return self.send_frame(&ServerFrame::error(e.client_message())).await;
            }
        };

        match frame {
            ClientFrame::UserMessage {
                content,
                conversation_id,
                kb,
            } => {
                if content.trim().is_empty() {
                    return self
                        .send_frame(&ServerFrame::error("message content must not be empty"))
                        .await;
                }
                let conversation_id = conversation_id.filter(|id| !id.is_empty());
                let kb = kb.filter(|name| !name.is_empty());
                let prepared = self
                    .services
                    .prepare_turn(&content, conversation_id.as_deref(), kb.as_deref())
                    .await;
                match prepared {
                    Ok(turn) => self.stream_turn(turn).await,
                    Err(e) => {
                        warn!(error = %e, "turn rejected");
                        self.send_frame(&ServerFrame::error(e.to_string())).await
                    }
                }
            }
            ClientFrame::Unknown => {
                debug!("ignoring frame of unknown type");
                Flow::Continue
            }
        }
    }

    async fn stream_turn(&mut self, turn: PreparedTurn) -> Flow {
        self.state = ControllerState::Streaming;
        if let Flow::Close = self.send_frame(&ServerFrame::StreamStart).await {
            return Flow::Close;
        }

        let mut buffer = String::new();
        let outcome = match self
            .services
            .model
            .stream(turn.messages, self.settings.options.clone())
            .await
        {
            Ok(stream) => self.forward(stream, &mut buffer).await,
            Err(e) => StreamOutcome::ModelFailed(e),
        };

        let persisted = self.services.persist_reply(&turn.conversation_id, &buffer).await;
        if let Err(e) = &persisted {
            error!(conversation_id = %turn.conversation_id, error = %e, "failed to persist reply");
        }

        match outcome {
            StreamOutcome::Disconnected => {
                debug!(conversation_id = %turn.conversation_id, "client left mid-stream");
                return Flow::Close;
            }
            StreamOutcome::Cancelled => {
                info!(conversation_id = %turn.conversation_id, "stream abandoned for shutdown");
                return Flow::Close;
            }
            StreamOutcome::ModelFailed(e) => {
                warn!(
                    conversation_id = %turn.conversation_id,
                    error = %e,
                    partial_chars = buffer.chars().count(),
                    "model stream failed"
                );
                if let Flow::Close = self.send_frame(&ServerFrame::error(e.to_string())).await {
                    return Flow::Close;
                }
            }
            StreamOutcome::Completed => {
                info!(
                    conversation_id = %turn.conversation_id,
                    chars = buffer.chars().count(),
                    "turn completed"
                );
            }
        }

        if let Err(e) = persisted {
            if let Flow::Close = self.send_frame(&ServerFrame::error(e.to_string())).await {
                return Flow::Close;
            }
        }

        self.state = ControllerState::Waiting;
        self.send_frame(&ServerFrame::StreamEnd {
            content: buffer,
            conversation_id: turn.conversation_id,
        })
        .await
    }

    /// Forwards increments until the stream ends, fails, or the connection goes away.
    async fn forward(&mut self, mut stream: ModelStream, buffer: &mut String) -> StreamOutcome {
        loop {
            let event = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => StreamEvent::Shutdown,
                inbound = self.transport.recv() => StreamEvent::Inbound(inbound),
                delta = stream.next() => StreamEvent::Delta(delta),
            };

            match event {
                StreamEvent::Shutdown => return StreamOutcome::Cancelled,
                StreamEvent::Inbound(Some(Ok(text))) => {
                    if self.pending.len() < MAX_PENDING_FRAMES {
                        self.pending.push_back(text);
                        continue;
                    }
                    warn!(queued = self.pending.len(), "queue full, refusing frame");
                    let refused = ServerFrame::error(format!(
                        "too many messages queued, at most {MAX_PENDING_FRAMES} wait for the current reply"
                    ));
                    if let Flow::Close = self.send_frame(&refused).await {
                        return StreamOutcome::Disconnected;
                    }
                }
                StreamEvent::Inbound(Some(Err(e))) => {
                    warn!(error = %e, "transport receive failed mid-stream");
                    return StreamOutcome::Disconnected;
                }
                StreamEvent::Inbound(None) => return StreamOutcome::Disconnected,
                StreamEvent::Delta(None) => return StreamOutcome::Completed,
                StreamEvent::Delta(Some(Err(e))) => return StreamOutcome::ModelFailed(e),
                StreamEvent::Delta(Some(Ok(delta))) => {
                    if delta.text.is_empty() {
                        continue;
                    }
                    buffer.push_str(&delta.text);
                    let chunk = ServerFrame::StreamChunk {
                        content: delta.text,
                    };
                    if let Flow::Close = self.send_frame(&chunk).await {
                        return StreamOutcome::Disconnected;
                    }
                }
            }
        }
    }
}
