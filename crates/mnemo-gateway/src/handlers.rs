// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP handlers for health, conversation and non-streaming chat routes.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use mnemo_core::{Conversation, ConversationStore, Message, MnemoError};
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::server::GatewayState;

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub model: String,
}

/// Request body for POST /api/conversations.
#[derive(Debug, Default, Deserialize)]
pub struct CreateConversationRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Request body for PUT /api/conversations/{id}/title.
#[derive(Debug, Deserialize)]
pub struct RenameConversationRequest {
    pub title: String,
}

/// Request body for POST /api/chat.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub kb: Option<String>,
}

/// Response body for POST /api/chat.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub conversation_id: String,
    pub content: String,
    /// The stored assistant message; absent for a blank reply.
    pub message: Option<Message>,
}

/// One row of GET /api/conversations.
#[derive(Debug, Serialize)]
pub struct ConversationSummary {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub preview: String,
}

/// Response body for GET /api/conversations/{id}/messages.
#[derive(Debug, Serialize)]
pub struct MessageListResponse {
    pub conversation_id: String,
    pub messages: Vec<Message>,
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    let model = state.services.model.name().to_string();
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
        model,
    })
}

/// GET /api/conversations
pub async fn list_conversations(
    State(state): State<GatewayState>,
) -> ApiResult<Json<Vec<ConversationSummary>>> {
    let conversations = state.storage.list_conversations().await?;
    let mut summaries = Vec::with_capacity(conversations.len());
    for conversation in conversations {
        let preview = state.storage.conversation_preview(&conversation.id).await?;
        summaries.push(ConversationSummary {
            conversation,
            preview,
        });
    }
    Ok(Json(summaries))
}

/// POST /api/conversations
pub async fn create_conversation(
    State(state): State<GatewayState>,
    body: Option<Json<CreateConversationRequest>>,
) -> ApiResult<(StatusCode, Json<Conversation>)> {
    let Json(body) = body.unwrap_or_default();
    let conversation = state
        .storage
        .create_conversation_for(body.title.as_deref(), body.user_id.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(conversation)))
}

async fn require_conversation(state: &GatewayState, id: &str) -> ApiResult<Conversation> {
    state
        .storage
        .get_conversation(id)
        .await?
        .ok_or_else(|| MnemoError::not_found("conversation", id).into())
}

/// GET /api/conversations/{id}
pub async fn get_conversation(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Conversation>> {
    Ok(Json(require_conversation(&state, &id).await?))
}

/// DELETE /api/conversations/{id}
pub async fn delete_conversation(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    if state.storage.delete_conversation(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(MnemoError::not_found("conversation", &id).into())
    }
}

/// GET /api/conversations/{id}/messages
pub async fn get_messages(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageListResponse>> {
    require_conversation(&state, &id).await?;
    let messages = state.storage.get_messages(&id).await?;
    Ok(Json(MessageListResponse {
        conversation_id: id,
        messages,
    }))
}

/// PUT /api/conversations/{id}/title
pub async fn rename_conversation(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    Json(body): Json<RenameConversationRequest>,
) -> ApiResult<Json<Conversation>> {
    let title = body.title.trim();
    if title.is_empty() {
        return Err(MnemoError::InvalidInput("title must not be empty".into()).into());
    }
    if !state.storage.update_title(&id, title).await? {
        return Err(MnemoError::not_found("conversation", &id).into());
    }
    Ok(Json(require_conversation(&state, &id).await?))
}

/// POST /api/chat
///
/// One whole turn without streaming: same validation, fusion and
/// persistence as the WebSocket path.
pub async fn chat(
    State(state): State<GatewayState>,
    Json(body): Json<ChatRequest>,
) -> ApiResult<Json<ChatResponse>> {
    let reply = state
        .services
        .reply(
            &body.message,
            body.conversation_id.as_deref(),
            body.kb.as_deref(),
            state.settings.options.clone(),
        )
        .await?;
    Ok(Json(ChatResponse {
        conversation_id: reply.conversation_id,
        content: reply.content,
        message: reply.message,
    }))
}

/// POST /api/conversations/{id}/clear
pub async fn clear_messages(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    if state.storage.clear_messages(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(MnemoError::not_found("conversation", &id).into())
    }
}
