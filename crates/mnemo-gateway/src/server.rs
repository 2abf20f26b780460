// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::routing::{get, post, put};
use mnemo_agent::{ControllerSettings, TurnServices};
use mnemo_config::model::{KnowledgeConfig, MnemoConfig};
use mnemo_context::ContextFusion;
use mnemo_core::{MnemoError, ModelAdapter};
use mnemo_ingest::{IngestionPipeline, KnowledgeBaseManager, document_chunker, memory_chunker};
use mnemo_memory::LongTermMemory;
use mnemo_storage::{Database, SqliteStorage};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::files::ConversationFiles;
use crate::{files, handlers, kb, ws};

/// Health state for the unauthenticated health endpoint.
#[derive(Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: Instant,
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Stores and model shared by every turn controller.
    pub services: TurnServices,
    /// Concrete store for the REST conversation routes.
    pub storage: Arc<SqliteStorage>,
    pub kb: Arc<KnowledgeBaseManager>,
    pub files: Arc<ConversationFiles>,
    pub settings: ControllerSettings,
    pub knowledge: KnowledgeConfig,
    /// Cancelled on process shutdown; every connection holds a child token.
    pub shutdown: CancellationToken,
    /// Live WebSocket connections.
    pub connections: TaskTracker,
    pub health: HealthState,
}

impl GatewayState {
    /// Wires every store over one open database.
    pub fn assemble(
        config: &MnemoConfig,
        database: Database,
        model: Arc<dyn ModelAdapter>,
        shutdown: CancellationToken,
    ) -> Result<Self, MnemoError> {
        let storage = Arc::new(SqliteStorage::with_database(
            config.storage.clone(),
            database.clone(),
        ));
        let index = mnemo_index::open(&database, &config.index)?;
        let memory = LongTermMemory::new(
            index.clone(),
            memory_chunker(&config.chunking),
            &config.memory,
        );
        let fusion = Arc::new(ContextFusion::new(
            storage.clone(),
            index.clone(),
            memory.clone(),
            &config.context,
        ));
        let pipeline = IngestionPipeline::new(index, document_chunker(&config.chunking));
        let files = Arc::new(ConversationFiles::new(
            storage.clone(),
            pipeline.clone(),
            &config.knowledge.uploads_dir,
        ));
        let kb = Arc::new(KnowledgeBaseManager::new(
            &config.knowledge.root_dir,
            pipeline,
            &config.memory.namespace,
        ));

        Ok(Self {
            services: TurnServices {
                store: storage.clone(),
                fusion,
                memory,
                model,
            },
            storage,
            kb,
            files,
            settings: ControllerSettings::from_config(&config.gateway, &config.model),
            knowledge: config.knowledge.clone(),
            shutdown,
            connections: TaskTracker::new(),
            health: HealthState {
                start_time: Instant::now(),
            },
        })
    }
}

/// All gateway routes with CORS and request tracing.
pub fn router(state: GatewayState) -> Router {
    let conversation_routes = Router::new()
        .route(
            "/api/conversations",
            get(handlers::list_conversations).post(handlers::create_conversation),
        )
        .route(
            "/api/conversations/{id}",
            get(handlers::get_conversation).delete(handlers::delete_conversation),
        )
        .route("/api/conversations/{id}/messages", get(handlers::get_messages))
        .route("/api/conversations/{id}/clear", post(handlers::clear_messages))
        .route("/api/conversations/{id}/title", put(handlers::rename_conversation))
        .route("/api/conversations/{id}/files", get(files::list_files))
        .route(
            "/api/conversations/{id}/files/{file}",
            post(files::upload_file).delete(files::delete_file),
        )
        .route("/api/chat", post(handlers::chat));

    let kb_routes = Router::new()
        .route("/api/kb", get(kb::list_kbs).post(kb::create_kb))
        .route("/api/kb/{name}", axum::routing::delete(kb::delete_kb))
        .route("/api/kb/{name}/rename", post(kb::rename_kb))
        .route("/api/kb/{name}/status", get(kb::kb_status))
        .route("/api/kb/{name}/docs", get(kb::list_documents))
        .route(
            "/api/kb/{name}/docs/{file}",
            post(kb::upload_document).delete(kb::delete_document),
        )
        .route("/api/kb/{name}/rebuild", post(kb::rebuild_kb))
        .route("/api/kb/{name}/docs/{file}/segments", get(kb::document_segments))
        .route("/api/kb/{name}/docs/{file}/preview", get(kb::document_preview))
        .route("/api/kb/{name}/docs/{file}/export", get(kb::export_document))
        .route("/api/kb/{name}/docs/{file}/summary", post(kb::summarize_document))
        .route("/api/kb/{name}/docs/{file}/summary/export", get(kb::export_summary))
        .route("/api/kb/{name}/query", post(kb::query_kb));

    Router::new()
        .route("/health", get(handlers::get_health))
        .route("/ws", get(ws::ws_handler))
        .merge(conversation_routes)
        .merge(kb_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the gateway on `host:port` until the shutdown token fires.
pub async fn start_server(host: &str, port: u16, state: GatewayState) -> Result<(), MnemoError> {
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| MnemoError::Channel {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    info!("gateway listening on {addr}");
    serve(listener, state).await
}

/// Serve on an already-bound listener until the shutdown token fires.
pub async fn serve(listener: tokio::net::TcpListener, state: GatewayState) -> Result<(), MnemoError> {
    let shutdown = state.shutdown.clone();
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(|e| MnemoError::Channel {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })
}
