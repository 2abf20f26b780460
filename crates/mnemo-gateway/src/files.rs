// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Files uploaded into a conversation.
//!
//! Each upload is stored under a unique name in the uploads directory,
//! recorded in the `files` table, and ingested into the conversation's own
//! document namespace, where context fusion picks it up on later turns.

use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use mnemo_core::{ConversationStore, FileRecord, MnemoError};
use mnemo_index::conversation_namespace;
use mnemo_ingest::IngestionPipeline;
use mnemo_ingest::kb::validate_name;
use mnemo_storage::SqliteStorage;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::error::ApiResult;
use crate::server::GatewayState;

fn io_err(e: std::io::Error) -> MnemoError {
    MnemoError::Storage { source: Box::new(e) }
}

/// Response body for a conversation file upload.
#[derive(Debug, Serialize)]
pub struct FileUploadResponse {
    pub record: FileRecord,
    pub namespace: String,
    pub chunks: usize,
}

/// Upload, listing and removal of conversation files.
pub struct ConversationFiles {
    storage: Arc<SqliteStorage>,
    pipeline: IngestionPipeline,
    uploads_dir: PathBuf,
}

impl ConversationFiles {
    pub fn new(
        storage: Arc<SqliteStorage>,
        pipeline: IngestionPipeline,
        uploads_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            storage,
            pipeline,
            uploads_dir: uploads_dir.into(),
        }
    }

    async fn require_conversation(&self, conversation_id: &str) -> Result<(), MnemoError> {
        match self.storage.get_conversation(conversation_id).await? {
            Some(_) => Ok(()),
            None => Err(MnemoError::not_found("conversation", conversation_id)),
        }
    }

    /// Save `bytes`, record them, and ingest them into `conv_{id}`.
    pub async fn upload(
        &self,
        conversation_id: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<FileUploadResponse, MnemoError> {
        validate_name("file", file_name)?;
        self.require_conversation(conversation_id).await?;

        let format = FsPath::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_lowercase()))
            .unwrap_or_default();
        let stored_name = format!("{conversation_id}_{}{format}", uuid::Uuid::new_v4());
        tokio::fs::create_dir_all(&self.uploads_dir)
            .await
            .map_err(io_err)?;
        let path = self.uploads_dir.join(&stored_name);
        tokio::fs::write(&path, bytes).await.map_err(io_err)?;

        let namespace = conversation_namespace(conversation_id);
        let report = self.pipeline.ingest(&namespace, &stored_name, &path).await?;
        let info = json!({
            "file_size": bytes.len(),
            "file_format": format,
            "stored_name": stored_name,
            "chunks": report.chunk_count,
        });
        let record = self
            .storage
            .add_file_record(
                Some(conversation_id),
                file_name,
                &path.to_string_lossy(),
                Some(info),
            )
            .await?;
        info!(
            conversation_id,
            file = file_name,
            chunks = report.chunk_count,
            "conversation file ingested"
        );
        Ok(FileUploadResponse {
            record,
            namespace,
            chunks: report.chunk_count,
        })
    }

    pub async fn list(&self, conversation_id: &str) -> Result<Vec<FileRecord>, MnemoError> {
        self.require_conversation(conversation_id).await?;
        self.storage.list_file_records(conversation_id).await
    }

    /// Drop the record, its vectors and the stored file.
    pub async fn delete(&self, conversation_id: &str, file_id: &str) -> Result<(), MnemoError> {
        let record = self
            .storage
            .file_record(file_id)
            .await?
            .filter(|r| r.conversation_id.as_deref() == Some(conversation_id))
            .ok_or_else(|| MnemoError::not_found("file", file_id))?;

        let path = PathBuf::from(&record.file_path);
        if let Some(stored_name) = path.file_name().and_then(|n| n.to_str()) {
            self.pipeline
                .index()
                .delete_by_source(&conversation_namespace(conversation_id), stored_name)
                .await?;
        }
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "stored upload already gone");
            }
            Err(e) => return Err(io_err(e)),
        }
        self.storage.delete_file_record(file_id).await?;
        info!(conversation_id, file_id, "conversation file deleted");
        Ok(())
    }
}

/// POST /api/conversations/{id}/files/{file}
///
/// The request body is the raw file content.
pub async fn upload_file(
    State(state): State<GatewayState>,
    Path((id, file)): Path<(String, String)>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<FileUploadResponse>)> {
    let response = state.files.upload(&id, &file, &body).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/conversations/{id}/files
pub async fn list_files(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<FileRecord>>> {
    Ok(Json(state.files.list(&id).await?))
}

/// DELETE /api/conversations/{id}/files/{file_id}
pub async fn delete_file(
    State(state): State<GatewayState>,
    Path((id, file_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    state.files.delete(&id, &file_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
