// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP handlers for knowledge base management.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use mnemo_ingest::kb::{
    DeleteDocumentReport, DocumentInfo, DocumentPreview, KbStatus, KbSummary, QueryAnswer,
    RebuildReport, SegmentPage, UploadReport,
};
use mnemo_ingest::{DocumentSummary, ExportFormat, SegmentBasis};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::server::GatewayState;

#[derive(Debug, Deserialize)]
pub struct CreateKbRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct RenameKbRequest {
    pub new_name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteDocumentParams {
    /// Keep the source file and drop only its vectors.
    #[serde(default)]
    pub keep_file: bool,
}

#[derive(Debug, Deserialize)]
pub struct SegmentParams {
    #[serde(default = "first_page")]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default)]
    pub basis: SegmentBasis,
}

fn first_page() -> usize {
    1
}

fn default_page_size() -> usize {
    10
}

#[derive(Debug, Default, Deserialize)]
pub struct PreviewParams {
    #[serde(default)]
    pub max_len: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportParams {
    #[serde(default)]
    pub format: ExportFormat,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    #[serde(default)]
    pub top_k: Option<usize>,
}

/// GET /api/kb
pub async fn list_kbs(State(state): State<GatewayState>) -> ApiResult<Json<Vec<KbSummary>>> {
    Ok(Json(state.kb.list().await?))
}

/// POST /api/kb
pub async fn create_kb(
    State(state): State<GatewayState>,
    Json(body): Json<CreateKbRequest>,
) -> ApiResult<(StatusCode, Json<KbStatus>)> {
    state.kb.create(&body.name).await?;
    Ok((StatusCode::CREATED, Json(state.kb.status(&body.name).await?)))
}

/// DELETE /api/kb/{name}
pub async fn delete_kb(
    State(state): State<GatewayState>,
    Path(name): Path<String>,
) -> ApiResult<StatusCode> {
    state.kb.delete(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/kb/{name}/rename
pub async fn rename_kb(
    State(state): State<GatewayState>,
    Path(name): Path<String>,
    Json(body): Json<RenameKbRequest>,
) -> ApiResult<Json<KbStatus>> {
    state.kb.rename(&name, &body.new_name).await?;
    Ok(Json(state.kb.status(&body.new_name).await?))
}

/// GET /api/kb/{name}/status
pub async fn kb_status(
    State(state): State<GatewayState>,
    Path(name): Path<String>,
) -> ApiResult<Json<KbStatus>> {
    Ok(Json(state.kb.status(&name).await?))
}

/// GET /api/kb/{name}/docs
pub async fn list_documents(
    State(state): State<GatewayState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Vec<DocumentInfo>>> {
    Ok(Json(state.kb.list_documents(&name).await?))
}

/// POST /api/kb/{name}/docs/{file}
///
/// The request body is the raw file content.
pub async fn upload_document(
    State(state): State<GatewayState>,
    Path((name, file)): Path<(String, String)>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<UploadReport>)> {
    let report = state.kb.upload(&name, &file, &body).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

/// DELETE /api/kb/{name}/docs/{file}
pub async fn delete_document(
    State(state): State<GatewayState>,
    Path((name, file)): Path<(String, String)>,
    Query(params): Query<DeleteDocumentParams>,
) -> ApiResult<Json<DeleteDocumentReport>> {
    Ok(Json(
        state.kb.delete_document(&name, &file, params.keep_file).await?,
    ))
}

/// POST /api/kb/{name}/rebuild
pub async fn rebuild_kb(
    State(state): State<GatewayState>,
    Path(name): Path<String>,
) -> ApiResult<Json<RebuildReport>> {
    Ok(Json(state.kb.rebuild(&name).await?))
}

/// GET /api/kb/{name}/docs/{file}/segments
pub async fn document_segments(
    State(state): State<GatewayState>,
    Path((name, file)): Path<(String, String)>,
    Query(params): Query<SegmentParams>,
) -> ApiResult<Json<SegmentPage>> {
    let page = state
        .kb
        .segments(&name, &file, params.page, params.page_size, params.basis)
        .await?;
    Ok(Json(page))
}

/// GET /api/kb/{name}/docs/{file}/preview
pub async fn document_preview(
    State(state): State<GatewayState>,
    Path((name, file)): Path<(String, String)>,
    Query(params): Query<PreviewParams>,
) -> ApiResult<Json<DocumentPreview>> {
    let max_len = params.max_len.unwrap_or(state.knowledge.preview_chars);
    Ok(Json(state.kb.preview(&name, &file, max_len).await?))
}

fn content_type(format: ExportFormat) -> &'static str {
    match format {
        ExportFormat::Txt => "text/plain; charset=utf-8",
        ExportFormat::Md => "text/markdown; charset=utf-8",
    }
}

/// GET /api/kb/{name}/docs/{file}/export
pub async fn export_document(
    State(state): State<GatewayState>,
    Path((name, file)): Path<(String, String)>,
    Query(params): Query<ExportParams>,
) -> ApiResult<impl IntoResponse> {
    let text = state.kb.export(&name, &file, params.format).await?;
    Ok(([(header::CONTENT_TYPE, content_type(params.format))], text))
}

/// POST /api/kb/{name}/docs/{file}/summary
pub async fn summarize_document(
    State(state): State<GatewayState>,
    Path((name, file)): Path<(String, String)>,
) -> ApiResult<Json<DocumentSummary>> {
    let summary = state
        .kb
        .summarize(state.services.model.as_ref(), &name, &file)
        .await?;
    Ok(Json(summary))
}

/// GET /api/kb/{name}/docs/{file}/summary/export
pub async fn export_summary(
    State(state): State<GatewayState>,
    Path((name, file)): Path<(String, String)>,
    Query(params): Query<ExportParams>,
) -> ApiResult<impl IntoResponse> {
    let text = state
        .kb
        .export_summary(state.services.model.as_ref(), &name, &file, params.format)
        .await?;
    Ok(([(header::CONTENT_TYPE, content_type(params.format))], text))
}

/// POST /api/kb/{name}/query
pub async fn query_kb(
    State(state): State<GatewayState>,
    Path(name): Path<String>,
    Json(body): Json<QueryRequest>,
) -> ApiResult<Json<QueryAnswer>> {
    let top_k = body.top_k.unwrap_or(state.knowledge.query_topk);
    let answer = state
        .kb
        .query(state.services.model.as_ref(), &name, &body.question, top_k)
        .await?;
    Ok(Json(answer))
}
