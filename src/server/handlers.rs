//! HTTP handlers binding the axum router to [`crate::application::KbCore`].

use axum::extract::{Path, State};
use axum::Json;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use uuid::Uuid;

use crate::domain::error::Error;
use crate::domain::types::{Document, SearchFilters, SearchMode, SearchResult};
use crate::server::auth::AuthContext;
use crate::server::error::ApiError;
use crate::server::state::AppState;

fn require_permission(auth: &AuthContext) -> Result<(), ApiError> {
    if !auth.permitted {
        return Err(Error::permission_denied("caller is not permitted to perform this operation").into());
    }
    Ok(())
}

/// `POST /kb/:kb_id/documents`
#[derive(Deserialize)]
pub struct UploadDocumentRequest {
    pub file_name: String,
    /// Base64-encoded file bytes.
    pub content_base64: String,
}

pub async fn upload_document(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(kb_id): Path<Uuid>,
    Json(request): Json<UploadDocumentRequest>,
) -> Result<Json<Document>, ApiError> {
    require_permission(&auth)?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(request.content_base64)
        .map_err(|err| Error::validation(format!("invalid base64 content: {err}")))?;
    let document = state.core.upload_document(kb_id, request.file_name, bytes).await?;
    Ok(Json(document))
}

/// `POST /kb/:kb_id/documents/text`
#[derive(Deserialize)]
pub struct PushDocumentRequest {
    pub file_name: String,
    pub text: String,
}

pub async fn push_document(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(kb_id): Path<Uuid>,
    Json(request): Json<PushDocumentRequest>,
) -> Result<Json<Document>, ApiError> {
    require_permission(&auth)?;
    let document = state.core.push_document(kb_id, request.file_name, request.text).await?;
    Ok(Json(document))
}

/// `POST /documents/reprocess`
#[derive(Deserialize)]
pub struct ReprocessRequest {
    pub document_ids: Vec<Uuid>,
}

#[derive(Serialize)]
pub struct ReprocessResponse {
    pub task_ids: Vec<Uuid>,
}

pub async fn reprocess_documents(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<ReprocessRequest>,
) -> Result<Json<ReprocessResponse>, ApiError> {
    require_permission(&auth)?;
    let task_ids = state.core.reprocess_documents(&request.document_ids).await?;
    Ok(Json(ReprocessResponse { task_ids }))
}

/// `DELETE /documents/:document_id`
pub async fn delete_document(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(document_id): Path<Uuid>,
) -> Result<axum::http::StatusCode, ApiError> {
    require_permission(&auth)?;
    state.core.delete_document(document_id).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

fn default_mode() -> SearchMode {
    SearchMode::Hybrid
}

fn default_top_k() -> usize {
    10
}

fn default_score_threshold() -> f32 {
    0.0
}

/// `POST /kb/:kb_id/search`
#[derive(Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_mode")]
    pub mode: SearchMode,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f32,
    #[serde(default)]
    pub filters: SearchFilters,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub took_ms: u128,
    pub mode: SearchMode,
}

pub async fn search(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(kb_id): Path<Uuid>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    require_permission(&auth)?;
    let started = Instant::now();
    let results = state
        .core
        .search(kb_id, &request.query, request.mode, request.top_k, request.score_threshold, &request.filters)
        .await?;
    Ok(Json(SearchResponse {
        results,
        took_ms: started.elapsed().as_millis(),
        mode: request.mode,
    }))
}

/// `POST /kb/:kb_id/cache/clear`
pub async fn clear_kb_cache(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(kb_id): Path<Uuid>,
) -> Result<axum::http::StatusCode, ApiError> {
    require_permission(&auth)?;
    state.core.clear_kb_cache(kb_id).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

/// `POST /kb/:kb_id/rebuild`
#[derive(Serialize)]
pub struct RebuildResponse {
    pub re_enqueued: usize,
}

pub async fn rebuild_kb(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(kb_id): Path<Uuid>,
) -> Result<Json<RebuildResponse>, ApiError> {
    require_permission(&auth)?;
    let re_enqueued = state.core.rebuild_kb(kb_id).await?;
    Ok(Json(RebuildResponse { re_enqueued }))
}

/// `POST /pending/process`
#[derive(Serialize)]
pub struct ProcessPendingResponse {
    pub processed: usize,
}

pub async fn process_pending(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ProcessPendingResponse>, ApiError> {
    require_permission(&auth)?;
    let processed = state.core.process_pending().await?;
    Ok(Json(ProcessPendingResponse { processed }))
}

/// `GET /healthz`. Unauthenticated — load balancers and orchestrators hit this without headers.
pub async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// `GET /metrics`. Renders the process's Prometheus exposition text, or an empty body if
/// `metrics.enabled` was false at startup.
pub async fn metrics(State(state): State<AppState>) -> String {
    state.metrics_handle.as_ref().map(|handle| handle.render()).unwrap_or_default()
}
