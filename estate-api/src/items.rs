use axum::{
    extract::State,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use estate_catalog::{ApprovedItem, Disposition, DispositionSummary, GroupDisposition, GroupView, ItemBatch, PhotoGroup};
use estate_core::Caller;

use crate::error::AppError;
use crate::extract::{AppJson, AppPath};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/jobs/{id}/items", post(create_item_batch).get(item_batch_for_job))
        .route("/items/{id}", get(get_item_batch))
        .route("/items/{id}/photos", post(append_photos))
        .route("/items/{id}/groups", put(set_photo_groups).get(group_views))
        .route("/items/{id}/groups/{item_number}", get(group_disposition))
        .route("/items/{id}/submit", post(submit_for_review))
        .route("/items/{id}/approve", post(approve))
        .route("/items/{id}/reopen", post(reopen))
        .route("/items/{id}/dispositions", post(mark_disposition))
        .route("/items/{id}/dispositions/by-number", post(mark_item_numbers))
        .route("/items/{id}/summary", get(disposition_summary))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AppendPhotosRequest {
    pub urls: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct PhotoGroupInput {
    pub item_number: u32,
    pub start_index: usize,
    pub end_index: usize,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct PhotoGroupsRequest {
    pub groups: Vec<PhotoGroupInput>,
}

#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    pub items: Vec<ApprovedItem>,
}

#[derive(Debug, Deserialize)]
pub struct ReopenRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct DispositionRequest {
    pub kind: Disposition,
    pub indices: Vec<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ItemNumbersRequest {
    pub kind: Disposition,
    pub item_numbers: Vec<u32>,
}

#[derive(Debug, Serialize)]
pub struct MarkedResponse {
    pub photo_indices: Vec<usize>,
}

#[derive(Debug, Serialize)]
pub struct GroupDispositionResponse {
    pub item_number: u32,
    pub disposition: GroupDisposition,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1/jobs/{id}/items
/// Start the job's photo batch
pub async fn create_item_batch(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    AppPath(job_id): AppPath<Uuid>,
) -> Result<Json<ItemBatch>, AppError> {
    Ok(Json(state.store.create_item_batch(&caller, job_id).await?))
}

/// GET /v1/jobs/{id}/items
pub async fn item_batch_for_job(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    AppPath(job_id): AppPath<Uuid>,
) -> Result<Json<ItemBatch>, AppError> {
    Ok(Json(state.store.item_batch_for_job(&caller, job_id).await?))
}

/// GET /v1/items/{id}
pub async fn get_item_batch(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    AppPath(item_id): AppPath<Uuid>,
) -> Result<Json<ItemBatch>, AppError> {
    Ok(Json(state.store.get_item_batch(&caller, item_id).await?))
}

/// POST /v1/items/{id}/photos
/// Append uploaded photo references, at most `max_photos_per_upload` per call
pub async fn append_photos(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    AppPath(item_id): AppPath<Uuid>,
    AppJson(req): AppJson<AppendPhotosRequest>,
) -> Result<Json<ItemBatch>, AppError> {
    let limit = state.business_rules.max_photos_per_upload;
    if req.urls.is_empty() {
        return Err(AppError::ValidationError("No photos given".to_string()));
    }
    if req.urls.len() > limit {
        return Err(AppError::ValidationError(format!(
            "At most {} photos per upload, got {}",
            limit,
            req.urls.len()
        )));
    }
    if req.urls.iter().any(|u| u.trim().is_empty()) {
        return Err(AppError::ValidationError("Photo references must not be empty".to_string()));
    }

    Ok(Json(state.store.append_photos(&caller, item_id, req.urls).await?))
}

/// PUT /v1/items/{id}/groups
/// Replace how photos are grouped into items
pub async fn set_photo_groups(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    AppPath(item_id): AppPath<Uuid>,
    AppJson(req): AppJson<PhotoGroupsRequest>,
) -> Result<Json<ItemBatch>, AppError> {
    let groups = req
        .groups
        .into_iter()
        .map(|g| PhotoGroup::new(g.item_number, g.start_index, g.end_index, g.title))
        .collect();
    Ok(Json(state.store.set_photo_groups(&caller, item_id, groups).await?))
}

/// GET /v1/items/{id}/groups
/// Each group with its current disposition
pub async fn group_views(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    AppPath(item_id): AppPath<Uuid>,
) -> Result<Json<Vec<GroupView>>, AppError> {
    Ok(Json(state.store.group_views(&caller, item_id).await?))
}

/// GET /v1/items/{id}/groups/{item_number}
pub async fn group_disposition(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    AppPath((item_id, item_number)): AppPath<(Uuid, u32)>,
) -> Result<Json<GroupDispositionResponse>, AppError> {
    let disposition = state.store.photo_group_disposition(&caller, item_id, item_number).await?;
    Ok(Json(GroupDispositionResponse { item_number, disposition }))
}

/// POST /v1/items/{id}/submit
pub async fn submit_for_review(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    AppPath(item_id): AppPath<Uuid>,
) -> Result<Json<ItemBatch>, AppError> {
    Ok(Json(state.store.submit_for_review(&caller, item_id).await?))
}

/// POST /v1/items/{id}/approve
pub async fn approve(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    AppPath(item_id): AppPath<Uuid>,
    AppJson(req): AppJson<ApproveRequest>,
) -> Result<Json<ItemBatch>, AppError> {
    Ok(Json(state.store.approve_items(&caller, item_id, req.items).await?))
}

/// POST /v1/items/{id}/reopen
pub async fn reopen(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    AppPath(item_id): AppPath<Uuid>,
    AppJson(req): AppJson<ReopenRequest>,
) -> Result<Json<ItemBatch>, AppError> {
    Ok(Json(state.store.reopen_items(&caller, item_id, &req.reason).await?))
}

/// POST /v1/items/{id}/dispositions
/// Record outcomes by raw photo index
pub async fn mark_disposition(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    AppPath(item_id): AppPath<Uuid>,
    AppJson(req): AppJson<DispositionRequest>,
) -> Result<Json<ItemBatch>, AppError> {
    Ok(Json(state.store.mark_disposition(&caller, item_id, &req.indices, req.kind).await?))
}

/// POST /v1/items/{id}/dispositions/by-number
/// Record outcomes by item number, e.g. sales
pub async fn mark_item_numbers(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    AppPath(item_id): AppPath<Uuid>,
    AppJson(req): AppJson<ItemNumbersRequest>,
) -> Result<Json<MarkedResponse>, AppError> {
    let photo_indices = state
        .store
        .mark_item_numbers(&caller, item_id, &req.item_numbers, req.kind)
        .await?;
    Ok(Json(MarkedResponse { photo_indices }))
}

/// GET /v1/items/{id}/summary
pub async fn disposition_summary(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    AppPath(item_id): AppPath<Uuid>,
) -> Result<Json<DispositionSummary>, AppError> {
    Ok(Json(state.store.disposition_summary(&caller, item_id).await?))
}
