use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use estate_bid::{Bid, BidTerms, Opportunity, PaymentInput};
use estate_catalog::Disposition;
use estate_core::payment::PayoutConfirmation;
use estate_core::{Caller, Cents, CoreError};

use crate::error::AppError;
use crate::extract::{AppJson, AppPath};
use crate::items::MarkedResponse;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/opportunities", get(list_opportunities))
        .route("/jobs/{id}/bids", post(submit_bid).get(bids_for_job))
        .route("/bids/mine", get(my_bids))
        .route("/bids/{id}", get(get_bid))
        .route("/bids/{id}/accept", post(accept_bid))
        .route("/bids/{id}/reject", post(reject_bid))
        .route("/bids/{id}/dispositions", post(mark_items_disposed))
        .route("/bids/{id}/complete", post(complete_work))
        .route("/bids/{id}/receipt", post(attach_receipt))
        .route("/bids/{id}/paid", post(mark_paid))
        .route("/bids/{id}/payout", post(pay_vendor))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SubmitBidRequest {
    /// Integer cents.
    pub amount: Cents,
    pub timeline_days: i32,
    pub payment: PaymentInput,
}

#[derive(Debug, Deserialize)]
pub struct DisposeItemsRequest {
    pub item_numbers: Vec<u32>,
    pub kind: Disposition,
}

#[derive(Debug, Deserialize)]
pub struct ReceiptRequest {
    pub url: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /v1/opportunities
/// Jobs the calling vendor may bid on right now
pub async fn list_opportunities(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Vec<Opportunity>>, AppError> {
    Ok(Json(state.store.list_opportunities(&caller).await?))
}

/// POST /v1/jobs/{id}/bids
/// Bid on the job's current donation or hauling opportunity
pub async fn submit_bid(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    AppPath(job_id): AppPath<Uuid>,
    AppJson(req): AppJson<SubmitBidRequest>,
) -> Result<Json<Bid>, AppError> {
    let payment = req.payment.into_details().map_err(CoreError::from)?;
    let terms = BidTerms {
        amount: req.amount,
        timeline_days: req.timeline_days,
        payment,
    };
    let bid = state.store.submit_bid(&caller, job_id, terms).await?;
    Ok(Json(bid))
}

/// GET /v1/jobs/{id}/bids
pub async fn bids_for_job(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    AppPath(job_id): AppPath<Uuid>,
) -> Result<Json<Vec<Bid>>, AppError> {
    let bids = state.store.bids_for_job(&caller, job_id).await?;
    Ok(Json(bids))
}

/// GET /v1/bids/mine
pub async fn my_bids(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Vec<Bid>>, AppError> {
    let bids = state.store.my_bids(&caller).await?;
    Ok(Json(bids))
}

/// GET /v1/bids/{id}
pub async fn get_bid(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    AppPath(bid_id): AppPath<Uuid>,
) -> Result<Json<Bid>, AppError> {
    Ok(Json(state.store.get_bid(&caller, bid_id).await?))
}

/// POST /v1/bids/{id}/accept
/// Award the work; competing bids are rejected
pub async fn accept_bid(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    AppPath(bid_id): AppPath<Uuid>,
) -> Result<Json<Bid>, AppError> {
    Ok(Json(state.store.accept_bid(&caller, bid_id).await?))
}

/// POST /v1/bids/{id}/reject
pub async fn reject_bid(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    AppPath(bid_id): AppPath<Uuid>,
) -> Result<Json<Bid>, AppError> {
    Ok(Json(state.store.reject_bid(&caller, bid_id).await?))
}

/// POST /v1/bids/{id}/dispositions
/// Vendor marks items donated or hauled
pub async fn mark_items_disposed(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    AppPath(bid_id): AppPath<Uuid>,
    AppJson(req): AppJson<DisposeItemsRequest>,
) -> Result<Json<MarkedResponse>, AppError> {
    let photo_indices = state
        .store
        .mark_items_disposed(&caller, bid_id, &req.item_numbers, req.kind)
        .await?;
    Ok(Json(MarkedResponse { photo_indices }))
}

/// POST /v1/bids/{id}/complete
pub async fn complete_work(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    AppPath(bid_id): AppPath<Uuid>,
) -> Result<Json<Bid>, AppError> {
    Ok(Json(state.store.complete_work(&caller, bid_id).await?))
}

/// POST /v1/bids/{id}/receipt
pub async fn attach_receipt(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    AppPath(bid_id): AppPath<Uuid>,
    AppJson(req): AppJson<ReceiptRequest>,
) -> Result<Json<Bid>, AppError> {
    Ok(Json(state.store.attach_receipt(&caller, bid_id, &req.url).await?))
}

/// POST /v1/bids/{id}/paid
/// Record a payout made outside the system
pub async fn mark_paid(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    AppPath(bid_id): AppPath<Uuid>,
) -> Result<Json<Bid>, AppError> {
    Ok(Json(state.store.mark_paid(&caller, bid_id).await?))
}

/// POST /v1/bids/{id}/payout
/// Pay the vendor through the payment provider
pub async fn pay_vendor(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    AppPath(bid_id): AppPath<Uuid>,
) -> Result<Json<PayoutConfirmation>, AppError> {
    Ok(Json(state.store.pay_vendor(&caller, bid_id).await?))
}
