use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use estate_core::Caller;
use estate_order::{DeliveryDetails, FulfillmentStatus, Order, OrderLine, PaymentStatus};

use crate::error::AppError;
use crate::extract::{AppJson, AppPath};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", post(create_order).get(my_orders))
        .route("/orders/{id}", get(get_order))
        .route("/orders/{id}/payment", post(record_payment))
        .route("/orders/{id}/fulfillment", post(advance_fulfillment))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub job_id: Option<Uuid>,
    pub items: Vec<OrderLine>,
    pub delivery: DeliveryDetails,
}

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub status: PaymentStatus,
}

/// `status` stays a string so an unknown value is a 400 like any other
/// status the order's delivery type does not use.
#[derive(Debug, Deserialize)]
pub struct FulfillmentRequest {
    pub status: String,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1/orders
/// Checkout as the calling buyer
pub async fn create_order(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    AppJson(req): AppJson<CreateOrderRequest>,
) -> Result<Json<Order>, AppError> {
    let order = state.store.create_order(&caller, req.job_id, req.items, req.delivery).await?;
    Ok(Json(order))
}

/// GET /v1/orders
pub async fn my_orders(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Vec<Order>>, AppError> {
    Ok(Json(state.store.my_orders(&caller).await?))
}

/// GET /v1/orders/{id}
pub async fn get_order(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    AppPath(order_id): AppPath<Uuid>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(state.store.get_order(&caller, order_id).await?))
}

/// POST /v1/orders/{id}/payment
/// Record the checkout outcome reported by the payment provider
pub async fn record_payment(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    AppPath(order_id): AppPath<Uuid>,
    AppJson(req): AppJson<PaymentRequest>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(state.store.record_payment(&caller, order_id, req.status).await?))
}

/// POST /v1/orders/{id}/fulfillment
pub async fn advance_fulfillment(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    AppPath(order_id): AppPath<Uuid>,
    AppJson(req): AppJson<FulfillmentRequest>,
) -> Result<Json<Order>, AppError> {
    let status: FulfillmentStatus = req.status.parse().map_err(AppError::ValidationError)?;
    let order = state
        .store
        .advance_fulfillment(&caller, order_id, status, req.tracking_number, req.note)
        .await?;
    Ok(Json(order))
}
