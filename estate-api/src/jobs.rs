use axum::{
    body::Bytes,
    extract::State,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use estate_core::payment::DepositIntent;
use estate_core::{Caller, Cents};
use estate_job::{Finance, FinanceLedger, Job, JobIntake, Settlement, Stage, StageInfo};

use crate::error::AppError;
use crate::extract::{AppJson, AppPath};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/stages", get(list_stages))
        .route("/jobs", post(create_job).get(list_jobs))
        .route("/jobs/{id}", get(get_job))
        .route("/jobs/{id}/stage", post(advance_stage))
        .route("/jobs/{id}/fee", put(set_service_fee))
        .route("/jobs/{id}/deposit/checkout", post(request_deposit_checkout))
        .route("/jobs/{id}/deposit/paid", post(record_deposit_paid))
        .route("/jobs/{id}/scope-notes", put(update_scope_notes))
        .route("/jobs/{id}/hauling-cost", put(set_hauling_cost))
        .route("/jobs/{id}/sales", post(record_daily_sale))
        .route("/jobs/{id}/finance", get(get_finance))
        .route("/jobs/{id}/settlement", get(preview_settlement).post(finalize_settlement))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// A job plus its stage lookup row, so clients never hard-code labels.
#[derive(Debug, Serialize)]
pub struct JobResponse {
    #[serde(flatten)]
    pub job: Job,
    pub stage_info: StageInfo,
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        let stage_info = job.stage().info();
        Self { job, stage_info }
    }
}

#[derive(Debug, Deserialize)]
pub struct AdvanceStageRequest {
    pub stage: Stage,
    pub note: String,
}

/// Amounts are integer cents.
#[derive(Debug, Deserialize)]
pub struct ServiceFeeRequest {
    pub service_fee: Cents,
    #[serde(default)]
    pub deposit: Option<Cents>,
}

#[derive(Debug, Deserialize, Default)]
pub struct DepositPaidRequest {
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct ScopeNotesRequest {
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HaulingCostRequest {
    pub hauling_cost: Cents,
}

#[derive(Debug, Deserialize)]
pub struct DailySaleRequest {
    pub date: NaiveDate,
    pub amount: Cents,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub amount: Cents,
}

#[derive(Debug, Serialize)]
pub struct FinanceResponse {
    pub job_id: Uuid,
    pub finance: Finance,
    pub daily_totals: Vec<DailyTotal>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /v1/stages
/// Stage order, labels, progress and implied vendor service
pub async fn list_stages() -> Json<Vec<StageInfo>> {
    Json(Stage::catalog())
}

/// POST /v1/jobs
/// Open a job from an intake form
pub async fn create_job(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    AppJson(intake): AppJson<JobIntake>,
) -> Result<Json<JobResponse>, AppError> {
    let job = state.store.create_job(&caller, intake).await?;
    Ok(Json(job.into()))
}

/// GET /v1/jobs
pub async fn list_jobs(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Vec<JobResponse>>, AppError> {
    let jobs = state.store.list_jobs(&caller).await?;
    Ok(Json(jobs.into_iter().map(JobResponse::from).collect()))
}

/// GET /v1/jobs/{id}
pub async fn get_job(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    AppPath(job_id): AppPath<Uuid>,
) -> Result<Json<JobResponse>, AppError> {
    let job = state.store.get_job(&caller, job_id).await?;
    Ok(Json(job.into()))
}

/// POST /v1/jobs/{id}/stage
/// Move the job to another stage with a mandatory note
pub async fn advance_stage(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    AppPath(job_id): AppPath<Uuid>,
    AppJson(req): AppJson<AdvanceStageRequest>,
) -> Result<Json<JobResponse>, AppError> {
    let job = state.store.advance_stage(&caller, job_id, req.stage, &req.note).await?;
    Ok(Json(job.into()))
}

/// PUT /v1/jobs/{id}/fee
pub async fn set_service_fee(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    AppPath(job_id): AppPath<Uuid>,
    AppJson(req): AppJson<ServiceFeeRequest>,
) -> Result<Json<JobResponse>, AppError> {
    let job = state.store.set_service_fee(&caller, job_id, req.service_fee, req.deposit).await?;
    Ok(Json(job.into()))
}

/// POST /v1/jobs/{id}/deposit/checkout
/// Open a payment-provider checkout for the requested deposit
pub async fn request_deposit_checkout(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    AppPath(job_id): AppPath<Uuid>,
) -> Result<Json<DepositIntent>, AppError> {
    let intent = state.store.request_deposit_checkout(&caller, job_id).await?;
    Ok(Json(intent))
}

/// POST /v1/jobs/{id}/deposit/paid
pub async fn record_deposit_paid(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    AppPath(job_id): AppPath<Uuid>,
    body: Bytes,
) -> Result<Json<JobResponse>, AppError> {
    // An empty body means "paid now"
    let req: DepositPaidRequest = if body.is_empty() {
        DepositPaidRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| AppError::ValidationError(e.to_string()))?
    };
    let job = state.store.record_deposit_paid(&caller, job_id, req.paid_at).await?;
    Ok(Json(job.into()))
}

/// PUT /v1/jobs/{id}/scope-notes
pub async fn update_scope_notes(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    AppPath(job_id): AppPath<Uuid>,
    AppJson(req): AppJson<ScopeNotesRequest>,
) -> Result<Json<JobResponse>, AppError> {
    let job = state.store.update_scope_notes(&caller, job_id, req.notes).await?;
    Ok(Json(job.into()))
}

/// PUT /v1/jobs/{id}/hauling-cost
pub async fn set_hauling_cost(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    AppPath(job_id): AppPath<Uuid>,
    AppJson(req): AppJson<HaulingCostRequest>,
) -> Result<Json<JobResponse>, AppError> {
    let job = state.store.set_hauling_cost(&caller, job_id, req.hauling_cost).await?;
    Ok(Json(job.into()))
}

/// POST /v1/jobs/{id}/sales
/// Record one day of sale takings
pub async fn record_daily_sale(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    AppPath(job_id): AppPath<Uuid>,
    AppJson(req): AppJson<DailySaleRequest>,
) -> Result<Json<JobResponse>, AppError> {
    let job = state
        .store
        .record_daily_sale(&caller, job_id, req.date, req.amount, req.note)
        .await?;
    Ok(Json(job.into()))
}

/// GET /v1/jobs/{id}/finance
pub async fn get_finance(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    AppPath(job_id): AppPath<Uuid>,
) -> Result<Json<FinanceResponse>, AppError> {
    let job = state.store.get_job(&caller, job_id).await?;
    let daily_totals = FinanceLedger::totals_by_date(&job)
        .into_iter()
        .map(|(date, amount)| DailyTotal { date, amount })
        .collect();

    Ok(Json(FinanceResponse {
        job_id,
        finance: job.finance,
        daily_totals,
    }))
}

/// GET /v1/jobs/{id}/settlement
/// Settlement as it would stand today
pub async fn preview_settlement(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    AppPath(job_id): AppPath<Uuid>,
) -> Result<Json<Settlement>, AppError> {
    Ok(Json(state.store.settlement(&caller, job_id).await?))
}

/// POST /v1/jobs/{id}/settlement
/// Store commission and net on the job's finance sheet
pub async fn finalize_settlement(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    AppPath(job_id): AppPath<Uuid>,
) -> Result<Json<Settlement>, AppError> {
    Ok(Json(state.store.finalize_settlement(&caller, job_id).await?))
}
