use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use crate::money::Cents;

pub type PaymentResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    RequiresPaymentMethod,
    Processing,
    Succeeded,
    Failed,
}

/// A checkout handed to the client for the job deposit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositIntent {
    pub id: String, // Provider's ID
    pub job_id: Uuid,
    pub amount: Cents,
    pub status: PaymentStatus,
    pub checkout_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutRequest {
    pub bid_id: Uuid,
    pub vendor_id: String,
    pub amount: Cents,
    /// `cash`, `cashapp` or `bank`.
    pub method: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutConfirmation {
    pub reference: String,
    pub bid_id: Uuid,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

/// Payment provider seam. The core records `deposit_paid_at` and `is_paid`;
/// moving money happens behind this trait.
#[async_trait]
pub trait PaymentAdapter: Send + Sync {
    /// Open a deposit checkout for a job
    async fn create_deposit_intent(
        &self,
        job_id: Uuid,
        amount: Cents,
    ) -> PaymentResult<DepositIntent>;

    /// Send a vendor their payout for completed work
    async fn initiate_payout(
        &self,
        request: &PayoutRequest,
    ) -> PaymentResult<PayoutConfirmation>;
}
