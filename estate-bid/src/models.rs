use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use std::fmt;

use estate_core::Cents;
use estate_job::ServiceType;

use crate::payment_details::PaymentDetails;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BidStatus {
    Submitted,
    Accepted,
    Rejected,
}

impl fmt::Display for BidStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BidStatus::Submitted => "submitted",
            BidStatus::Accepted => "accepted",
            BidStatus::Rejected => "rejected",
        })
    }
}

/// Proof of completed work, stored in the blob store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Receipt {
    pub url: String,
    pub uploaded_at: DateTime<Utc>,
}

/// What a vendor offers. Fixed once submitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BidTerms {
    pub amount: Cents,
    pub timeline_days: i32,
    pub payment: PaymentDetails,
}

/// A vendor's offer to do donation or hauling work on a job.
///
/// Only status, work completion, receipt and payment flags ever change, and
/// each of those in order: accepted → work completed → receipt → paid.
#[derive(Debug, Clone, Serialize)]
pub struct Bid {
    pub id: Uuid,
    pub job_id: Uuid,
    pub vendor_id: String,
    pub bid_type: ServiceType,
    terms: BidTerms,
    pub(crate) status: BidStatus,
    pub(crate) work_completed: bool,
    pub(crate) receipt: Option<Receipt>,
    pub(crate) is_paid: bool,
    pub(crate) disposed_item_numbers: Vec<u32>,
    pub created_at: DateTime<Utc>,
    pub(crate) decided_at: Option<DateTime<Utc>>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl Bid {
    pub fn new(job_id: Uuid, vendor_id: String, bid_type: ServiceType, terms: BidTerms) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            job_id,
            vendor_id,
            bid_type,
            terms,
            status: BidStatus::Submitted,
            work_completed: false,
            receipt: None,
            is_paid: false,
            disposed_item_numbers: Vec::new(),
            created_at: now,
            decided_at: None,
            updated_at: now,
        }
    }

    pub fn amount(&self) -> Cents {
        self.terms.amount
    }

    pub fn timeline_days(&self) -> i32 {
        self.terms.timeline_days
    }

    pub fn payment(&self) -> &PaymentDetails {
        &self.terms.payment
    }

    pub fn status(&self) -> BidStatus {
        self.status
    }

    pub fn work_completed(&self) -> bool {
        self.work_completed
    }

    pub fn receipt(&self) -> Option<&Receipt> {
        self.receipt.as_ref()
    }

    pub fn is_paid(&self) -> bool {
        self.is_paid
    }

    pub fn disposed_item_numbers(&self) -> &[u32] {
        &self.disposed_item_numbers
    }

    pub fn decided_at(&self) -> Option<DateTime<Utc>> {
        self.decided_at
    }

    /// Submitted or accepted: still holds the vendor's slot on the opportunity.
    pub fn is_live(&self) -> bool {
        matches!(self.status, BidStatus::Submitted | BidStatus::Accepted)
    }

    pub(crate) fn decide(&mut self, status: BidStatus) {
        let now = Utc::now();
        self.status = status;
        self.decided_at = Some(now);
        self.updated_at = now;
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
