use chrono::Utc;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use estate_catalog::{Disposition, ItemDispositionTracker, ItemError};
use estate_core::CoreError;
use estate_job::{ServiceType, Stage};

use crate::models::{Bid, BidStatus, BidTerms, Receipt};
use crate::opportunity::Opportunity;

/// Matches vendors to open donation/hauling work and settles it once done.
pub struct VendorBidEngine {
    bids: HashMap<Uuid, Bid>,
}

impl VendorBidEngine {
    pub fn new() -> Self {
        Self {
            bids: HashMap::new(),
        }
    }

    pub fn get(&self, bid_id: &Uuid) -> Option<&Bid> {
        self.bids.get(bid_id)
    }

    pub fn require(&self, bid_id: &Uuid) -> Result<&Bid, BidError> {
        self.bids.get(bid_id).ok_or(BidError::NotFound(*bid_id))
    }

    /// Bids on a job, oldest first
    pub fn bids_for_job(&self, job_id: &Uuid) -> Vec<&Bid> {
        let mut bids: Vec<&Bid> = self.bids.values().filter(|b| b.job_id == *job_id).collect();
        bids.sort_by_key(|b| b.created_at);
        bids
    }

    /// A vendor's bids, oldest first
    pub fn bids_for_vendor(&self, vendor_id: &str) -> Vec<&Bid> {
        let mut bids: Vec<&Bid> = self.bids.values().filter(|b| b.vendor_id == vendor_id).collect();
        bids.sort_by_key(|b| b.created_at);
        bids
    }

    /// A vendor sees a job's opportunity unless they already hold a live bid
    /// of the type the job's current stage calls for.
    pub fn is_visible(&self, job_id: &Uuid, stage: Stage, vendor_id: &str) -> bool {
        match stage.service_type() {
            Some(service_type) => self.live_bid(job_id, vendor_id, service_type).is_none(),
            None => false,
        }
    }

    /// Opportunities among `jobs` (id, current stage) visible to `vendor_id`
    pub fn opportunities_for_vendor<I>(&self, vendor_id: &str, jobs: I) -> Vec<Opportunity>
    where
        I: IntoIterator<Item = (Uuid, Stage)>,
    {
        jobs.into_iter()
            .filter(|(job_id, stage)| self.is_visible(job_id, *stage, vendor_id))
            .filter_map(|(job_id, stage)| Opportunity::for_stage(job_id, stage))
            .map(|mut opportunity| {
                opportunity.open_bids = self
                    .bids
                    .values()
                    .filter(|b| {
                        b.job_id == opportunity.job_id
                            && b.bid_type == opportunity.service_type
                            && b.status == BidStatus::Submitted
                    })
                    .count();
                opportunity
            })
            .collect()
    }

    /// Submit a bid on the job's current opportunity
    pub fn submit_bid(
        &mut self,
        job_id: Uuid,
        stage: Stage,
        vendor_id: &str,
        terms: BidTerms,
    ) -> Result<Bid, BidError> {
        if vendor_id.trim().is_empty() {
            return Err(BidError::Invalid("vendor id must not be empty".to_string()));
        }
        if !terms.amount.is_positive() {
            return Err(BidError::InvalidAmount(terms.amount.to_string()));
        }
        if terms.timeline_days < 0 {
            return Err(BidError::InvalidTimeline(terms.timeline_days));
        }
        terms.payment.validate()?;

        let bid_type = stage.service_type().ok_or(BidError::NotBiddable(stage))?;

        if let Some(existing) = self.live_bid(&job_id, vendor_id, bid_type) {
            return Err(BidError::DuplicateLiveBid {
                job_id,
                bid_type,
                existing: existing.id,
            });
        }

        let bid = Bid::new(job_id, vendor_id.to_string(), bid_type, terms);
        self.bids.insert(bid.id, bid.clone());
        Ok(bid)
    }

    /// Accept a bid and reject every other pending bid for the same job and
    /// type in the same step. Returns the ids that were rejected.
    pub fn accept_bid(&mut self, bid_id: &Uuid) -> Result<Vec<Uuid>, BidError> {
        let bid = self.require(bid_id)?;
        if bid.status != BidStatus::Submitted {
            return Err(BidError::AlreadyDecided { bid_id: *bid_id, status: bid.status });
        }
        let (job_id, bid_type) = (bid.job_id, bid.bid_type);

        if let Some(winner) = self
            .bids
            .values()
            .find(|b| b.job_id == job_id && b.bid_type == bid_type && b.status == BidStatus::Accepted)
        {
            return Err(BidError::AlreadyAwarded { job_id, bid_type, winner: winner.id });
        }

        let mut rejected = Vec::new();
        for other in self.bids.values_mut() {
            if other.id == *bid_id {
                other.decide(BidStatus::Accepted);
            } else if other.job_id == job_id && other.bid_type == bid_type && other.status == BidStatus::Submitted {
                other.decide(BidStatus::Rejected);
                rejected.push(other.id);
            }
        }
        rejected.sort();

        Ok(rejected)
    }

    /// Decline a pending bid
    pub fn reject_bid(&mut self, bid_id: &Uuid) -> Result<(), BidError> {
        let bid = self.get_mut(bid_id)?;
        if bid.status != BidStatus::Submitted {
            return Err(BidError::AlreadyDecided { bid_id: *bid_id, status: bid.status });
        }
        bid.decide(BidStatus::Rejected);
        Ok(())
    }

    /// Record items for an accepted bid, all or none. A donation bid marks
    /// items donated and a hauling bid marks them hauled.
    /// Returns the photo indices marked.
    pub fn mark_items_disposed(
        &mut self,
        tracker: &mut ItemDispositionTracker,
        bid_id: &Uuid,
        item_numbers: &[u32],
        kind: Disposition,
    ) -> Result<Vec<usize>, BidError> {
        let bid = self.require(bid_id)?;
        if bid.status != BidStatus::Accepted {
            return Err(BidError::NotAccepted { bid_id: *bid_id, status: bid.status });
        }
        if bid.work_completed {
            return Err(BidError::WorkAlreadyCompleted(*bid_id));
        }
        if kind != disposition_for(bid.bid_type) {
            return Err(BidError::InvalidDisposition { bid_type: bid.bid_type, kind });
        }
        if item_numbers.is_empty() {
            return Err(BidError::Invalid("no item numbers given".to_string()));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = item_numbers.iter().find(|n| !seen.insert(**n)) {
            return Err(BidError::Invalid(format!("item number {} given twice", dup)));
        }

        let item_id = tracker
            .batch_for_job(&bid.job_id)
            .map(|b| b.id)
            .ok_or(BidError::NoItemBatch(bid.job_id))?;

        let marked = tracker.mark_item_numbers(&item_id, item_numbers, kind)?;

        let bid = self.get_mut(bid_id)?;
        bid.disposed_item_numbers.extend_from_slice(item_numbers);
        bid.touch();

        Ok(marked)
    }

    /// Vendor reports the work done. Irreversible.
    pub fn complete_work(&mut self, bid_id: &Uuid) -> Result<(), BidError> {
        let bid = self.get_mut(bid_id)?;
        if bid.status != BidStatus::Accepted {
            return Err(BidError::NotAccepted { bid_id: *bid_id, status: bid.status });
        }
        if bid.work_completed {
            return Err(BidError::WorkAlreadyCompleted(*bid_id));
        }
        bid.work_completed = true;
        bid.touch();
        Ok(())
    }

    /// Attach (or replace) the receipt for completed work
    pub fn attach_receipt(&mut self, bid_id: &Uuid, url: &str) -> Result<(), BidError> {
        if url.trim().is_empty() {
            return Err(BidError::Invalid("receipt reference must not be empty".to_string()));
        }

        let bid = self.get_mut(bid_id)?;
        if !bid.work_completed {
            return Err(BidError::WorkNotCompleted(*bid_id));
        }
        bid.receipt = Some(Receipt {
            url: url.trim().to_string(),
            uploaded_at: Utc::now(),
        });
        bid.touch();
        Ok(())
    }

    /// Record that the vendor was paid. Moving the money happens elsewhere.
    pub fn mark_paid(&mut self, bid_id: &Uuid) -> Result<(), BidError> {
        let bid = self.get_mut(bid_id)?;
        if bid.receipt.is_none() {
            return Err(BidError::NoReceipt(*bid_id));
        }
        if bid.is_paid {
            return Err(BidError::AlreadyPaid(*bid_id));
        }
        bid.is_paid = true;
        bid.touch();
        Ok(())
    }

    fn live_bid(&self, job_id: &Uuid, vendor_id: &str, bid_type: ServiceType) -> Option<&Bid> {
        self.bids
            .values()
            .find(|b| b.job_id == *job_id && b.vendor_id == vendor_id && b.bid_type == bid_type && b.is_live())
    }

    fn get_mut(&mut self, bid_id: &Uuid) -> Result<&mut Bid, BidError> {
        self.bids.get_mut(bid_id).ok_or(BidError::NotFound(*bid_id))
    }
}

impl Default for VendorBidEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// The only outcome a vendor of this service may record.
fn disposition_for(bid_type: ServiceType) -> Disposition {
    match bid_type {
        ServiceType::Donation => Disposition::Donated,
        ServiceType::Hauling => Disposition::Hauled,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BidError {
    #[error("Bid not found: {0}")]
    NotFound(Uuid),

    #[error("Bid amount must be positive, got {0}")]
    InvalidAmount(String),

    #[error("Timeline must not be negative, got {0} days")]
    InvalidTimeline(i32),

    #[error("Unknown payment method: {0}")]
    UnknownPaymentMethod(String),

    #[error("Missing payment field: {0}")]
    MissingPaymentField(&'static str),

    #[error("Jobs at stage {0} are not open for bids")]
    NotBiddable(Stage),

    #[error("Vendor already holds live {bid_type} bid {existing} on job {job_id}")]
    DuplicateLiveBid { job_id: Uuid, bid_type: ServiceType, existing: Uuid },

    #[error("Bid {bid_id} was already {status}")]
    AlreadyDecided { bid_id: Uuid, status: BidStatus },

    #[error("The {bid_type} work on job {job_id} was already awarded to bid {winner}")]
    AlreadyAwarded { job_id: Uuid, bid_type: ServiceType, winner: Uuid },

    #[error("Bid {bid_id} is {status}, not accepted")]
    NotAccepted { bid_id: Uuid, status: BidStatus },

    #[error("Work on bid {0} is already completed")]
    WorkAlreadyCompleted(Uuid),

    #[error("Work on bid {0} is not completed yet")]
    WorkNotCompleted(Uuid),

    #[error("Bid {0} has no receipt")]
    NoReceipt(Uuid),

    #[error("Bid {0} is already paid")]
    AlreadyPaid(Uuid),

    #[error("A {bid_type} bid cannot mark items as {kind}")]
    InvalidDisposition { bid_type: ServiceType, kind: Disposition },

    #[error("Job {0} has no item batch")]
    NoItemBatch(Uuid),

    #[error("Invalid bid request: {0}")]
    Invalid(String),

    #[error(transparent)]
    Items(#[from] ItemError),
}

impl From<BidError> for CoreError {
    fn from(err: BidError) -> Self {
        match err {
            BidError::Items(inner) => inner.into(),
            BidError::NotFound(id) => CoreError::not_found("Bid", id),
            BidError::InvalidAmount(_)
            | BidError::InvalidTimeline(_)
            | BidError::UnknownPaymentMethod(_)
            | BidError::MissingPaymentField(_)
            | BidError::NotBiddable(_)
            | BidError::InvalidDisposition { .. }
            | BidError::Invalid(_) => CoreError::Validation(err.to_string()),
            BidError::DuplicateLiveBid { .. }
            | BidError::AlreadyDecided { .. }
            | BidError::AlreadyAwarded { .. }
            | BidError::NotAccepted { .. }
            | BidError::WorkAlreadyCompleted(_)
            | BidError::WorkNotCompleted(_)
            | BidError::NoReceipt(_)
            | BidError::AlreadyPaid(_)
            | BidError::NoItemBatch(_) => CoreError::Conflict(err.to_string()),
        }
    }
}
