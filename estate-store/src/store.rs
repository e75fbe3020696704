use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

use estate_bid::{Bid, BidError, BidStatus, BidTerms, Opportunity, VendorBidEngine};
use estate_catalog::{
    ApprovedItem, Disposition, DispositionSummary, GroupDisposition, GroupView, ItemBatch, ItemDispositionTracker,
    ItemError, PhotoGroup,
};
use estate_core::payment::{DepositIntent, PaymentAdapter, PayoutConfirmation, PayoutRequest};
use estate_core::{Caller, Cents, CoreError, CoreResult, Role};
use estate_job::{Job, JobIntake, Settlement, Stage, StageMachine};
use estate_order::{DeliveryDetails, FulfillmentStatus, Order, OrderLine, OrderManager, PaymentStatus};
use estate_shared::DomainEvent;

use crate::events::EventPublisher;

/// Shared state behind every request.
///
/// Each aggregate sits behind its own lock. Operations touching several take
/// them in the order jobs → items → bids → orders, and finish all checks before
/// the first mutation, so a failed call leaves nothing behind.
pub struct EstateStore {
    jobs: RwLock<StageMachine>,
    items: RwLock<ItemDispositionTracker>,
    bids: RwLock<VendorBidEngine>,
    orders: RwLock<OrderManager>,
    events: EventPublisher,
    payments: Arc<dyn PaymentAdapter>,
}

impl EstateStore {
    pub fn new(events: EventPublisher, payments: Arc<dyn PaymentAdapter>) -> Self {
        Self {
            jobs: RwLock::new(StageMachine::new()),
            items: RwLock::new(ItemDispositionTracker::new()),
            bids: RwLock::new(VendorBidEngine::new()),
            orders: RwLock::new(OrderManager::new()),
            events,
            payments,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.events.subscribe()
    }

    // ========================================================================
    // Jobs
    // ========================================================================

    /// Clients always open jobs for themselves; agents may name any client.
    pub async fn create_job(&self, caller: &Caller, mut intake: JobIntake) -> CoreResult<Job> {
        caller.require(&[Role::Agent, Role::Client])?;
        if caller.role == Role::Client {
            intake.client_id = Some(caller.id.clone());
        }

        let job = self.jobs.write().await.create_job(intake)?;

        info!(job_id = %job.id, client_id = ?job.client_id, "Job created");
        self.events.publish(DomainEvent::JobCreated {
            job_id: job.id,
            client_id: job.client_id.clone(),
            timestamp: now(),
        });
        Ok(job)
    }

    pub async fn get_job(&self, caller: &Caller, job_id: Uuid) -> CoreResult<Job> {
        let jobs = self.jobs.read().await;
        let job = jobs.require_job(&job_id)?;
        require_job_access(caller, job)?;
        Ok(job.clone())
    }

    /// Agents see every job, clients their own.
    pub async fn list_jobs(&self, caller: &Caller) -> CoreResult<Vec<Job>> {
        caller.require(&[Role::Agent, Role::Client])?;
        let jobs = self.jobs.read().await;
        Ok(jobs
            .list_jobs()
            .into_iter()
            .filter(|j| caller.is_agent() || j.client_id.as_deref() == Some(caller.id.as_str()))
            .cloned()
            .collect())
    }

    pub async fn advance_stage(&self, caller: &Caller, job_id: Uuid, target: Stage, note: &str) -> CoreResult<Job> {
        caller.require(&[Role::Agent])?;

        let mut jobs = self.jobs.write().await;
        let from = jobs.advance_stage(&job_id, target, note)?;
        let job = jobs.require_job(&job_id)?.clone();
        drop(jobs);

        if from.next() == Some(target) {
            info!(%job_id, %from, to = %target, "Stage advanced");
        } else {
            warn!(%job_id, %from, to = %target, "Non-sequential stage transition");
        }
        self.events.publish(DomainEvent::StageAdvanced {
            job_id,
            from_stage: from.as_str().to_string(),
            to_stage: target.as_str().to_string(),
            note: note.trim().to_string(),
            timestamp: now(),
        });
        Ok(job)
    }

    pub async fn set_service_fee(
        &self,
        caller: &Caller,
        job_id: Uuid,
        fee: Cents,
        deposit: Option<Cents>,
    ) -> CoreResult<Job> {
        caller.require(&[Role::Agent])?;

        let mut jobs = self.jobs.write().await;
        jobs.set_service_fee(&job_id, fee, deposit)?;
        let job = jobs.require_job(&job_id)?.clone();
        drop(jobs);

        info!(%job_id, %fee, deposit = ?deposit.map(|d| d.value()), "Service fee set");
        if let Some(deposit) = deposit.filter(|d| d.is_positive()) {
            self.events.publish(DomainEvent::DepositRequested {
                job_id,
                deposit_cents: deposit.value(),
                timestamp: now(),
            });
        }
        Ok(job)
    }

    /// Open a deposit checkout with the payment provider. Records nothing:
    /// the deposit counts once `record_deposit_paid` confirms it.
    pub async fn request_deposit_checkout(&self, caller: &Caller, job_id: Uuid) -> CoreResult<DepositIntent> {
        let amount = {
            let jobs = self.jobs.read().await;
            let job = jobs.require_job(&job_id)?;
            require_job_access(caller, job)?;
            if job.deposit_paid_at().is_some() {
                return Err(CoreError::conflict(format!("Deposit for job {} is already paid", job_id)));
            }
            match job.deposit_amount() {
                Some(amount) if amount.is_positive() => amount,
                _ => return Err(CoreError::conflict(format!("No deposit requested for job {}", job_id))),
            }
        };

        self.payments.create_deposit_intent(job_id, amount).await.map_err(|e| {
            warn!(%job_id, error = %e, "Deposit checkout failed");
            CoreError::upstream(e.to_string())
        })
    }

    pub async fn record_deposit_paid(
        &self,
        caller: &Caller,
        job_id: Uuid,
        paid_at: Option<DateTime<Utc>>,
    ) -> CoreResult<Job> {
        caller.require(&[Role::Agent])?;

        let mut jobs = self.jobs.write().await;
        let amount = jobs.record_deposit_paid(&job_id, paid_at.unwrap_or_else(Utc::now))?;
        let job = jobs.require_job(&job_id)?.clone();
        drop(jobs);

        info!(%job_id, %amount, "Deposit paid");
        self.events.publish(DomainEvent::DepositPaid {
            job_id,
            deposit_cents: amount.value(),
            timestamp: now(),
        });
        Ok(job)
    }

    pub async fn update_scope_notes(&self, caller: &Caller, job_id: Uuid, notes: Option<String>) -> CoreResult<Job> {
        caller.require(&[Role::Agent])?;
        let mut jobs = self.jobs.write().await;
        jobs.update_scope_notes(&job_id, notes)?;
        Ok(jobs.require_job(&job_id)?.clone())
    }

    pub async fn set_hauling_cost(&self, caller: &Caller, job_id: Uuid, cost: Cents) -> CoreResult<Job> {
        caller.require(&[Role::Agent])?;
        let mut jobs = self.jobs.write().await;
        jobs.set_hauling_cost(&job_id, cost)?;
        Ok(jobs.require_job(&job_id)?.clone())
    }

    pub async fn record_daily_sale(
        &self,
        caller: &Caller,
        job_id: Uuid,
        date: NaiveDate,
        amount: Cents,
        note: Option<String>,
    ) -> CoreResult<Job> {
        caller.require(&[Role::Agent])?;
        let mut jobs = self.jobs.write().await;
        let gross = jobs.record_daily_sale(&job_id, date, amount, note)?;
        info!(%job_id, %date, %amount, %gross, "Daily sale recorded");
        Ok(jobs.require_job(&job_id)?.clone())
    }

    /// Settlement preview; the owning client may look too.
    pub async fn settlement(&self, caller: &Caller, job_id: Uuid) -> CoreResult<Settlement> {
        let jobs = self.jobs.read().await;
        require_job_access(caller, jobs.require_job(&job_id)?)?;
        Ok(jobs.settlement(&job_id)?)
    }

    pub async fn finalize_settlement(&self, caller: &Caller, job_id: Uuid) -> CoreResult<Settlement> {
        caller.require(&[Role::Agent])?;
        let settlement = self.jobs.write().await.finalize_settlement(&job_id)?;

        info!(%job_id, commission = %settlement.commission, net = %settlement.net, "Settlement finalized");
        self.events.publish(DomainEvent::SettlementFinalized {
            job_id,
            commission_cents: settlement.commission.value(),
            net_cents: settlement.net.value(),
            timestamp: now(),
        });
        Ok(settlement)
    }

    // ========================================================================
    // Item batches
    // ========================================================================

    pub async fn create_item_batch(&self, caller: &Caller, job_id: Uuid) -> CoreResult<ItemBatch> {
        let jobs = self.jobs.read().await;
        require_job_access(caller, jobs.require_job(&job_id)?)?;
        let batch = self.items.write().await.create_item_batch(job_id)?;
        info!(%job_id, item_id = %batch.id, "Item batch created");
        Ok(batch)
    }

    pub async fn append_photos(&self, caller: &Caller, item_id: Uuid, urls: Vec<String>) -> CoreResult<ItemBatch> {
        let count = urls.len();
        let batch = self
            .edit_batch(caller, &item_id, |items| items.append_photos(&item_id, urls).map(|_| ()))
            .await?;
        info!(%item_id, added = count, total = batch.photos().len(), "Photos appended");
        Ok(batch)
    }

    pub async fn set_photo_groups(&self, caller: &Caller, item_id: Uuid, groups: Vec<PhotoGroup>) -> CoreResult<ItemBatch> {
        self.edit_batch(caller, &item_id, |items| items.set_photo_groups(&item_id, groups)).await
    }

    pub async fn submit_for_review(&self, caller: &Caller, item_id: Uuid) -> CoreResult<ItemBatch> {
        self.edit_batch(caller, &item_id, |items| items.submit_for_review(&item_id)).await
    }

    pub async fn approve_items(&self, caller: &Caller, item_id: Uuid, approved: Vec<ApprovedItem>) -> CoreResult<ItemBatch> {
        caller.require(&[Role::Agent])?;
        let approved_count = approved.len();

        let mut items = self.items.write().await;
        items.approve(&item_id, approved)?;
        let batch = items.require(&item_id)?.clone();
        drop(items);

        info!(%item_id, approved_count, "Item batch approved");
        self.events.publish(DomainEvent::ItemsApproved {
            job_id: batch.job_id,
            item_batch_id: item_id,
            approved_count,
            timestamp: now(),
        });
        Ok(batch)
    }

    pub async fn reopen_items(&self, caller: &Caller, item_id: Uuid, reason: &str) -> CoreResult<ItemBatch> {
        caller.require(&[Role::Agent])?;

        let mut items = self.items.write().await;
        items.reopen(&item_id, reason)?;
        let batch = items.require(&item_id)?.clone();
        drop(items);

        info!(%item_id, "Item batch reopened for review");
        self.events.publish(DomainEvent::ItemsReopened {
            job_id: batch.job_id,
            item_batch_id: item_id,
            reason: reason.trim().to_string(),
            timestamp: now(),
        });
        Ok(batch)
    }

    /// Agent bookkeeping by raw photo index
    pub async fn mark_disposition(
        &self,
        caller: &Caller,
        item_id: Uuid,
        indices: &[usize],
        kind: Disposition,
    ) -> CoreResult<ItemBatch> {
        caller.require(&[Role::Agent])?;
        let mut items = self.items.write().await;
        items.mark_disposition(&item_id, indices, kind)?;
        info!(%item_id, ?indices, %kind, "Disposition recorded");
        Ok(items.require(&item_id)?.clone())
    }

    /// Agent bookkeeping by item number; the way sales get recorded.
    pub async fn mark_item_numbers(
        &self,
        caller: &Caller,
        item_id: Uuid,
        item_numbers: &[u32],
        kind: Disposition,
    ) -> CoreResult<Vec<usize>> {
        caller.require(&[Role::Agent])?;
        let marked = self.items.write().await.mark_item_numbers(&item_id, item_numbers, kind)?;
        info!(%item_id, ?item_numbers, %kind, "Items marked");
        Ok(marked)
    }

    pub async fn get_item_batch(&self, caller: &Caller, item_id: Uuid) -> CoreResult<ItemBatch> {
        self.read_batch(caller, &item_id, |items| items.require(&item_id).cloned()).await
    }

    pub async fn item_batch_for_job(&self, caller: &Caller, job_id: Uuid) -> CoreResult<ItemBatch> {
        let item_id = self
            .items
            .read()
            .await
            .batch_for_job(&job_id)
            .map(|b| b.id)
            .ok_or_else(|| CoreError::not_found("Item batch for job", job_id))?;
        self.get_item_batch(caller, item_id).await
    }

    pub async fn group_views(&self, caller: &Caller, item_id: Uuid) -> CoreResult<Vec<GroupView>> {
        self.read_batch(caller, &item_id, |items| items.group_views(&item_id)).await
    }

    pub async fn photo_group_disposition(
        &self,
        caller: &Caller,
        item_id: Uuid,
        item_number: u32,
    ) -> CoreResult<GroupDisposition> {
        self.read_batch(caller, &item_id, |items| items.photo_group_disposition(&item_id, item_number))
            .await
    }

    pub async fn disposition_summary(&self, caller: &Caller, item_id: Uuid) -> CoreResult<DispositionSummary> {
        self.read_batch(caller, &item_id, |items| items.disposition_summary(&item_id)).await
    }

    /// Runs `op` on a batch the caller may edit: agents, or the owning client.
    async fn edit_batch<F>(&self, caller: &Caller, item_id: &Uuid, op: F) -> CoreResult<ItemBatch>
    where
        F: FnOnce(&mut ItemDispositionTracker) -> Result<(), ItemError>,
    {
        let jobs = self.jobs.read().await;
        let mut items = self.items.write().await;
        let job_id = items.require(item_id)?.job_id;
        require_job_access(caller, jobs.require_job(&job_id)?)?;

        op(&mut *items)?;
        Ok(items.require(item_id)?.clone())
    }

    async fn read_batch<T, F>(&self, caller: &Caller, item_id: &Uuid, view: F) -> CoreResult<T>
    where
        F: FnOnce(&ItemDispositionTracker) -> Result<T, ItemError>,
    {
        let jobs = self.jobs.read().await;
        let items = self.items.read().await;
        let bids = self.bids.read().await;
        let job_id = items.require(item_id)?.job_id;
        require_batch_access(caller, jobs.require_job(&job_id)?, &bids)?;

        Ok(view(&*items)?)
    }

    // ========================================================================
    // Vendor bids
    // ========================================================================

    pub async fn list_opportunities(&self, caller: &Caller) -> CoreResult<Vec<Opportunity>> {
        caller.require(&[Role::Agent, Role::Vendor])?;
        let jobs = self.jobs.read().await;
        let bids = self.bids.read().await;
        let open = jobs.list_jobs().into_iter().map(|j| (j.id, j.stage()));
        Ok(bids.opportunities_for_vendor(&caller.id, open))
    }

    /// Bid on the job's current opportunity as the calling vendor
    pub async fn submit_bid(&self, caller: &Caller, job_id: Uuid, terms: BidTerms) -> CoreResult<Bid> {
        caller.require(&[Role::Agent, Role::Vendor])?;

        let jobs = self.jobs.read().await;
        let stage = jobs.require_job(&job_id)?.stage();
        let bid = self.bids.write().await.submit_bid(job_id, stage, &caller.id, terms)?;
        drop(jobs);

        info!(%job_id, bid_id = %bid.id, vendor_id = %bid.vendor_id, bid_type = %bid.bid_type, amount = %bid.amount(), "Bid submitted");
        self.events.publish(DomainEvent::BidSubmitted {
            job_id,
            bid_id: bid.id,
            vendor_id: bid.vendor_id.clone(),
            bid_type: bid.bid_type.as_str().to_string(),
            amount_cents: bid.amount().value(),
            timestamp: now(),
        });
        Ok(bid)
    }

    pub async fn get_bid(&self, caller: &Caller, bid_id: Uuid) -> CoreResult<Bid> {
        let jobs = self.jobs.read().await;
        let bids = self.bids.read().await;
        let bid = bids.require(&bid_id)?;
        match caller.role {
            Role::Vendor => require_bid_vendor(caller, bid)?,
            _ => require_job_access(caller, jobs.require_job(&bid.job_id)?)?,
        }
        Ok(bid.clone())
    }

    pub async fn bids_for_job(&self, caller: &Caller, job_id: Uuid) -> CoreResult<Vec<Bid>> {
        let jobs = self.jobs.read().await;
        require_job_access(caller, jobs.require_job(&job_id)?)?;
        Ok(self.bids.read().await.bids_for_job(&job_id).into_iter().cloned().collect())
    }

    pub async fn my_bids(&self, caller: &Caller) -> CoreResult<Vec<Bid>> {
        caller.require(&[Role::Vendor])?;
        Ok(self.bids.read().await.bids_for_vendor(&caller.id).into_iter().cloned().collect())
    }

    /// Award the work; every competing pending bid is rejected in the same step.
    pub async fn accept_bid(&self, caller: &Caller, bid_id: Uuid) -> CoreResult<Bid> {
        let jobs = self.jobs.read().await;
        let mut bids = self.bids.write().await;
        let job_id = bids.require(&bid_id)?.job_id;
        require_job_access(caller, jobs.require_job(&job_id)?)?;

        let rejected = bids.accept_bid(&bid_id)?;
        let bid = bids.require(&bid_id)?.clone();
        drop(bids);
        drop(jobs);

        info!(%job_id, %bid_id, vendor_id = %bid.vendor_id, rejected = rejected.len(), "Bid accepted");
        self.events.publish(DomainEvent::BidAccepted {
            job_id,
            bid_id,
            vendor_id: bid.vendor_id.clone(),
            rejected_bid_ids: rejected,
            timestamp: now(),
        });
        Ok(bid)
    }

    pub async fn reject_bid(&self, caller: &Caller, bid_id: Uuid) -> CoreResult<Bid> {
        let jobs = self.jobs.read().await;
        let mut bids = self.bids.write().await;
        let job_id = bids.require(&bid_id)?.job_id;
        require_job_access(caller, jobs.require_job(&job_id)?)?;

        bids.reject_bid(&bid_id)?;
        let bid = bids.require(&bid_id)?.clone();
        drop(bids);
        drop(jobs);

        info!(%job_id, %bid_id, "Bid rejected");
        self.events.publish(DomainEvent::BidRejected {
            job_id,
            bid_id,
            vendor_id: bid.vendor_id.clone(),
            timestamp: now(),
        });
        Ok(bid)
    }

    /// Vendor records donated or hauled items. Overlapping calls serialize on
    /// the items lock; the later one finds the items taken and fails whole.
    pub async fn mark_items_disposed(
        &self,
        caller: &Caller,
        bid_id: Uuid,
        item_numbers: &[u32],
        kind: Disposition,
    ) -> CoreResult<Vec<usize>> {
        let mut items = self.items.write().await;
        let mut bids = self.bids.write().await;
        require_bid_vendor(caller, bids.require(&bid_id)?)?;

        let marked = bids.mark_items_disposed(&mut items, &bid_id, item_numbers, kind)?;
        info!(%bid_id, ?item_numbers, %kind, photos = marked.len(), "Items disposed by vendor");
        Ok(marked)
    }

    pub async fn complete_work(&self, caller: &Caller, bid_id: Uuid) -> CoreResult<Bid> {
        let mut bids = self.bids.write().await;
        require_bid_vendor(caller, bids.require(&bid_id)?)?;
        bids.complete_work(&bid_id)?;
        let bid = bids.require(&bid_id)?.clone();
        drop(bids);

        info!(%bid_id, vendor_id = %bid.vendor_id, "Work completed");
        self.events.publish(DomainEvent::WorkCompleted {
            job_id: bid.job_id,
            bid_id,
            vendor_id: bid.vendor_id.clone(),
            timestamp: now(),
        });
        Ok(bid)
    }

    pub async fn attach_receipt(&self, caller: &Caller, bid_id: Uuid, url: &str) -> CoreResult<Bid> {
        let mut bids = self.bids.write().await;
        require_bid_vendor(caller, bids.require(&bid_id)?)?;
        bids.attach_receipt(&bid_id, url)?;
        let bid = bids.require(&bid_id)?.clone();
        drop(bids);

        let receipt_url = bid.receipt().map(|r| r.url.clone()).unwrap_or_default();
        info!(%bid_id, %receipt_url, "Receipt attached");
        self.events.publish(DomainEvent::ReceiptAttached {
            job_id: bid.job_id,
            bid_id,
            receipt_url,
            timestamp: now(),
        });
        Ok(bid)
    }

    /// Record a payout made outside the system
    pub async fn mark_paid(&self, caller: &Caller, bid_id: Uuid) -> CoreResult<Bid> {
        caller.require(&[Role::Agent])?;

        let mut bids = self.bids.write().await;
        bids.mark_paid(&bid_id)?;
        let bid = bids.require(&bid_id)?.clone();
        drop(bids);

        self.publish_vendor_paid(&bid);
        Ok(bid)
    }

    /// Send the payout through the payment provider, then record it as paid.
    ///
    /// The bids write lock is held across the provider call, so a concurrent
    /// payout for the same bid waits and then finds it already paid.
    pub async fn pay_vendor(&self, caller: &Caller, bid_id: Uuid) -> CoreResult<PayoutConfirmation> {
        caller.require(&[Role::Agent])?;

        let mut bids = self.bids.write().await;
        let request = {
            let bid = bids.require(&bid_id)?;
            if bid.receipt().is_none() {
                return Err(BidError::NoReceipt(bid_id).into());
            }
            if bid.is_paid() {
                return Err(BidError::AlreadyPaid(bid_id).into());
            }
            PayoutRequest {
                bid_id,
                vendor_id: bid.vendor_id.clone(),
                amount: bid.amount(),
                method: bid.payment().method().to_string(),
            }
        };

        let confirmation = self.payments.initiate_payout(&request).await.map_err(|e| {
            warn!(%bid_id, error = %e, "Vendor payout failed");
            CoreError::upstream(e.to_string())
        })?;

        bids.mark_paid(&bid_id)?;
        let bid = bids.require(&bid_id)?.clone();
        drop(bids);

        self.publish_vendor_paid(&bid);
        Ok(confirmation)
    }

    fn publish_vendor_paid(&self, bid: &Bid) {
        info!(bid_id = %bid.id, vendor_id = %bid.vendor_id, amount = %bid.amount(), "Vendor paid");
        self.events.publish(DomainEvent::VendorPaid {
            job_id: bid.job_id,
            bid_id: bid.id,
            vendor_id: bid.vendor_id.clone(),
            amount_cents: bid.amount().value(),
            timestamp: now(),
        });
    }

    // ========================================================================
    // Orders
    // ========================================================================

    pub async fn create_order(
        &self,
        caller: &Caller,
        job_id: Option<Uuid>,
        items: Vec<OrderLine>,
        delivery: DeliveryDetails,
    ) -> CoreResult<Order> {
        caller.require(&[Role::Agent, Role::Client])?;

        let jobs = self.jobs.read().await;
        if let Some(job_id) = job_id {
            jobs.require_job(&job_id)?;
        }
        let order = self.orders.write().await.create_order(&caller.id, job_id, items, delivery)?;
        drop(jobs);

        info!(order_id = %order.id, buyer_id = %order.buyer_id, total = %order.total_amount(), "Order placed");
        self.events.publish(DomainEvent::OrderPlaced {
            order_id: order.id,
            buyer_id: order.buyer_id.clone(),
            total_cents: order.total_amount().value(),
            timestamp: now(),
        });
        Ok(order)
    }

    pub async fn get_order(&self, caller: &Caller, order_id: Uuid) -> CoreResult<Order> {
        let orders = self.orders.read().await;
        let order = orders.require(&order_id)?;
        caller.require_agent_or(Some(order.buyer_id.as_str()))?;
        Ok(order.clone())
    }

    pub async fn my_orders(&self, caller: &Caller) -> CoreResult<Vec<Order>> {
        Ok(self.orders.read().await.orders_for_buyer(&caller.id).into_iter().cloned().collect())
    }

    pub async fn record_payment(&self, caller: &Caller, order_id: Uuid, status: PaymentStatus) -> CoreResult<Order> {
        caller.require(&[Role::Agent])?;
        let mut orders = self.orders.write().await;
        orders.record_payment(&order_id, status)?;
        info!(%order_id, %status, "Order payment recorded");
        Ok(orders.require(&order_id)?.clone())
    }

    pub async fn advance_fulfillment(
        &self,
        caller: &Caller,
        order_id: Uuid,
        status: FulfillmentStatus,
        tracking_number: Option<String>,
        note: Option<String>,
    ) -> CoreResult<Order> {
        caller.require(&[Role::Agent])?;

        let mut orders = self.orders.write().await;
        orders.advance_fulfillment(&order_id, status, tracking_number, note)?;
        let order = orders.require(&order_id)?.clone();
        drop(orders);

        info!(%order_id, %status, "Fulfillment advanced");
        self.events.publish(DomainEvent::FulfillmentAdvanced {
            order_id,
            status: status.as_str().to_string(),
            note: order.fulfillment_log().last().and_then(|n| n.note.clone()),
            timestamp: now(),
        });
        Ok(order)
    }
}

fn now() -> i64 {
    Utc::now().timestamp()
}

/// Agents, or the client who owns the job.
fn require_job_access(caller: &Caller, job: &Job) -> CoreResult<()> {
    caller.require(&[Role::Agent, Role::Client])?;
    caller.require_agent_or(job.client_id.as_deref())
}

/// Agents, or the vendor who placed the bid.
fn require_bid_vendor(caller: &Caller, bid: &Bid) -> CoreResult<()> {
    caller.require(&[Role::Agent, Role::Vendor])?;
    caller.require_agent_or(Some(bid.vendor_id.as_str()))
}

/// Job owner, or a vendor holding accepted work on the job.
fn require_batch_access(caller: &Caller, job: &Job, bids: &VendorBidEngine) -> CoreResult<()> {
    match caller.role {
        Role::Agent | Role::Client => require_job_access(caller, job),
        Role::Vendor => {
            let awarded = bids
                .bids_for_job(&job.id)
                .iter()
                .any(|b| b.vendor_id == caller.id && b.status() == BidStatus::Accepted);
            if awarded {
                Ok(())
            } else {
                Err(CoreError::forbidden(format!(
                    "vendor {} holds no accepted bid on job {}",
                    caller.id, job.id
                )))
            }
        }
    }
}
