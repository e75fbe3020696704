use uuid::Uuid;

/// Signals published whenever a notable transition happens in the core.
///
/// Delivery (email, SMS, push) belongs to whoever subscribes. Enum values are
/// carried as their wire strings and money as integer cents so this crate stays
/// independent of the domain crates.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    JobCreated {
        job_id: Uuid,
        client_id: Option<String>,
        timestamp: i64,
    },
    StageAdvanced {
        job_id: Uuid,
        from_stage: String,
        to_stage: String,
        note: String,
        timestamp: i64,
    },
    DepositRequested {
        job_id: Uuid,
        deposit_cents: i64,
        timestamp: i64,
    },
    DepositPaid {
        job_id: Uuid,
        deposit_cents: i64,
        timestamp: i64,
    },
    SettlementFinalized {
        job_id: Uuid,
        commission_cents: i64,
        net_cents: i64,
        timestamp: i64,
    },
    ItemsApproved {
        job_id: Uuid,
        item_batch_id: Uuid,
        approved_count: usize,
        timestamp: i64,
    },
    ItemsReopened {
        job_id: Uuid,
        item_batch_id: Uuid,
        reason: String,
        timestamp: i64,
    },
    BidSubmitted {
        job_id: Uuid,
        bid_id: Uuid,
        vendor_id: String,
        bid_type: String,
        amount_cents: i64,
        timestamp: i64,
    },
    BidAccepted {
        job_id: Uuid,
        bid_id: Uuid,
        vendor_id: String,
        rejected_bid_ids: Vec<Uuid>,
        timestamp: i64,
    },
    BidRejected {
        job_id: Uuid,
        bid_id: Uuid,
        vendor_id: String,
        timestamp: i64,
    },
    WorkCompleted {
        job_id: Uuid,
        bid_id: Uuid,
        vendor_id: String,
        timestamp: i64,
    },
    ReceiptAttached {
        job_id: Uuid,
        bid_id: Uuid,
        receipt_url: String,
        timestamp: i64,
    },
    VendorPaid {
        job_id: Uuid,
        bid_id: Uuid,
        vendor_id: String,
        amount_cents: i64,
        timestamp: i64,
    },
    OrderPlaced {
        order_id: Uuid,
        buyer_id: String,
        total_cents: i64,
        timestamp: i64,
    },
    FulfillmentAdvanced {
        order_id: Uuid,
        status: String,
        note: Option<String>,
        timestamp: i64,
    },
}

impl DomainEvent {
    /// Short name used as the SSE event name and as a log field.
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::JobCreated { .. } => "job_created",
            DomainEvent::StageAdvanced { .. } => "stage_advanced",
            DomainEvent::DepositRequested { .. } => "deposit_requested",
            DomainEvent::DepositPaid { .. } => "deposit_paid",
            DomainEvent::SettlementFinalized { .. } => "settlement_finalized",
            DomainEvent::ItemsApproved { .. } => "items_approved",
            DomainEvent::ItemsReopened { .. } => "items_reopened",
            DomainEvent::BidSubmitted { .. } => "bid_submitted",
            DomainEvent::BidAccepted { .. } => "bid_accepted",
            DomainEvent::BidRejected { .. } => "bid_rejected",
            DomainEvent::WorkCompleted { .. } => "work_completed",
            DomainEvent::ReceiptAttached { .. } => "receipt_attached",
            DomainEvent::VendorPaid { .. } => "vendor_paid",
            DomainEvent::OrderPlaced { .. } => "order_placed",
            DomainEvent::FulfillmentAdvanced { .. } => "fulfillment_advanced",
        }
    }

    /// Job the event belongs to, when it belongs to one.
    pub fn job_id(&self) -> Option<Uuid> {
        match self {
            DomainEvent::JobCreated { job_id, .. }
            | DomainEvent::StageAdvanced { job_id, .. }
            | DomainEvent::DepositRequested { job_id, .. }
            | DomainEvent::DepositPaid { job_id, .. }
            | DomainEvent::SettlementFinalized { job_id, .. }
            | DomainEvent::ItemsApproved { job_id, .. }
            | DomainEvent::ItemsReopened { job_id, .. }
            | DomainEvent::BidSubmitted { job_id, .. }
            | DomainEvent::BidAccepted { job_id, .. }
            | DomainEvent::BidRejected { job_id, .. }
            | DomainEvent::WorkCompleted { job_id, .. }
            | DomainEvent::ReceiptAttached { job_id, .. }
            | DomainEvent::VendorPaid { job_id, .. } => Some(*job_id),
            DomainEvent::OrderPlaced { .. } | DomainEvent::FulfillmentAdvanced { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_serialization() {
        let event = DomainEvent::DepositRequested {
            job_id: Uuid::nil(),
            deposit_cents: 100_000,
            timestamp: 0,
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "deposit_requested");
        assert_eq!(value["deposit_cents"], 100_000);
        assert_eq!(event.name(), "deposit_requested");
        assert_eq!(event.job_id(), Some(Uuid::nil()));
    }
}
