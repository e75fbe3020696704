use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;
use std::str::FromStr;

use estate_core::Cents;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
        })
    }
}

/// Fulfillment progress. Declaration order is the forward order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentStatus {
    Pending,
    Processing,
    Ready,
    PickedUp,
    Shipped,
    Delivered,
}

const PICKUP_FLOW: &[FulfillmentStatus] = &[
    FulfillmentStatus::Pending,
    FulfillmentStatus::Processing,
    FulfillmentStatus::Ready,
    FulfillmentStatus::PickedUp,
];

const SHIPPING_FLOW: &[FulfillmentStatus] = &[
    FulfillmentStatus::Pending,
    FulfillmentStatus::Processing,
    FulfillmentStatus::Ready,
    FulfillmentStatus::Shipped,
    FulfillmentStatus::Delivered,
];

impl FulfillmentStatus {
    /// The ordered vocabulary for a delivery type
    pub fn allowed_for(delivery: DeliveryType) -> &'static [FulfillmentStatus] {
        match delivery {
            DeliveryType::Pickup => PICKUP_FLOW,
            DeliveryType::Shipping => SHIPPING_FLOW,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FulfillmentStatus::Pending => "pending",
            FulfillmentStatus::Processing => "processing",
            FulfillmentStatus::Ready => "ready",
            FulfillmentStatus::PickedUp => "picked_up",
            FulfillmentStatus::Shipped => "shipped",
            FulfillmentStatus::Delivered => "delivered",
        }
    }
}

impl fmt::Display for FulfillmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FulfillmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(FulfillmentStatus::Pending),
            "processing" => Ok(FulfillmentStatus::Processing),
            "ready" => Ok(FulfillmentStatus::Ready),
            "picked_up" => Ok(FulfillmentStatus::PickedUp),
            "shipped" => Ok(FulfillmentStatus::Shipped),
            "delivered" => Ok(FulfillmentStatus::Delivered),
            other => Err(format!("unknown fulfillment status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryType {
    Pickup,
    Shipping,
}

impl fmt::Display for DeliveryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeliveryType::Pickup => "pickup",
            DeliveryType::Shipping => "shipping",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeliveryDetails {
    Pickup {
        scheduled_date: NaiveDate,
        time_slot: String,
    },
    Shipping {
        recipient: String,
        street: String,
        city: String,
        state: String,
        postal_code: String,
    },
}

impl DeliveryDetails {
    pub fn delivery_type(&self) -> DeliveryType {
        match self {
            DeliveryDetails::Pickup { .. } => DeliveryType::Pickup,
            DeliveryDetails::Shipping { .. } => DeliveryType::Shipping,
        }
    }
}

/// One purchased item, copied from the catalog at checkout
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderLine {
    pub item_number: u32,
    pub title: String,
    pub price: Cents,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FulfillmentNote {
    pub status: FulfillmentStatus,
    pub note: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// A buyer's checkout. Lines and total never change after creation.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: Uuid,
    pub buyer_id: String,
    pub job_id: Option<Uuid>,
    items: Vec<OrderLine>,
    total_amount: Cents,
    pub(crate) payment_status: PaymentStatus,
    pub(crate) fulfillment_status: FulfillmentStatus,
    pub delivery: DeliveryDetails,
    pub(crate) tracking_number: Option<String>,
    pub(crate) fulfillment_log: Vec<FulfillmentNote>,
    pub created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(buyer_id: String, job_id: Option<Uuid>, items: Vec<OrderLine>, delivery: DeliveryDetails) -> Self {
        let now = Utc::now();
        let total_amount = items.iter().map(|line| line.price).sum();
        Self {
            id: Uuid::new_v4(),
            buyer_id,
            job_id,
            items,
            total_amount,
            payment_status: PaymentStatus::Pending,
            fulfillment_status: FulfillmentStatus::Pending,
            delivery,
            tracking_number: None,
            fulfillment_log: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn items(&self) -> &[OrderLine] {
        &self.items
    }

    pub fn total_amount(&self) -> Cents {
        self.total_amount
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn fulfillment_status(&self) -> FulfillmentStatus {
        self.fulfillment_status
    }

    pub fn delivery_type(&self) -> DeliveryType {
        self.delivery.delivery_type()
    }

    pub fn tracking_number(&self) -> Option<&str> {
        self.tracking_number.as_deref()
    }

    pub fn fulfillment_log(&self) -> &[FulfillmentNote] {
        &self.fulfillment_log
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
