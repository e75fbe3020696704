use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use estate_core::{Cents, CoreError};

use crate::fulfillment;
use crate::models::{DeliveryDetails, DeliveryType, FulfillmentStatus, Order, OrderLine, PaymentStatus};

/// Manages buyer orders from checkout through delivery
pub struct OrderManager {
    orders: HashMap<Uuid, Order>,
}

impl OrderManager {
    pub fn new() -> Self {
        Self {
            orders: HashMap::new(),
        }
    }

    /// Create an order at checkout
    pub fn create_order(
        &mut self,
        buyer_id: &str,
        job_id: Option<Uuid>,
        items: Vec<OrderLine>,
        delivery: DeliveryDetails,
    ) -> Result<Order, OrderError> {
        if buyer_id.trim().is_empty() {
            return Err(OrderError::Invalid("buyer id must not be empty".to_string()));
        }
        if items.is_empty() {
            return Err(OrderError::Empty);
        }

        let mut numbers = HashSet::new();
        for line in &items {
            if line.price.is_negative() {
                return Err(OrderError::Invalid(format!("item {} has a negative price", line.item_number)));
            }
            if line.title.trim().is_empty() {
                return Err(OrderError::Invalid(format!("item {} has no title", line.item_number)));
            }
            if !numbers.insert(line.item_number) {
                return Err(OrderError::DuplicateItem(line.item_number));
            }
        }
        if Cents::checked_sum(items.iter().map(|line| line.price)).is_none() {
            return Err(OrderError::Invalid("order total is out of range".to_string()));
        }
        validate_delivery(&delivery)?;

        let order = Order::new(buyer_id.to_string(), job_id, items, delivery);
        self.orders.insert(order.id, order.clone());
        Ok(order)
    }

    pub fn get_order(&self, order_id: &Uuid) -> Option<&Order> {
        self.orders.get(order_id)
    }

    pub fn require(&self, order_id: &Uuid) -> Result<&Order, OrderError> {
        self.orders.get(order_id).ok_or(OrderError::NotFound(*order_id))
    }

    /// A buyer's orders, newest first
    pub fn orders_for_buyer(&self, buyer_id: &str) -> Vec<&Order> {
        let mut orders: Vec<&Order> = self.orders.values().filter(|o| o.buyer_id == buyer_id).collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders
    }

    /// Transition: Pending → Paid | Failed
    pub fn record_payment(&mut self, order_id: &Uuid, status: PaymentStatus) -> Result<(), OrderError> {
        if status == PaymentStatus::Pending {
            return Err(OrderError::Invalid("payment outcome must be paid or failed".to_string()));
        }

        let order = self.get_order_mut(order_id)?;
        if order.payment_status != PaymentStatus::Pending {
            return Err(OrderError::PaymentAlreadyRecorded {
                order_id: *order_id,
                status: order.payment_status,
            });
        }

        order.payment_status = status;
        order.updated_at = chrono::Utc::now();
        Ok(())
    }

    /// Move fulfillment forward within the order's delivery vocabulary
    pub fn advance_fulfillment(
        &mut self,
        order_id: &Uuid,
        status: FulfillmentStatus,
        tracking_number: Option<String>,
        note: Option<String>,
    ) -> Result<(), OrderError> {
        let order = self.get_order_mut(order_id)?;
        fulfillment::advance(order, status, tracking_number, note)
    }

    fn get_order_mut(&mut self, order_id: &Uuid) -> Result<&mut Order, OrderError> {
        self.orders.get_mut(order_id).ok_or(OrderError::NotFound(*order_id))
    }
}

impl Default for OrderManager {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_delivery(delivery: &DeliveryDetails) -> Result<(), OrderError> {
    let missing = match delivery {
        DeliveryDetails::Pickup { time_slot, .. } => {
            if time_slot.trim().is_empty() { Some("time_slot") } else { None }
        }
        DeliveryDetails::Shipping { recipient, street, city, state, postal_code } => [
            ("recipient", recipient),
            ("street", street),
            ("city", city),
            ("state", state),
            ("postal_code", postal_code),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field),
    };

    match missing {
        Some(field) => Err(OrderError::Invalid(format!("delivery {} is required", field))),
        None => Ok(()),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Order not found: {0}")]
    NotFound(Uuid),

    #[error("Order must contain at least one item")]
    Empty,

    #[error("Item {0} appears twice in the order")]
    DuplicateItem(u32),

    #[error("Payment for order {order_id} already recorded as {status}")]
    PaymentAlreadyRecorded { order_id: Uuid, status: PaymentStatus },

    #[error("Status {status} is not used for {delivery} orders")]
    StatusNotAllowed { status: FulfillmentStatus, delivery: DeliveryType },

    #[error("Cannot move fulfillment from {from} to {to}")]
    NotForward { from: FulfillmentStatus, to: FulfillmentStatus },

    #[error("Invalid order: {0}")]
    Invalid(String),
}

impl From<OrderError> for CoreError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::NotFound(id) => CoreError::not_found("Order", id),
            OrderError::Empty
            | OrderError::DuplicateItem(_)
            | OrderError::StatusNotAllowed { .. }
            | OrderError::Invalid(_) => CoreError::Validation(err.to_string()),
            OrderError::PaymentAlreadyRecorded { .. } | OrderError::NotForward { .. } => {
                CoreError::Conflict(err.to_string())
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::NaiveDate;
    use estate_core::Cents;

    pub(crate) fn lines() -> Vec<OrderLine> {
        vec![
            OrderLine { item_number: 4, title: "Oak dresser".into(), price: Cents::from_dollars(180) },
            OrderLine { item_number: 9, title: "Brass lamp".into(), price: Cents::new(3_550) },
        ]
    }

    pub(crate) fn pickup() -> DeliveryDetails {
        DeliveryDetails::Pickup {
            scheduled_date: NaiveDate::from_ymd_opt(2026, 6, 14).unwrap(),
            time_slot: "09:00-11:00".into(),
        }
    }

    pub(crate) fn shipping() -> DeliveryDetails {
        DeliveryDetails::Shipping {
            recipient: "Dana Cole".into(),
            street: "12 Elm St".into(),
            city: "Dayton".into(),
            state: "OH".into(),
            postal_code: "45402".into(),
        }
    }

    #[test]
    fn test_create_order() {
        let mut manager = OrderManager::new();
        let order = manager.create_order("buyer-1", None, lines(), pickup()).unwrap();

        assert_eq!(order.total_amount(), Cents::new(21_550));
        assert_eq!(order.items().len(), 2);
        assert!(manager.get_order(&order.id).is_some());
        assert_eq!(manager.orders_for_buyer("buyer-1").len(), 1);
        assert!(manager.orders_for_buyer("buyer-2").is_empty());
    }

    #[test]
    fn test_create_order_validation() {
        let mut manager = OrderManager::new();
        assert!(matches!(manager.create_order("b", None, vec![], pickup()), Err(OrderError::Empty)));

        let mut dup = lines();
        dup[1].item_number = 4;
        assert!(matches!(manager.create_order("b", None, dup, pickup()), Err(OrderError::DuplicateItem(4))));

        let mut negative = lines();
        negative[0].price = Cents::new(-1);
        assert!(matches!(manager.create_order("b", None, negative, pickup()), Err(OrderError::Invalid(_))));

        let mut huge = lines();
        huge[0].price = Cents::new(i64::MAX);
        assert!(matches!(manager.create_order("b", None, huge, pickup()), Err(OrderError::Invalid(_))));

        let no_city = DeliveryDetails::Shipping {
            recipient: "Dana".into(),
            street: "12 Elm St".into(),
            city: " ".into(),
            state: "OH".into(),
            postal_code: "45402".into(),
        };
        assert!(matches!(manager.create_order("b", None, lines(), no_city), Err(OrderError::Invalid(_))));
    }

    #[test]
    fn test_payment_recorded_once() {
        let mut manager = OrderManager::new();
        let order = manager.create_order("buyer-1", None, lines(), shipping()).unwrap();

        assert!(matches!(manager.record_payment(&order.id, PaymentStatus::Pending), Err(OrderError::Invalid(_))));
        manager.record_payment(&order.id, PaymentStatus::Paid).unwrap();
        assert_eq!(manager.get_order(&order.id).unwrap().payment_status(), PaymentStatus::Paid);

        assert!(matches!(
            manager.record_payment(&order.id, PaymentStatus::Failed),
            Err(OrderError::PaymentAlreadyRecorded { .. })
        ));
    }

    #[test]
    fn test_error_classification() {
        assert!(matches!(CoreError::from(OrderError::Empty), CoreError::Validation(_)));
        assert!(matches!(
            CoreError::from(OrderError::NotForward { from: FulfillmentStatus::Ready, to: FulfillmentStatus::Pending }),
            CoreError::Conflict(_)
        ));
        assert!(matches!(CoreError::from(OrderError::NotFound(Uuid::nil())), CoreError::NotFound { .. }));
    }
}
