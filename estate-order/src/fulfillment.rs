use chrono::Utc;

use crate::manager::OrderError;
use crate::models::{DeliveryType, FulfillmentNote, FulfillmentStatus, Order};

/// Apply a fulfillment step to an order.
///
/// The status must belong to the order's delivery vocabulary and sit strictly
/// after the current one. A tracking number is kept for shipping orders only;
/// on pickup orders it is dropped.
pub(crate) fn advance(
    order: &mut Order,
    status: FulfillmentStatus,
    tracking_number: Option<String>,
    note: Option<String>,
) -> Result<(), OrderError> {
    let delivery = order.delivery_type();
    let flow = FulfillmentStatus::allowed_for(delivery);

    let target = position(flow, status).ok_or(OrderError::StatusNotAllowed { status, delivery })?;
    let current = position(flow, order.fulfillment_status).unwrap_or_default();
    if target <= current {
        return Err(OrderError::NotForward {
            from: order.fulfillment_status,
            to: status,
        });
    }

    let now = Utc::now();
    if delivery == DeliveryType::Shipping {
        if let Some(tracking) = tracking_number.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) {
            order.tracking_number = Some(tracking);
        }
    }
    order.fulfillment_status = status;
    order.fulfillment_log.push(FulfillmentNote {
        status,
        note: note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
        timestamp: now,
    });
    order.updated_at = now;

    Ok(())
}

fn position(flow: &[FulfillmentStatus], status: FulfillmentStatus) -> Option<usize> {
    flow.iter().position(|s| *s == status)
}
