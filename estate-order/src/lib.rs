pub mod models;
pub mod manager;
pub mod fulfillment;

pub use models::{
    DeliveryDetails, DeliveryType, FulfillmentNote, FulfillmentStatus, Order, OrderLine, PaymentStatus,
};
pub use manager::{OrderManager, OrderError};
