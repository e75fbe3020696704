pub mod app_config;
pub mod events;
pub mod payment;
pub mod store;

pub use events::EventPublisher;
pub use payment::MockPaymentAdapter;
pub use store::EstateStore;
