pub mod models;
pub mod pii;

pub use models::DomainEvent;
pub use pii::Masked;
