pub mod models;
pub mod payment_details;
pub mod opportunity;
pub mod engine;

pub use models::{Bid, BidStatus, BidTerms, Receipt};
pub use payment_details::{PaymentDetails, PaymentInput};
pub use opportunity::Opportunity;
pub use engine::{VendorBidEngine, BidError};

/// Bid type is the service type implied by the job's stage at submission.
pub use estate_job::ServiceType as BidType;
