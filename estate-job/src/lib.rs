pub mod models;
pub mod stage;
pub mod machine;
pub mod finance;
pub mod settlement;

pub use models::{Job, JobIntake, ContactInfo, Address, IntakeDetails, RequestedService, Finance, DailySale, StageNote};
pub use stage::{Stage, StageInfo, ServiceType};
pub use machine::{StageMachine, JobError};
pub use finance::FinanceLedger;
pub use settlement::{CommissionSchedule, CommissionTier, Settlement, SettlementCalculator, compute_commission};
