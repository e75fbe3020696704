use serde::{Deserialize, Serialize};
use uuid::Uuid;

use estate_job::{Stage, ServiceType};

/// A job whose current stage is open for vendor bids
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Opportunity {
    pub job_id: Uuid,
    pub stage: Stage,
    pub service_type: ServiceType,
    /// Bids still awaiting a decision, from any vendor.
    pub open_bids: usize,
}

impl Opportunity {
    /// `None` when the stage does not call for vendor work.
    pub fn for_stage(job_id: Uuid, stage: Stage) -> Option<Self> {
        stage.service_type().map(|service_type| Self {
            job_id,
            stage,
            service_type,
            open_bids: 0,
        })
    }
}
