use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeSet;

use estate_core::Cents;
use estate_shared::Masked;

use crate::stage::Stage;

/// Services a client asks for at intake
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RequestedService {
    EstateSale,
    OnlineSale,
    Staging,
    Donations,
    Hauling,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContactInfo {
    pub name: String,
    pub email: Masked<String>,
    #[serde(default)]
    pub phone: Option<Masked<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
}

/// Free-text intake answers, each one optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IntakeDetails {
    #[serde(default)]
    pub story: Option<String>,
    #[serde(default)]
    pub special_requests: Option<String>,
    #[serde(default)]
    pub access_instructions: Option<String>,
}

/// Everything needed to open a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobIntake {
    #[serde(default)]
    pub client_id: Option<String>,
    pub contact: ContactInfo,
    #[serde(default)]
    pub address: Address,
    #[serde(default)]
    pub desired_completion_date: Option<NaiveDate>,
    #[serde(default)]
    pub requested_services: BTreeSet<RequestedService>,
    #[serde(default)]
    pub intake: IntakeDetails,
}

/// One entry of the stage log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageNote {
    pub stage: Stage,
    pub note: String,
    pub timestamp: DateTime<Utc>,
}

/// Takings for one sale day
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailySale {
    pub date: NaiveDate,
    pub amount: Cents,
    pub note: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Finance {
    /// Sum of `daily`.
    pub gross: Cents,
    /// Commission charged by the last finalized settlement.
    pub fees: Cents,
    pub hauling_cost: Cents,
    /// Net payout of the last finalized settlement.
    pub net: Cents,
    pub daily: Vec<DailySale>,
}

/// An estate-liquidation project, intake through payout.
///
/// Stage, fee/deposit and the stage log are private: they only change through
/// the methods below so the log stays append-only and a paid deposit always
/// has a fee behind it.
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub id: Uuid,
    pub client_id: Option<String>,
    stage: Stage,
    pub contact: ContactInfo,
    pub address: Address,
    pub desired_completion_date: Option<NaiveDate>,
    pub requested_services: BTreeSet<RequestedService>,
    pub intake: IntakeDetails,
    service_fee: Option<Cents>,
    deposit_amount: Option<Cents>,
    deposit_paid_at: Option<DateTime<Utc>>,
    pub finance: Finance,
    stage_notes: Vec<StageNote>,
    pub scope_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(intake: JobIntake) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            client_id: intake.client_id,
            stage: Stage::Walkthrough,
            contact: intake.contact,
            address: intake.address,
            desired_completion_date: intake.desired_completion_date,
            requested_services: intake.requested_services,
            intake: intake.intake,
            service_fee: None,
            deposit_amount: None,
            deposit_paid_at: None,
            finance: Finance::default(),
            stage_notes: Vec::new(),
            scope_notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn stage_notes(&self) -> &[StageNote] {
        &self.stage_notes
    }

    pub fn service_fee(&self) -> Option<Cents> {
        self.service_fee
    }

    pub fn deposit_amount(&self) -> Option<Cents> {
        self.deposit_amount
    }

    pub fn deposit_paid_at(&self) -> Option<DateTime<Utc>> {
        self.deposit_paid_at
    }

    /// Deposit that counts toward settlement: paid and positive.
    pub fn deposit_credit(&self) -> Cents {
        match (self.deposit_amount, self.deposit_paid_at) {
            (Some(amount), Some(_)) if amount.is_positive() => amount,
            _ => Cents::ZERO,
        }
    }

    pub fn progress_percentage(&self) -> f64 {
        self.stage.progress_percentage()
    }

    /// Append to the stage log and move to `target`. Returns the prior stage.
    pub(crate) fn record_stage(&mut self, target: Stage, note: String, at: DateTime<Utc>) -> Stage {
        let previous = self.stage;
        self.stage_notes.push(StageNote { stage: target, note, timestamp: at });
        self.stage = target;
        self.updated_at = at;
        previous
    }

    pub(crate) fn set_fee(&mut self, fee: Cents, deposit: Option<Cents>) {
        self.service_fee = Some(fee);
        self.deposit_amount = deposit;
        self.touch();
    }

    pub(crate) fn mark_deposit_paid(&mut self, at: DateTime<Utc>) {
        self.deposit_paid_at = Some(at);
        self.touch();
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
pub(crate) fn sample_intake() -> JobIntake {
    JobIntake {
        client_id: Some("client-1".to_string()),
        contact: ContactInfo {
            name: "Margaret Hale".to_string(),
            email: "margaret@example.com".into(),
            phone: None,
        },
        address: Address {
            street: "12 Elm St".to_string(),
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            postal_code: "62701".to_string(),
        },
        desired_completion_date: None,
        requested_services: [RequestedService::EstateSale, RequestedService::Hauling].into_iter().collect(),
        intake: IntakeDetails::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_job_starts_at_walkthrough() {
        let job = Job::new(sample_intake());
        assert_eq!(job.stage(), Stage::Walkthrough);
        assert!(job.stage_notes().is_empty());
        assert_eq!(job.deposit_credit(), Cents::ZERO);
    }

    #[test]
    fn test_deposit_credit_requires_payment() {
        let mut job = Job::new(sample_intake());
        job.set_fee(Cents::from_dollars(2_500), Some(Cents::from_dollars(1_000)));
        assert_eq!(job.deposit_credit(), Cents::ZERO);

        job.mark_deposit_paid(Utc::now());
        assert_eq!(job.deposit_credit(), Cents::from_dollars(1_000));
    }

    #[test]
    fn test_contact_email_hidden_in_debug() {
        let job = Job::new(sample_intake());
        let debug = format!("{:?}", job);
        assert!(!debug.contains("margaret@example.com"));
    }
}
