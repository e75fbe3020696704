use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use uuid::Uuid;

use estate_core::{CoreError, Cents};

use crate::finance::FinanceLedger;
use crate::models::{Job, JobIntake};
use crate::settlement::{Settlement, SettlementCalculator};
use crate::stage::Stage;

/// Owns jobs and drives them through their stages.
///
/// Any stage may be reached from any other; the only requirement is a note
/// explaining the move, which lands in the job's append-only stage log.
pub struct StageMachine {
    jobs: HashMap<Uuid, Job>,
    calculator: SettlementCalculator,
}

impl StageMachine {
    pub fn new() -> Self {
        Self::with_calculator(SettlementCalculator::default())
    }

    pub fn with_calculator(calculator: SettlementCalculator) -> Self {
        Self {
            jobs: HashMap::new(),
            calculator,
        }
    }

    /// Open a job from an intake form
    pub fn create_job(&mut self, intake: JobIntake) -> Result<Job, JobError> {
        if intake.contact.name.trim().is_empty() {
            return Err(JobError::Invalid("contact name must not be empty".to_string()));
        }
        if intake.contact.email.is_blank() {
            return Err(JobError::Invalid("contact email must not be empty".to_string()));
        }

        let job = Job::new(intake);
        self.jobs.insert(job.id, job.clone());
        Ok(job)
    }

    pub fn get_job(&self, job_id: &Uuid) -> Option<&Job> {
        self.jobs.get(job_id)
    }

    pub fn require_job(&self, job_id: &Uuid) -> Result<&Job, JobError> {
        self.jobs.get(job_id).ok_or(JobError::NotFound(*job_id))
    }

    /// All jobs, oldest first
    pub fn list_jobs(&self) -> Vec<&Job> {
        let mut jobs: Vec<&Job> = self.jobs.values().collect();
        jobs.sort_by_key(|j| j.created_at);
        jobs
    }

    pub fn jobs_at_stage(&self, stage: Stage) -> Vec<&Job> {
        self.list_jobs().into_iter().filter(|j| j.stage() == stage).collect()
    }

    /// Move a job to `target`, logging `note`. Returns the stage it left.
    pub fn advance_stage(&mut self, job_id: &Uuid, target: Stage, note: &str) -> Result<Stage, JobError> {
        if note.trim().is_empty() {
            return Err(JobError::EmptyNote);
        }

        let job = self.get_job_mut(job_id)?;
        Ok(job.record_stage(target, note.trim().to_string(), Utc::now()))
    }

    /// Set the service fee and the deposit requested against it
    pub fn set_service_fee(&mut self, job_id: &Uuid, fee: Cents, deposit: Option<Cents>) -> Result<(), JobError> {
        if fee.is_negative() {
            return Err(JobError::Invalid(format!("service fee must not be negative: {}", fee)));
        }
        if let Some(deposit) = deposit {
            if deposit.is_negative() || deposit > fee {
                return Err(JobError::Invalid(format!(
                    "deposit {} must be between 0 and the service fee {}",
                    deposit, fee
                )));
            }
        }

        let job = self.get_job_mut(job_id)?;
        if job.deposit_paid_at().is_some() {
            return Err(JobError::DepositAlreadyPaid(*job_id));
        }
        job.set_fee(fee, deposit);
        Ok(())
    }

    /// Record that the client paid the requested deposit. Returns the amount.
    pub fn record_deposit_paid(&mut self, job_id: &Uuid, paid_at: DateTime<Utc>) -> Result<Cents, JobError> {
        let job = self.get_job_mut(job_id)?;

        if job.service_fee().is_none() {
            return Err(JobError::DepositWithoutFee(*job_id));
        }
        let amount = match job.deposit_amount() {
            Some(amount) if amount.is_positive() => amount,
            _ => return Err(JobError::NoDepositRequested(*job_id)),
        };
        if job.deposit_paid_at().is_some() {
            return Err(JobError::DepositAlreadyPaid(*job_id));
        }

        job.mark_deposit_paid(paid_at);
        Ok(amount)
    }

    pub fn update_scope_notes(&mut self, job_id: &Uuid, notes: Option<String>) -> Result<(), JobError> {
        let job = self.get_job_mut(job_id)?;
        job.scope_notes = notes.filter(|n| !n.trim().is_empty());
        job.touch();
        Ok(())
    }

    pub fn set_hauling_cost(&mut self, job_id: &Uuid, cost: Cents) -> Result<(), JobError> {
        let job = self.get_job_mut(job_id)?;
        FinanceLedger::set_hauling_cost(job, cost)
    }

    /// Record a day of sales. Returns the new gross.
    pub fn record_daily_sale(
        &mut self,
        job_id: &Uuid,
        date: NaiveDate,
        amount: Cents,
        note: Option<String>,
    ) -> Result<Cents, JobError> {
        let job = self.get_job_mut(job_id)?;
        FinanceLedger::record_daily_sale(job, date, amount, note)
    }

    /// Settlement as it stands right now, without storing anything
    pub fn settlement(&self, job_id: &Uuid) -> Result<Settlement, JobError> {
        let job = self.require_job(job_id)?;
        Ok(self.calculator.compute_net_payout(job))
    }

    /// Compute and store the settlement once the job is in payout
    pub fn finalize_settlement(&mut self, job_id: &Uuid) -> Result<Settlement, JobError> {
        let settlement = self.settlement(job_id)?;
        let job = self.get_job_mut(job_id)?;

        if !matches!(job.stage(), Stage::PayoutProcessing | Stage::Closing) {
            return Err(JobError::SettlementNotReady(job.stage()));
        }

        FinanceLedger::apply_settlement(job, &settlement);
        Ok(settlement)
    }

    pub fn calculator(&self) -> &SettlementCalculator {
        &self.calculator
    }

    fn get_job_mut(&mut self, job_id: &Uuid) -> Result<&mut Job, JobError> {
        self.jobs.get_mut(job_id).ok_or(JobError::NotFound(*job_id))
    }
}

impl Default for StageMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Job not found: {0}")]
    NotFound(Uuid),

    #[error("A note is required to change stage")]
    EmptyNote,

    #[error("Invalid job data: {0}")]
    Invalid(String),

    #[error("Job {0} has no service fee; a deposit cannot be paid against it")]
    DepositWithoutFee(Uuid),

    #[error("Job {0} has no deposit requested")]
    NoDepositRequested(Uuid),

    #[error("Deposit for job {0} is already paid")]
    DepositAlreadyPaid(Uuid),

    #[error("Settlement cannot be finalized while the job is at {0}")]
    SettlementNotReady(Stage),
}

impl From<JobError> for CoreError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::NotFound(id) => CoreError::not_found("Job", id),
            JobError::EmptyNote | JobError::Invalid(_) => CoreError::Validation(err.to_string()),
            JobError::DepositWithoutFee(_)
            | JobError::NoDepositRequested(_)
            | JobError::DepositAlreadyPaid(_)
            | JobError::SettlementNotReady(_) => CoreError::Conflict(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample_intake;

    fn machine_with_job() -> (StageMachine, Uuid) {
        let mut machine = StageMachine::new();
        let job = machine.create_job(sample_intake()).unwrap();
        (machine, job.id)
    }

    #[test]
    fn test_advance_stage_appends_note() {
        let (mut machine, job_id) = machine_with_job();

        let previous = machine.advance_stage(&job_id, Stage::Staging, "Walkthrough done").unwrap();
        assert_eq!(previous, Stage::Walkthrough);

        machine.advance_stage(&job_id, Stage::OnlineSale, "Listing live").unwrap();

        let job = machine.get_job(&job_id).unwrap();
        assert_eq!(job.stage(), Stage::OnlineSale);
        assert_eq!(job.stage_notes().len(), 2);
        assert_eq!(job.stage_notes()[0].stage, Stage::Staging);
        assert_eq!(job.stage_notes()[0].note, "Walkthrough done");
        assert_eq!(job.stage_notes()[1].stage, Stage::OnlineSale);
    }

    #[test]
    fn test_empty_note_rejected_without_mutation() {
        let (mut machine, job_id) = machine_with_job();

        let result = machine.advance_stage(&job_id, Stage::Staging, "  ");
        assert!(matches!(result, Err(JobError::EmptyNote)));

        let job = machine.get_job(&job_id).unwrap();
        assert_eq!(job.stage(), Stage::Walkthrough);
        assert!(job.stage_notes().is_empty());
    }

    #[test]
    fn test_non_sequential_jump_allowed() {
        let (mut machine, job_id) = machine_with_job();

        machine.advance_stage(&job_id, Stage::Closing, "Client cancelled").unwrap();
        machine.advance_stage(&job_id, Stage::Staging, "Client changed their mind").unwrap();

        assert_eq!(machine.get_job(&job_id).unwrap().stage(), Stage::Staging);
    }

    #[test]
    fn test_unknown_job() {
        let mut machine = StageMachine::new();
        let result = machine.advance_stage(&Uuid::new_v4(), Stage::Staging, "note");
        assert!(matches!(result, Err(JobError::NotFound(_))));
    }

    #[test]
    fn test_create_job_requires_contact() {
        let mut machine = StageMachine::new();
        let mut intake = sample_intake();
        intake.contact.email = "".into();
        assert!(matches!(machine.create_job(intake), Err(JobError::Invalid(_))));
    }

    #[test]
    fn test_deposit_requires_fee() {
        let (mut machine, job_id) = machine_with_job();

        let result = machine.record_deposit_paid(&job_id, Utc::now());
        assert!(matches!(result, Err(JobError::DepositWithoutFee(_))));

        machine.set_service_fee(&job_id, Cents::from_dollars(2_500), Some(Cents::from_dollars(1_000))).unwrap();
        let paid = machine.record_deposit_paid(&job_id, Utc::now()).unwrap();
        assert_eq!(paid, Cents::from_dollars(1_000));

        let job = machine.get_job(&job_id).unwrap();
        assert!(job.deposit_paid_at().is_some());
        assert!(job.service_fee().is_some());

        // paid once only, and the fee is locked afterwards
        assert!(matches!(machine.record_deposit_paid(&job_id, Utc::now()), Err(JobError::DepositAlreadyPaid(_))));
        assert!(matches!(
            machine.set_service_fee(&job_id, Cents::from_dollars(3_000), None),
            Err(JobError::DepositAlreadyPaid(_))
        ));
    }

    #[test]
    fn test_deposit_cannot_exceed_fee() {
        let (mut machine, job_id) = machine_with_job();
        let result = machine.set_service_fee(&job_id, Cents::from_dollars(1_000), Some(Cents::from_dollars(1_500)));
        assert!(matches!(result, Err(JobError::Invalid(_))));
    }

    #[test]
    fn test_finalize_settlement() {
        let (mut machine, job_id) = machine_with_job();
        let day = NaiveDate::from_ymd_opt(2026, 6, 6).unwrap();

        machine.set_service_fee(&job_id, Cents::from_dollars(2_500), Some(Cents::from_dollars(1_000))).unwrap();
        machine.record_deposit_paid(&job_id, Utc::now()).unwrap();
        machine.record_daily_sale(&job_id, day, Cents::from_dollars(10_000), None).unwrap();
        machine.set_hauling_cost(&job_id, Cents::from_dollars(500)).unwrap();

        assert!(matches!(machine.finalize_settlement(&job_id), Err(JobError::SettlementNotReady(Stage::Walkthrough))));

        machine.advance_stage(&job_id, Stage::PayoutProcessing, "Sales closed").unwrap();
        let settlement = machine.finalize_settlement(&job_id).unwrap();
        assert_eq!(settlement.net, Cents::from_dollars(3_250));

        let job = machine.get_job(&job_id).unwrap();
        assert_eq!(job.finance.fees, Cents::from_dollars(4_750));
        assert_eq!(job.finance.net, Cents::from_dollars(3_250));
    }

    #[test]
    fn test_error_classification() {
        assert!(matches!(CoreError::from(JobError::EmptyNote), CoreError::Validation(_)));
        assert!(matches!(CoreError::from(JobError::NotFound(Uuid::nil())), CoreError::NotFound { .. }));
        assert!(matches!(CoreError::from(JobError::DepositAlreadyPaid(Uuid::nil())), CoreError::Conflict(_)));
    }
}
