use chrono::{NaiveDate, Utc};

use estate_core::Cents;

use crate::machine::JobError;
use crate::models::{DailySale, Job};
use crate::settlement::Settlement;

/// Records sale takings and costs against a job's finance sheet
pub struct FinanceLedger;

impl FinanceLedger {
    /// Append one day's takings and recompute gross. Returns the new gross.
    pub fn record_daily_sale(
        job: &mut Job,
        date: NaiveDate,
        amount: Cents,
        note: Option<String>,
    ) -> Result<Cents, JobError> {
        if amount.is_negative() {
            return Err(JobError::Invalid(format!("sale amount must not be negative: {}", amount)));
        }

        // Checked before the push so an overflow leaves the sheet untouched
        let gross = job
            .finance
            .gross
            .checked_add(amount)
            .ok_or_else(|| JobError::Invalid(format!("sale amount {} overflows gross sales", amount)))?;

        job.finance.daily.push(DailySale {
            date,
            amount,
            note: note.filter(|n| !n.trim().is_empty()),
            recorded_at: Utc::now(),
        });
        job.finance.gross = gross;
        job.touch();

        Ok(job.finance.gross)
    }

    pub fn set_hauling_cost(job: &mut Job, cost: Cents) -> Result<(), JobError> {
        if cost.is_negative() {
            return Err(JobError::Invalid(format!("hauling cost must not be negative: {}", cost)));
        }
        job.finance.hauling_cost = cost;
        job.touch();
        Ok(())
    }

    /// Store a finalized settlement on the job's finance sheet
    pub fn apply_settlement(job: &mut Job, settlement: &Settlement) {
        job.finance.fees = settlement.commission;
        job.finance.net = settlement.net;
        job.touch();
    }

    /// Sales grouped per date, oldest first
    pub fn totals_by_date(job: &Job) -> Vec<(NaiveDate, Cents)> {
        let mut totals: std::collections::BTreeMap<NaiveDate, Cents> = std::collections::BTreeMap::new();
        for sale in &job.finance.daily {
            *totals.entry(sale.date).or_default() += sale.amount;
        }
        totals.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample_intake;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, d).unwrap()
    }

    #[test]
    fn test_gross_tracks_daily_sales() {
        let mut job = Job::new(sample_intake());

        FinanceLedger::record_daily_sale(&mut job, day(1), Cents::from_dollars(4_000), None).unwrap();
        let gross = FinanceLedger::record_daily_sale(&mut job, day(2), Cents::from_dollars(6_000), Some("Sunday".into())).unwrap();

        assert_eq!(gross, Cents::from_dollars(10_000));
        assert_eq!(job.finance.daily.len(), 2);
        assert_eq!(job.finance.daily[1].note.as_deref(), Some("Sunday"));
    }

    #[test]
    fn test_negative_amounts_rejected() {
        let mut job = Job::new(sample_intake());
        assert!(FinanceLedger::record_daily_sale(&mut job, day(1), Cents(-1), None).is_err());
        assert!(FinanceLedger::set_hauling_cost(&mut job, Cents(-1)).is_err());
        assert!(job.finance.daily.is_empty());
    }

    #[test]
    fn test_overflowing_sale_leaves_sheet_unchanged() {
        let mut job = Job::new(sample_intake());
        FinanceLedger::record_daily_sale(&mut job, day(1), Cents(i64::MAX), None).unwrap();

        let err = FinanceLedger::record_daily_sale(&mut job, day(2), Cents(1), None).unwrap_err();
        assert!(matches!(err, JobError::Invalid(_)));
        assert_eq!(job.finance.daily.len(), 1);
        assert_eq!(job.finance.gross, Cents(i64::MAX));
        assert_eq!(job.finance.gross, job.finance.daily.iter().map(|d| d.amount).sum());
    }

    #[test]
    fn test_totals_by_date() {
        let mut job = Job::new(sample_intake());
        FinanceLedger::record_daily_sale(&mut job, day(2), Cents(500), None).unwrap();
        FinanceLedger::record_daily_sale(&mut job, day(1), Cents(100), None).unwrap();
        FinanceLedger::record_daily_sale(&mut job, day(2), Cents(250), None).unwrap();

        assert_eq!(FinanceLedger::totals_by_date(&job), vec![(day(1), Cents(100)), (day(2), Cents(750))]);
    }
}
