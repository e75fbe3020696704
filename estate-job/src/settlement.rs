use serde::{Deserialize, Serialize};

use estate_core::Cents;

use crate::models::Job;

/// One progressive commission band. `ceiling: None` is the open top band.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommissionTier {
    pub ceiling: Option<Cents>,
    pub rate_bp: i64,
}

/// Progressive commission bands, lowest first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommissionSchedule {
    tiers: Vec<CommissionTier>,
}

impl CommissionSchedule {
    /// 50% up to $7,500, 40% up to $20,000, 30% above.
    pub fn standard() -> Self {
        Self {
            tiers: vec![
                CommissionTier { ceiling: Some(Cents::from_dollars(7_500)), rate_bp: 5_000 },
                CommissionTier { ceiling: Some(Cents::from_dollars(20_000)), rate_bp: 4_000 },
                CommissionTier { ceiling: None, rate_bp: 3_000 },
            ],
        }
    }

    pub fn tiers(&self) -> &[CommissionTier] {
        &self.tiers
    }

    /// Commission owed on `gross`. Each band's rate applies only to the part of
    /// gross that falls inside it. Non-positive gross owes nothing.
    pub fn commission(&self, gross: Cents) -> Cents {
        let mut remaining = gross;
        let mut floor = Cents::ZERO;
        let mut total = Cents::ZERO;

        for tier in &self.tiers {
            if !remaining.is_positive() {
                break;
            }
            let band = match tier.ceiling {
                Some(ceiling) => (ceiling - floor).min(remaining),
                None => remaining,
            };
            total += band.apply_rate(tier.rate_bp);
            remaining -= band;
            if let Some(ceiling) = tier.ceiling {
                floor = ceiling;
            }
        }

        total
    }
}

impl Default for CommissionSchedule {
    fn default() -> Self {
        Self::standard()
    }
}

/// Breakdown of what the client is owed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settlement {
    pub gross: Cents,
    pub service_fee: Cents,
    pub commission: Cents,
    pub hauling_cost: Cents,
    pub deposit_credit: Cents,
    pub net: Cents,
}

/// Computes commission and net payout for a job
#[derive(Debug, Clone, Default)]
pub struct SettlementCalculator {
    schedule: CommissionSchedule,
}

impl SettlementCalculator {
    pub fn new(schedule: CommissionSchedule) -> Self {
        Self { schedule }
    }

    pub fn schedule(&self) -> &CommissionSchedule {
        &self.schedule
    }

    pub fn compute_commission(&self, gross: Cents) -> Cents {
        self.schedule.commission(gross)
    }

    /// net = gross − fee − commission − hauling + deposit credit
    ///
    /// The deposit was prepaid against the fee, so a paid deposit comes back.
    /// Net saturates at the `i64` bounds instead of wrapping.
    pub fn compute_net_payout(&self, job: &Job) -> Settlement {
        let gross = job.finance.gross;
        let service_fee = job.service_fee().unwrap_or_default();
        let commission = self.compute_commission(gross);
        let hauling_cost = job.finance.hauling_cost;
        let deposit_credit = job.deposit_credit();

        Settlement {
            gross,
            service_fee,
            commission,
            hauling_cost,
            deposit_credit,
            net: gross
                .saturating_sub(service_fee)
                .saturating_sub(commission)
                .saturating_sub(hauling_cost)
                .saturating_add(deposit_credit),
        }
    }
}

/// Commission under the standard schedule.
pub fn compute_commission(gross: Cents) -> Cents {
    CommissionSchedule::standard().commission(gross)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample_intake;
    use chrono::Utc;

    fn dollars(d: i64) -> Cents {
        Cents::from_dollars(d)
    }

    fn job_with(gross: Cents, fee: Cents, hauling: Cents, deposit: Option<Cents>) -> Job {
        let mut job = Job::new(sample_intake());
        job.finance.gross = gross;
        job.finance.hauling_cost = hauling;
        job.set_fee(fee, deposit);
        if deposit.is_some() {
            job.mark_deposit_paid(Utc::now());
        }
        job
    }

    #[test]
    fn test_commission_tier_boundaries() {
        assert_eq!(compute_commission(dollars(7_500)), Cents(375_000));
        assert_eq!(compute_commission(dollars(20_000)), Cents(875_000));
        assert_eq!(compute_commission(dollars(50_000)), Cents(1_775_000));
        assert_eq!(compute_commission(dollars(10_000)), Cents(475_000));
    }

    #[test]
    fn test_commission_first_tier_is_half() {
        for cents in [0, 2, 1_000, 99_998, 374_900, 750_000] {
            assert_eq!(compute_commission(Cents(cents)), Cents(cents / 2));
        }
        // odd cents round half away from zero
        assert_eq!(compute_commission(Cents(1)), Cents(1));
        assert_eq!(compute_commission(Cents(12_345)), Cents(6_173));
    }

    #[test]
    fn test_commission_just_over_boundary() {
        // $7,500.01 → 3750 + 0.01 × 0.40 = 3750.004 → 3750.00
        assert_eq!(compute_commission(Cents(750_001)), Cents(375_000));
        // $20,000.05 → 8750 + 0.05 × 0.30 = 8750.015 → 8750.02
        assert_eq!(compute_commission(Cents(2_000_005)), Cents(875_002));
    }

    #[test]
    fn test_commission_non_positive_gross() {
        assert_eq!(compute_commission(Cents::ZERO), Cents::ZERO);
        assert_eq!(compute_commission(Cents(-5_000)), Cents::ZERO);
    }

    #[test]
    fn test_net_payout_scenario() {
        let calculator = SettlementCalculator::default();
        let job = job_with(dollars(10_000), dollars(2_500), dollars(500), Some(dollars(1_000)));

        let settlement = calculator.compute_net_payout(&job);
        assert_eq!(settlement.commission, dollars(4_750));
        assert_eq!(settlement.deposit_credit, dollars(1_000));
        assert_eq!(settlement.net, dollars(3_250));
        assert_eq!(settlement.net.to_string(), "3250.00");
    }

    #[test]
    fn test_deposit_credit_shifts_net_by_deposit() {
        let calculator = SettlementCalculator::default();
        for deposit in [dollars(1), dollars(750), Cents(123_456)] {
            let with = calculator.compute_net_payout(&job_with(dollars(42_000), dollars(3_000), dollars(800), Some(deposit)));
            let without = calculator.compute_net_payout(&job_with(dollars(42_000), dollars(3_000), dollars(800), None));
            assert_eq!(with.net - without.net, deposit);
        }
    }

    #[test]
    fn test_unpaid_deposit_not_credited() {
        let calculator = SettlementCalculator::default();
        let mut job = Job::new(sample_intake());
        job.finance.gross = dollars(5_000);
        job.set_fee(dollars(1_000), Some(dollars(500)));

        let settlement = calculator.compute_net_payout(&job);
        assert_eq!(settlement.deposit_credit, Cents::ZERO);
        assert_eq!(settlement.net, dollars(5_000 - 1_000 - 2_500));
    }

    #[test]
    fn test_net_can_go_negative() {
        let calculator = SettlementCalculator::default();
        let job = job_with(Cents::ZERO, dollars(2_500), dollars(500), None);
        assert_eq!(calculator.compute_net_payout(&job).net, dollars(-3_000));
    }

    #[test]
    fn test_net_saturates_at_bounds() {
        let calculator = SettlementCalculator::default();
        let job = job_with(Cents::ZERO, Cents(i64::MAX), Cents(i64::MAX), None);
        assert_eq!(calculator.compute_net_payout(&job).net, Cents(i64::MIN));

        let job = job_with(Cents(i64::MAX), Cents::ZERO, Cents::ZERO, None);
        let settlement = calculator.compute_net_payout(&job);
        assert!(settlement.net.is_positive());
        assert_eq!(settlement.net, Cents(i64::MAX) - settlement.commission);
    }
}
