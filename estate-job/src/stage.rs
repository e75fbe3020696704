use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The eight phases of a job, in order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Walkthrough,
    Staging,
    OnlineSale,
    EstateSale,
    Donations,
    Hauling,
    PayoutProcessing,
    Closing,
}

/// Vendor work a stage opens up for bidding. Doubles as the bid type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Donation,
    Hauling,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Donation => "donation",
            ServiceType::Hauling => "hauling",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row of the stage lookup table served to every presentation layer.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StageInfo {
    pub stage: Stage,
    pub index: usize,
    pub label: &'static str,
    pub progress: f64,
    pub service_type: Option<ServiceType>,
}

impl Stage {
    pub const ALL: [Stage; 8] = [
        Stage::Walkthrough,
        Stage::Staging,
        Stage::OnlineSale,
        Stage::EstateSale,
        Stage::Donations,
        Stage::Hauling,
        Stage::PayoutProcessing,
        Stage::Closing,
    ];

    pub fn index(self) -> usize {
        match self {
            Stage::Walkthrough => 0,
            Stage::Staging => 1,
            Stage::OnlineSale => 2,
            Stage::EstateSale => 3,
            Stage::Donations => 4,
            Stage::Hauling => 5,
            Stage::PayoutProcessing => 6,
            Stage::Closing => 7,
        }
    }

    pub fn from_index(index: usize) -> Option<Stage> {
        Self::ALL.get(index).copied()
    }

    pub fn next(self) -> Option<Stage> {
        Self::from_index(self.index() + 1)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Walkthrough => "walkthrough",
            Stage::Staging => "staging",
            Stage::OnlineSale => "online_sale",
            Stage::EstateSale => "estate_sale",
            Stage::Donations => "donations",
            Stage::Hauling => "hauling",
            Stage::PayoutProcessing => "payout_processing",
            Stage::Closing => "closing",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::Walkthrough => "Walkthrough",
            Stage::Staging => "Staging",
            Stage::OnlineSale => "Online Sale",
            Stage::EstateSale => "Estate Sale",
            Stage::Donations => "Donations",
            Stage::Hauling => "Hauling",
            Stage::PayoutProcessing => "Payout Processing",
            Stage::Closing => "Closing",
        }
    }

    /// `(index + 1) / 8`, so walkthrough is 0.125 and closing is 1.0.
    pub fn progress_percentage(self) -> f64 {
        (self.index() + 1) as f64 / Self::ALL.len() as f64
    }

    /// Service type vendors bid on while a job sits at this stage.
    pub fn service_type(self) -> Option<ServiceType> {
        match self {
            Stage::Donations => Some(ServiceType::Donation),
            Stage::Hauling => Some(ServiceType::Hauling),
            _ => None,
        }
    }

    pub fn info(self) -> StageInfo {
        StageInfo {
            stage: self,
            index: self.index(),
            label: self.label(),
            progress: self.progress_percentage(),
            service_type: self.service_type(),
        }
    }

    pub fn catalog() -> Vec<StageInfo> {
        Self::ALL.iter().map(|s| s.info()).collect()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| format!("unknown stage: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order() {
        for (i, stage) in Stage::ALL.iter().enumerate() {
            assert_eq!(stage.index(), i);
            assert_eq!(Stage::from_index(i), Some(*stage));
        }
        assert_eq!(Stage::Walkthrough.next(), Some(Stage::Staging));
        assert_eq!(Stage::Closing.next(), None);
    }

    #[test]
    fn test_progress_percentage() {
        assert_eq!(Stage::Walkthrough.progress_percentage(), 0.125);
        assert_eq!(Stage::Donations.progress_percentage(), 0.625);
        assert_eq!(Stage::Closing.progress_percentage(), 1.0);
    }

    #[test]
    fn test_service_type() {
        assert_eq!(Stage::Donations.service_type(), Some(ServiceType::Donation));
        assert_eq!(Stage::Hauling.service_type(), Some(ServiceType::Hauling));
        assert_eq!(Stage::EstateSale.service_type(), None);
    }

    #[test]
    fn test_wire_names() {
        assert_eq!("payout_processing".parse::<Stage>(), Ok(Stage::PayoutProcessing));
        assert!("done".parse::<Stage>().is_err());
        assert_eq!(serde_json::to_string(&Stage::OnlineSale).unwrap(), "\"online_sale\"");
        assert_eq!(Stage::catalog().len(), 8);
    }
}
