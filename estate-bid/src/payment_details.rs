use serde::{Deserialize, Serialize};

use estate_shared::Masked;

use crate::engine::BidError;

/// How a vendor wants to be paid
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PaymentDetails {
    Cash,
    Cashapp {
        handle: String,
    },
    Bank {
        account_holder_name: String,
        bank_name: String,
        account_number: Masked<String>,
        routing_number: Masked<String>,
    },
}

impl PaymentDetails {
    pub fn method(&self) -> &'static str {
        match self {
            PaymentDetails::Cash => "cash",
            PaymentDetails::Cashapp { .. } => "cashapp",
            PaymentDetails::Bank { .. } => "bank",
        }
    }

    pub fn validate(&self) -> Result<(), BidError> {
        match self {
            PaymentDetails::Cash => Ok(()),
            PaymentDetails::Cashapp { handle } => require("handle", handle),
            PaymentDetails::Bank { account_holder_name, bank_name, account_number, routing_number } => {
                require("account_holder_name", account_holder_name)?;
                require("bank_name", bank_name)?;
                require("account_number", account_number.expose())?;
                require("routing_number", routing_number.expose())
            }
        }
    }
}

/// Payment fields as a form submits them: a method name plus whatever
/// fields were filled in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentInput {
    pub method: String,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub account_holder_name: Option<String>,
    #[serde(default)]
    pub bank_name: Option<String>,
    #[serde(default)]
    pub account_number: Option<Masked<String>>,
    #[serde(default)]
    pub routing_number: Option<Masked<String>>,
}

impl PaymentInput {
    /// Build validated details for the chosen method. Fields that belong to
    /// other methods are dropped.
    pub fn into_details(self) -> Result<PaymentDetails, BidError> {
        let details = match self.method.trim().to_ascii_lowercase().as_str() {
            "cash" => PaymentDetails::Cash,
            "cashapp" => PaymentDetails::Cashapp {
                handle: self.handle.ok_or(BidError::MissingPaymentField("handle"))?,
            },
            "bank" => PaymentDetails::Bank {
                account_holder_name: self
                    .account_holder_name
                    .ok_or(BidError::MissingPaymentField("account_holder_name"))?,
                bank_name: self.bank_name.ok_or(BidError::MissingPaymentField("bank_name"))?,
                account_number: self.account_number.ok_or(BidError::MissingPaymentField("account_number"))?,
                routing_number: self.routing_number.ok_or(BidError::MissingPaymentField("routing_number"))?,
            },
            other => return Err(BidError::UnknownPaymentMethod(other.to_string())),
        };
        details.validate()?;
        Ok(details)
    }
}

fn require(field: &'static str, value: &str) -> Result<(), BidError> {
    if value.trim().is_empty() {
        return Err(BidError::MissingPaymentField(field));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bank_input() -> PaymentInput {
        PaymentInput {
            method: "bank".to_string(),
            account_holder_name: Some("Haul Co LLC".to_string()),
            bank_name: Some("First Savings".to_string()),
            account_number: Some("000123456789".into()),
            routing_number: Some("021000021".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_cash_needs_nothing() {
        let details = PaymentInput { method: "cash".into(), ..Default::default() }.into_details().unwrap();
        assert_eq!(details, PaymentDetails::Cash);
    }

    #[test]
    fn test_cashapp_requires_handle() {
        let missing = PaymentInput { method: "cashapp".into(), ..Default::default() }.into_details();
        assert!(matches!(missing, Err(BidError::MissingPaymentField("handle"))));

        let blank = PaymentInput { method: "cashapp".into(), handle: Some(" ".into()), ..Default::default() }.into_details();
        assert!(matches!(blank, Err(BidError::MissingPaymentField("handle"))));

        let ok = PaymentInput { method: "cashapp".into(), handle: Some("$haulco".into()), ..Default::default() }.into_details();
        assert_eq!(ok.unwrap().method(), "cashapp");
    }

    #[test]
    fn test_bank_requires_every_field() {
        assert!(bank_input().into_details().is_ok());

        let mut missing_routing = bank_input();
        missing_routing.routing_number = None;
        assert!(matches!(missing_routing.into_details(), Err(BidError::MissingPaymentField("routing_number"))));

        let mut blank_bank = bank_input();
        blank_bank.bank_name = Some(String::new());
        assert!(matches!(blank_bank.into_details(), Err(BidError::MissingPaymentField("bank_name"))));
    }

    #[test]
    fn test_unknown_method() {
        let result = PaymentInput { method: "crypto".into(), ..Default::default() }.into_details();
        assert!(matches!(result, Err(BidError::UnknownPaymentMethod(_))));
    }

    #[test]
    fn test_account_number_hidden_in_debug() {
        let details = bank_input().into_details().unwrap();
        assert!(!format!("{:?}", details).contains("000123456789"));
    }
}
