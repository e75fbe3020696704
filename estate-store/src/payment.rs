use async_trait::async_trait;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use estate_core::payment::{
    DepositIntent, PaymentAdapter, PaymentResult, PaymentStatus, PayoutConfirmation, PayoutRequest,
};
use estate_core::Cents;

/// Stands in for a real provider: logs the request and reports success.
pub struct MockPaymentAdapter;

#[async_trait]
impl PaymentAdapter for MockPaymentAdapter {
    async fn create_deposit_intent(&self, job_id: Uuid, amount: Cents) -> PaymentResult<DepositIntent> {
        if !amount.is_positive() {
            return Err(format!("deposit amount must be positive, got {}", amount).into());
        }

        let id = format!("mock_dep_{}", job_id.simple());
        info!(%job_id, %amount, intent = %id, "Mock deposit checkout created");
        Ok(DepositIntent {
            checkout_url: Some(format!("https://pay.example/checkout/{}", id)),
            id,
            job_id,
            amount,
            status: PaymentStatus::RequiresPaymentMethod,
            created_at: Utc::now(),
        })
    }

    async fn initiate_payout(&self, request: &PayoutRequest) -> PaymentResult<PayoutConfirmation> {
        let reference = format!("mock_po_{}", request.bid_id.simple());
        info!(
            bid_id = %request.bid_id,
            vendor_id = %request.vendor_id,
            amount = %request.amount,
            method = %request.method,
            %reference,
            "Mock payout sent"
        );
        Ok(PayoutConfirmation {
            reference,
            bid_id: request.bid_id,
            status: PaymentStatus::Succeeded,
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_deposit_intent() {
        let job_id = Uuid::new_v4();
        let intent = MockPaymentAdapter.create_deposit_intent(job_id, Cents::from_dollars(500)).await.unwrap();
        assert_eq!(intent.job_id, job_id);
        assert_eq!(intent.status, PaymentStatus::RequiresPaymentMethod);
        assert!(intent.checkout_url.unwrap().ends_with(&intent.id));

        assert!(MockPaymentAdapter.create_deposit_intent(job_id, Cents::ZERO).await.is_err());
    }

    #[tokio::test]
    async fn test_mock_payout() {
        let request = PayoutRequest {
            bid_id: Uuid::new_v4(),
            vendor_id: "v-1".into(),
            amount: Cents::from_dollars(300),
            method: "cash".into(),
        };
        let confirmation = MockPaymentAdapter.initiate_payout(&request).await.unwrap();
        assert_eq!(confirmation.status, PaymentStatus::Succeeded);
        assert_eq!(confirmation.bid_id, request.bid_id);
        assert!(confirmation.reference.starts_with("mock_po_"));
    }
}
