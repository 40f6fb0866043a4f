use std::sync::Arc;

use zuva_core::payment::{
    charged_amount, InitiateOutcome, Payment, PaymentError, PaymentProvider, PaymentRequest,
    PaymentResponse, ProviderAdapter,
};
use zuva_core::repository::PaymentRepository;

use crate::stripe::to_minor_units;

/// Single choke point for payment initiation: validates the request,
/// dispatches to the right adapter, persists the attempt, and normalizes
/// the result. One call is exactly one attempt, with no retry or backoff
/// at this layer.
pub struct PaymentOrchestrator {
    stripe: Arc<dyn ProviderAdapter>,
    paynow: Arc<dyn ProviderAdapter>,
    payments: Arc<dyn PaymentRepository>,
}

impl PaymentOrchestrator {
    pub fn new(
        stripe: Arc<dyn ProviderAdapter>,
        paynow: Arc<dyn ProviderAdapter>,
        payments: Arc<dyn PaymentRepository>,
    ) -> Self {
        Self {
            stripe,
            paynow,
            payments,
        }
    }

    fn adapter_for(&self, provider: PaymentProvider) -> &Arc<dyn ProviderAdapter> {
        match provider {
            PaymentProvider::Stripe => &self.stripe,
            PaymentProvider::Paynow => &self.paynow,
        }
    }

    /// All checks run before any network call.
    fn validate(provider: PaymentProvider, request: &PaymentRequest) -> Result<(), PaymentError> {
        if !(request.amount > 0.0) || !request.amount.is_finite() {
            return Err(PaymentError::Validation(
                "amount must be greater than zero".to_string(),
            ));
        }
        if request.reference.trim().is_empty() {
            return Err(PaymentError::Validation(
                "reference is required".to_string(),
            ));
        }
        if request.email.trim().is_empty() {
            return Err(PaymentError::Validation("email is required".to_string()));
        }
        match provider {
            PaymentProvider::Paynow => {
                if request.phone.as_deref().map_or(true, |p| p.trim().is_empty()) {
                    return Err(PaymentError::Validation(
                        "phone is required for mobile money payments".to_string(),
                    ));
                }
            }
            PaymentProvider::Stripe => {
                if request.customer_id.is_none() {
                    return Err(PaymentError::Authentication(
                        "card payments require an authenticated session".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    pub async fn process_payment(
        &self,
        provider: PaymentProvider,
        request: PaymentRequest,
    ) -> Result<PaymentResponse, PaymentError> {
        Self::validate(provider, &request)?;

        let outcome = self.adapter_for(provider).initiate(&request).await?;

        match outcome {
            InitiateOutcome::Declined { error } => {
                // Provider-reported failure: nothing is persisted.
                tracing::warn!(
                    %provider,
                    reference = %request.reference,
                    "payment declined: {}",
                    error
                );
                Err(PaymentError::Provider(error))
            }
            InitiateOutcome::MobileMoney {
                redirect_url,
                poll_url,
            } => {
                let mut payment = Payment::new(
                    request.booking_id,
                    to_minor_units(charged_amount(&request)),
                    provider,
                    request.reference.clone(),
                );
                payment.poll_url = Some(poll_url.clone());
                self.payments
                    .create_payment(&payment)
                    .await
                    .map_err(|e| PaymentError::Storage(e.to_string()))?;

                tracing::info!(%provider, payment_id = %payment.id, "payment attempt recorded");
                Ok(PaymentResponse::MobileMoney {
                    redirect_url,
                    poll_url,
                    reference: request.reference,
                })
            }
            InitiateOutcome::Card {
                payment_intent_id,
                client_secret,
            } => {
                let mut payment = Payment::new(
                    request.booking_id,
                    to_minor_units(request.amount),
                    provider,
                    request.reference.clone(),
                );
                payment.payment_intent_id = Some(payment_intent_id.clone());
                payment.client_secret = Some(client_secret.clone());
                self.payments
                    .create_payment(&payment)
                    .await
                    .map_err(|e| PaymentError::Storage(e.to_string()))?;

                tracing::info!(%provider, payment_id = %payment.id, "payment attempt recorded");
                Ok(PaymentResponse::Card {
                    payment_intent_id,
                    client_secret,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{InMemoryPaymentRepository, MockProviderAdapter};
    use uuid::Uuid;

    fn success_paynow() -> InitiateOutcome {
        InitiateOutcome::MobileMoney {
            redirect_url: "https://gw.test/pay/1".to_string(),
            poll_url: "https://gw.test/poll/1".to_string(),
        }
    }

    fn success_stripe() -> InitiateOutcome {
        InitiateOutcome::Card {
            payment_intent_id: "pi_123".to_string(),
            client_secret: "pi_123_secret".to_string(),
        }
    }

    fn harness(
        stripe_outcome: InitiateOutcome,
        paynow_outcome: InitiateOutcome,
    ) -> (
        PaymentOrchestrator,
        Arc<MockProviderAdapter>,
        Arc<MockProviderAdapter>,
        Arc<InMemoryPaymentRepository>,
    ) {
        let stripe = Arc::new(MockProviderAdapter::returning(stripe_outcome));
        let paynow = Arc::new(MockProviderAdapter::returning(paynow_outcome));
        let payments = Arc::new(InMemoryPaymentRepository::new());
        let orchestrator =
            PaymentOrchestrator::new(stripe.clone(), paynow.clone(), payments.clone());
        (orchestrator, stripe, paynow, payments)
    }

    fn valid_request() -> PaymentRequest {
        PaymentRequest {
            amount: 150.0,
            reference: "BK-2026-0001".to_string(),
            email: "guest@example.com".to_string(),
            phone: Some("0771234567".to_string()),
            booking_id: Some(Uuid::new_v4()),
            customer_id: Some("user-1".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn missing_fields_fail_before_any_adapter_call() {
        let (orchestrator, stripe, paynow, payments) =
            harness(success_stripe(), success_paynow());

        for broken in [
            PaymentRequest { amount: 0.0, ..valid_request() },
            PaymentRequest { reference: "  ".to_string(), ..valid_request() },
            PaymentRequest { email: String::new(), ..valid_request() },
        ] {
            for provider in [PaymentProvider::Stripe, PaymentProvider::Paynow] {
                let err = orchestrator
                    .process_payment(provider, broken.clone())
                    .await
                    .unwrap_err();
                assert!(matches!(err, PaymentError::Validation(_)), "{:?}", err);
            }
        }

        assert_eq!(stripe.initiate_calls(), 0);
        assert_eq!(paynow.initiate_calls(), 0);
        assert!(payments.is_empty());
    }

    #[tokio::test]
    async fn mobile_money_requires_phone() {
        let (orchestrator, _, paynow, _) = harness(success_stripe(), success_paynow());

        let request = PaymentRequest { phone: None, ..valid_request() };
        let err = orchestrator
            .process_payment(PaymentProvider::Paynow, request)
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::Validation(_)));
        assert_eq!(paynow.initiate_calls(), 0);
    }

    #[tokio::test]
    async fn card_requires_session() {
        let (orchestrator, stripe, _, _) = harness(success_stripe(), success_paynow());

        let request = PaymentRequest { customer_id: None, ..valid_request() };
        let err = orchestrator
            .process_payment(PaymentProvider::Stripe, request)
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::Authentication(_)));
        assert_eq!(stripe.initiate_calls(), 0);
    }

    #[tokio::test]
    async fn mobile_money_success_persists_attempt_with_poll_url() {
        let (orchestrator, _, paynow, payments) = harness(success_stripe(), success_paynow());

        let response = orchestrator
            .process_payment(PaymentProvider::Paynow, valid_request())
            .await
            .unwrap();

        match response {
            PaymentResponse::MobileMoney { poll_url, reference, .. } => {
                assert_eq!(poll_url, "https://gw.test/poll/1");
                assert_eq!(reference, "BK-2026-0001");
            }
            other => panic!("unexpected response: {:?}", other),
        }
        assert_eq!(paynow.initiate_calls(), 1);
        assert_eq!(payments.len(), 1);
    }

    #[tokio::test]
    async fn card_success_returns_client_secret() {
        let (orchestrator, stripe, _, payments) = harness(success_stripe(), success_paynow());

        let response = orchestrator
            .process_payment(PaymentProvider::Stripe, valid_request())
            .await
            .unwrap();

        match response {
            PaymentResponse::Card { client_secret, payment_intent_id } => {
                assert_eq!(client_secret, "pi_123_secret");
                assert_eq!(payment_intent_id, "pi_123");
            }
            other => panic!("unexpected response: {:?}", other),
        }
        assert_eq!(stripe.initiate_calls(), 1);
        assert_eq!(payments.len(), 1);
    }

    #[tokio::test]
    async fn declined_initiation_surfaces_error_and_writes_nothing() {
        let declined = InitiateOutcome::Declined {
            error: "Insufficient balance".to_string(),
        };
        let (orchestrator, _, _, payments) = harness(success_stripe(), declined);

        let err = orchestrator
            .process_payment(PaymentProvider::Paynow, valid_request())
            .await
            .unwrap_err();

        match err {
            PaymentError::Provider(message) => assert_eq!(message, "Insufficient balance"),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(payments.is_empty());
    }

    #[tokio::test]
    async fn line_items_drive_the_recorded_amount() {
        let (orchestrator, _, _, payments) = harness(success_stripe(), success_paynow());

        let mut request = valid_request();
        request.items = Some(vec![
            zuva_core::payment::LineItem { name: "Lodge".to_string(), amount: 120.0 },
            zuva_core::payment::LineItem { name: "Transfer".to_string(), amount: 19.999 },
        ]);

        orchestrator
            .process_payment(PaymentProvider::Paynow, request)
            .await
            .unwrap();

        let stored = payments
            .find_by_poll_url("https://gw.test/poll/1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.amount_minor, 14000); // 139.999 rounded half up
    }
}
