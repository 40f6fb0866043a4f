use std::sync::Arc;
use uuid::Uuid;

use zuva_core::payment::{Payment, PaymentAttemptStatus, PaymentError};
use zuva_core::repository::{BookingRepository, PaymentRepository};
use zuva_core::BoxError;

/// A completion signal from any of the sources that can learn the terminal
/// fate of a payment attempt. `Gateway*` signals come from polling the
/// mobile-money gateway or from its result callback; `Webhook*` from the
/// card provider's webhook.
#[derive(Debug, Clone)]
pub enum PaymentSignal {
    GatewayPaid { poll_url: String },
    GatewayFailed { poll_url: String, status: String },
    WebhookSucceeded { intent_id: String },
    WebhookFailed { intent_id: String },
    ClientConfirmed { booking_id: Uuid, intent_id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// This signal won: the payment row and its booking were settled.
    Settled,
    /// The attempt was already terminal; nothing was written.
    AlreadySettled,
}

/// Single authoritative funnel for payment completion. The poller, the
/// webhook handler, and the client-confirmation endpoint all call `apply`;
/// the conditional repository writes guarantee only the first terminal
/// signal mutates the rows and every later one is a no-op.
pub struct PaymentReconciler {
    bookings: Arc<dyn BookingRepository>,
    payments: Arc<dyn PaymentRepository>,
}

impl PaymentReconciler {
    pub fn new(bookings: Arc<dyn BookingRepository>, payments: Arc<dyn PaymentRepository>) -> Self {
        Self { bookings, payments }
    }

    pub async fn apply(&self, signal: PaymentSignal) -> Result<ReconcileOutcome, PaymentError> {
        match signal {
            PaymentSignal::GatewayPaid { poll_url } => {
                let payment = self.by_poll_url(&poll_url).await?;
                self.settle(payment, PaymentAttemptStatus::Completed).await
            }
            PaymentSignal::GatewayFailed { poll_url, status } => {
                let payment = self.by_poll_url(&poll_url).await?;
                tracing::warn!(reference = %payment.provider_reference, "gateway reported terminal failure: {}", status);
                self.settle(payment, PaymentAttemptStatus::Failed).await
            }
            PaymentSignal::WebhookSucceeded { intent_id } => {
                let payment = self.by_intent_id(&intent_id).await?;
                self.settle(payment, PaymentAttemptStatus::Completed).await
            }
            PaymentSignal::WebhookFailed { intent_id } => {
                let payment = self.by_intent_id(&intent_id).await?;
                self.settle(payment, PaymentAttemptStatus::Failed).await
            }
            PaymentSignal::ClientConfirmed {
                booking_id,
                intent_id,
            } => {
                let payment = self.by_intent_id(&intent_id).await?;
                if payment.booking_id != Some(booking_id) {
                    return Err(PaymentError::Validation(
                        "payment intent does not belong to this booking".to_string(),
                    ));
                }
                self.settle(payment, PaymentAttemptStatus::Completed).await
            }
        }
    }

    async fn by_poll_url(&self, poll_url: &str) -> Result<Payment, PaymentError> {
        self.payments
            .find_by_poll_url(poll_url)
            .await
            .map_err(storage)?
            .ok_or_else(|| PaymentError::Validation("unknown poll handle".to_string()))
    }

    async fn by_intent_id(&self, intent_id: &str) -> Result<Payment, PaymentError> {
        self.payments
            .find_by_intent_id(intent_id)
            .await
            .map_err(storage)?
            .ok_or_else(|| PaymentError::Validation("unknown payment intent".to_string()))
    }

    async fn settle(
        &self,
        payment: Payment,
        status: PaymentAttemptStatus,
    ) -> Result<ReconcileOutcome, PaymentError> {
        let changed = self
            .payments
            .settle_if_open(payment.id, status)
            .await
            .map_err(storage)?;

        if !changed {
            tracing::debug!(payment_id = %payment.id, "duplicate completion signal ignored");
            return Ok(ReconcileOutcome::AlreadySettled);
        }

        if let Some(booking_id) = payment.booking_id {
            match status {
                PaymentAttemptStatus::Completed => {
                    self.bookings
                        .confirm_if_payment_open(booking_id)
                        .await
                        .map_err(storage)?;
                }
                PaymentAttemptStatus::Failed => {
                    self.bookings
                        .fail_payment_if_open(booking_id)
                        .await
                        .map_err(storage)?;
                }
                _ => {}
            }
        }

        tracing::info!(
            payment_id = %payment.id,
            status = status.as_str(),
            "payment attempt settled"
        );
        Ok(ReconcileOutcome::Settled)
    }
}

fn storage(e: BoxError) -> PaymentError {
    PaymentError::Storage(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{InMemoryBookingRepository, InMemoryPaymentRepository};
    use zuva_core::booking::{Booking, BookingPaymentStatus, BookingStatus};
    use zuva_core::payment::PaymentProvider;

    async fn seeded() -> (
        PaymentReconciler,
        Arc<InMemoryBookingRepository>,
        Arc<InMemoryPaymentRepository>,
        Uuid,
        Uuid,
    ) {
        let bookings = Arc::new(InMemoryBookingRepository::new());
        let payments = Arc::new(InMemoryPaymentRepository::new());

        let booking = Booking::new(
            "user-1".to_string(),
            Some(Uuid::new_v4()),
            None,
            15000,
            "guest@example.com".to_string(),
        );
        let booking_id = booking.id;
        bookings.create_booking(&booking).await.unwrap();

        let mut payment = Payment::new(
            Some(booking_id),
            15000,
            PaymentProvider::Stripe,
            "BK-1".to_string(),
        );
        payment.payment_intent_id = Some("pi_123".to_string());
        payment.poll_url = Some("https://gw.test/poll/1".to_string());
        let payment_id = payment.id;
        payments.create_payment(&payment).await.unwrap();

        let reconciler = PaymentReconciler::new(bookings.clone(), payments.clone());
        (reconciler, bookings, payments, booking_id, payment_id)
    }

    #[tokio::test]
    async fn first_terminal_signal_wins_and_cascades_to_booking() {
        let (reconciler, bookings, payments, booking_id, payment_id) = seeded().await;

        let outcome = reconciler
            .apply(PaymentSignal::WebhookSucceeded { intent_id: "pi_123".to_string() })
            .await
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::Settled);

        let payment = payments.get_payment(payment_id).await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentAttemptStatus::Completed);

        let booking = bookings.get_booking(booking_id).await.unwrap().unwrap();
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.payment_status, BookingPaymentStatus::Completed);
    }

    #[tokio::test]
    async fn racing_client_and_poller_signals_settle_exactly_once() {
        let (reconciler, bookings, payments, booking_id, _) = seeded().await;
        let writes_before = bookings.writes() + payments.writes();

        // Client confirmation and the poller observe success in the same
        // interval; order is immaterial, only one may write.
        let first = reconciler
            .apply(PaymentSignal::ClientConfirmed {
                booking_id,
                intent_id: "pi_123".to_string(),
            })
            .await
            .unwrap();
        let second = reconciler
            .apply(PaymentSignal::GatewayPaid {
                poll_url: "https://gw.test/poll/1".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(first, ReconcileOutcome::Settled);
        assert_eq!(second, ReconcileOutcome::AlreadySettled);

        // Exactly one payment write and one booking write landed.
        assert_eq!(bookings.writes() + payments.writes(), writes_before + 2);

        let booking = bookings.get_booking(booking_id).await.unwrap().unwrap();
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.payment_status, BookingPaymentStatus::Completed);
    }

    #[tokio::test]
    async fn failure_signal_marks_payment_and_booking_failed() {
        let (reconciler, bookings, payments, booking_id, payment_id) = seeded().await;

        reconciler
            .apply(PaymentSignal::WebhookFailed { intent_id: "pi_123".to_string() })
            .await
            .unwrap();

        let payment = payments.get_payment(payment_id).await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentAttemptStatus::Failed);

        let booking = bookings.get_booking(booking_id).await.unwrap().unwrap();
        assert_eq!(booking.payment_status, BookingPaymentStatus::Failed);
        // A failed payment does not cancel the booking; the user may retry.
        assert_eq!(booking.status, BookingStatus::Pending);
    }

    #[tokio::test]
    async fn client_confirmation_for_wrong_booking_is_rejected() {
        let (reconciler, _, _, _, _) = seeded().await;

        let err = reconciler
            .apply(PaymentSignal::ClientConfirmed {
                booking_id: Uuid::new_v4(),
                intent_id: "pi_123".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::Validation(_)));
    }

    #[tokio::test]
    async fn unknown_poll_handle_is_rejected() {
        let (reconciler, _, _, _, _) = seeded().await;

        let err = reconciler
            .apply(PaymentSignal::GatewayPaid {
                poll_url: "https://gw.test/poll/unknown".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::Validation(_)));
    }
}
