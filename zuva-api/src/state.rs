use std::sync::Arc;

use zuva_core::repository::{BookingRepository, PaymentRepository};
use zuva_payments::{PaymentOrchestrator, PaymentReconciler, StatusPoller};

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<PaymentOrchestrator>,
    pub poller: Arc<StatusPoller>,
    pub reconciler: Arc<PaymentReconciler>,
    pub bookings: Arc<dyn BookingRepository>,
    pub payments: Arc<dyn PaymentRepository>,
    pub auth: AuthConfig,
}
