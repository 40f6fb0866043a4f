pub mod mock;
pub mod orchestrator;
pub mod paynow;
pub mod poller;
pub mod reconcile;
pub mod stripe;

pub use orchestrator::PaymentOrchestrator;
pub use paynow::PaynowAdapter;
pub use poller::StatusPoller;
pub use reconcile::{PaymentReconciler, PaymentSignal, ReconcileOutcome};
pub use stripe::StripeAdapter;
