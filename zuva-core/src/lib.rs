pub mod booking;
pub mod payment;
pub mod repository;

pub use payment::{PaymentError, PaymentProvider, PaymentRequest, PaymentResponse};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
