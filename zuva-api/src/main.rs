use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zuva_api::{app, state::{AppState, AuthConfig}};
use zuva_core::repository::{BookingRepository, PaymentRepository};
use zuva_payments::paynow::PaynowConfig;
use zuva_payments::stripe::StripeConfig;
use zuva_payments::{PaymentOrchestrator, PaymentReconciler, PaynowAdapter, StatusPoller, StripeAdapter};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "zuva_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = zuva_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Zuva API on port {}", config.server.port);

    // Database
    let db = zuva_store::DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    let bookings: Arc<dyn BookingRepository> =
        Arc::new(zuva_store::StoreBookingRepository::new(db.pool.clone()));
    let payments: Arc<dyn PaymentRepository> =
        Arc::new(zuva_store::StorePaymentRepository::new(db.pool.clone()));

    // Provider adapters, constructed with their credentials
    let stripe = Arc::new(
        StripeAdapter::new(StripeConfig {
            secret_key: config.stripe.secret_key.clone(),
            api_base: config.stripe.api_base.clone(),
            timeout_ms: config.stripe.timeout_ms,
        })
        .expect("Failed to build Stripe adapter"),
    );
    let paynow = Arc::new(
        PaynowAdapter::new(PaynowConfig {
            integration_id: config.paynow.integration_id.clone(),
            integration_key: config.paynow.integration_key.clone(),
            initiate_url: config.paynow.initiate_url.clone(),
            result_url: config.paynow.result_url.clone(),
            timeout_ms: config.paynow.timeout_ms,
        })
        .expect("Failed to build Paynow adapter"),
    );

    let orchestrator = Arc::new(PaymentOrchestrator::new(
        stripe,
        paynow.clone(),
        payments.clone(),
    ));
    let reconciler = Arc::new(PaymentReconciler::new(bookings.clone(), payments.clone()));
    let poller = Arc::new(StatusPoller::new(paynow, payments.clone(), reconciler.clone()));

    let app_state = AppState {
        orchestrator,
        poller,
        reconciler,
        bookings,
        payments,
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
        },
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app).await.expect("Server error");
}
