use axum::{http::Method, routing::post, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod bookings;
pub mod error;
pub mod middleware;
pub mod payments;
pub mod state;
pub mod webhooks;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    // CORS Middleware
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    // Routes behind bearer authentication
    let protected = Router::new()
        .merge(bookings::routes())
        .route("/v1/payments/card-intent", post(payments::create_card_intent))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::customer_auth_middleware,
        ));

    let public = Router::new()
        .route(
            "/v1/payments/mobile-money",
            post(payments::create_mobile_money_payment),
        )
        .route("/v1/payments/status", post(payments::check_payment_status))
        .route(
            "/v1/webhooks/payments/stripe",
            post(webhooks::handle_stripe_webhook),
        )
        .route(
            "/v1/webhooks/payments/paynow",
            post(webhooks::handle_paynow_result),
        );

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
