//! HTTP route handlers for the restaurant API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                  - Liveness banner
//! GET  /health            - Health check
//! GET  /health/ready      - Readiness check (store ping)
//!
//! # Catalog
//! GET  /foods/{id}        - Food detail
//!
//! # Purchases
//! POST /purchase          - Place a purchase
//! GET  /myPurchase        - Caller's purchases (requires session)
//! POST /myPurchase/{id}   - Cancel a purchase
//!
//! # Session
//! POST /jwt               - Issue session token cookie
//! POST /logout            - Clear session token cookie
//! ```

pub mod foods;
pub mod health;
pub mod purchases;
pub mod session;

use axum::{
    Router,
    http::{Method, header},
    routing::{get, post},
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultOnResponse, OnResponse, TraceLayer},
};
use tracing::Span;

use crate::middleware::request_id_middleware;
use crate::state::AppState;

/// Create the purchase routes router.
pub fn purchase_routes() -> Router<AppState> {
    Router::new()
        .route("/purchase", post(purchases::create))
        .route("/myPurchase", get(purchases::mine))
        .route("/myPurchase/{id}", post(purchases::delete))
}

/// Create the session routes router.
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/jwt", post(session::issue))
        .route("/logout", post(session::logout))
}

/// Create all routes for the restaurant API.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route("/foods/{id}", get(foods::show))
        .merge(purchase_routes())
        .merge(session_routes())
}

/// CORS for the configured frontend origins, with credentials.
fn cors_layer(state: &AppState) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(state.config().allowed_origins.clone()))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
}

/// Build the application: routes, middleware, and state.
///
/// Sentry layers are added by the binary, outermost.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state);

    routes()
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}
