//! Liveness and readiness endpoints.

use axum::{extract::State, http::StatusCode};

use crate::state::AppState;

/// GET / - Plain liveness banner.
pub async fn root() -> &'static str {
    "Server is Running"
}

/// GET /health - Basic health check.
pub async fn health() -> &'static str {
    "ok"
}

/// GET /health/ready - Readiness check.
///
/// Returns 503 Service Unavailable if the document store is not reachable.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
