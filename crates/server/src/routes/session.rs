//! Session token routes.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::header::SET_COOKIE,
    response::{AppendHeaders, IntoResponse},
};
use serde_json::json;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::session::{cleared_session_cookie, session_cookie, set_cookie_value};
use crate::models::SessionIdentity;
use crate::state::AppState;

/// Issue a session token for the presented identity.
///
/// POST /jwt
///
/// # Errors
///
/// 400 if the body is malformed or names no identity at all.
#[instrument(skip_all)]
pub async fn issue(
    State(state): State<AppState>,
    body: std::result::Result<Json<SessionIdentity>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(identity) = body?;
    if identity.is_empty() {
        return Err(AppError::BadRequest(
            "username, photoURL, or email is required".to_string(),
        ));
    }

    let token = state.tokens().issue(identity)?;
    let cookie = set_cookie_value(&session_cookie(token))
        .ok_or_else(|| AppError::Internal("session cookie is not a valid header".to_string()))?;

    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(json!({ "success": true })),
    ))
}

/// Clear the session cookie.
///
/// POST /logout
///
/// The token itself stays valid until it expires; only the browser copy is
/// removed.
///
/// # Errors
///
/// Only if the cookie cannot be rendered as a header.
pub async fn logout() -> Result<impl IntoResponse> {
    let cookie = set_cookie_value(&cleared_session_cookie())
        .ok_or_else(|| AppError::Internal("session cookie is not a valid header".to_string()))?;

    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(json!({ "success": true })),
    ))
}
