//! Session extractor and purchase-history access gate.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;
use crate::middleware::session::token_from_headers;
use crate::models::{BuyerQuery, SessionClaims};
use crate::state::AppState;

/// Extractor that requires a valid session token cookie.
///
/// Rejects with 401 when the `token` cookie is missing, and also when it is
/// present but fails verification (bad signature, malformed, or expired).
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireSession(claims): RequireSession,
/// ) -> impl IntoResponse {
///     format!("Hello, {:?}!", claims.identity.username)
/// }
/// ```
pub struct RequireSession(pub SessionClaims);

impl FromRequestParts<AppState> for RequireSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = token_from_headers(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("missing session token".to_string()))?;

        let claims = state.tokens().verify(&token).map_err(|e| {
            tracing::debug!(error = %e, "Session token rejected");
            AppError::Unauthorized(e.to_string())
        })?;

        Ok(Self(claims))
    }
}

/// Outcome of an authorized purchase-history query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseAccess {
    /// The query names the session's own buyer identity.
    Granted,
    /// The query names no buyer; answer with an empty list.
    NoIdentity,
}

/// Check that a purchase-history query only asks for the caller's purchases.
///
/// Every buyer identity the query supplies must match the session exactly:
/// `buyerEmail` against the session email, and `buyerName` plus
/// `buyerPhoto` (only when both are given) against the session username and
/// photo URL.
///
/// # Errors
///
/// Returns `AppError::Forbidden` if any supplied identity differs from the
/// session's.
pub fn authorize_purchase_query(
    claims: &SessionClaims,
    query: &BuyerQuery,
) -> Result<PurchaseAccess, AppError> {
    if !query.is_identified() {
        return Ok(PurchaseAccess::NoIdentity);
    }

    let identity = &claims.identity;

    if let Some(email) = query.email() {
        let owns = identity.email.as_ref().is_some_and(|e| e.matches(email));
        if !owns {
            return Err(AppError::Forbidden("buyer email mismatch".to_string()));
        }
    }

    if let Some((name, photo)) = query.profile() {
        let owns = identity.username.as_deref() == Some(name)
            && identity.photo_url.as_deref() == Some(photo);
        if !owns {
            return Err(AppError::Forbidden("buyer profile mismatch".to_string()));
        }
    }

    Ok(PurchaseAccess::Granted)
}
