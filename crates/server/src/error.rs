//! Unified error handling with Sentry integration.
//!
//! Route handlers return `Result<T, AppError>`. Server errors are captured to
//! Sentry and logged before a generic message is sent; every error body is
//! JSON of the form `{"error": "<message>"}`.

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::StoreError;
use crate::services::{PurchaseError, TokenError};

/// Application-level error type for the restaurant API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Purchase workflow failed.
    #[error("Purchase error: {0}")]
    Purchase(#[from] PurchaseError),

    /// Store operation failed outside the purchase workflow.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Session token could not be issued.
    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    /// Caller has no valid session.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Caller's session does not cover the requested resource.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Store(_)
                | Self::Token(_)
                | Self::Internal(_)
                | Self::Purchase(PurchaseError::Store(_))
        )
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Purchase(err) => match err {
                PurchaseError::InvalidReference(_)
                | PurchaseError::InvalidQuantity(_)
                | PurchaseError::InsufficientInventory { .. } => StatusCode::BAD_REQUEST,
                PurchaseError::FoodNotFound(_) | PurchaseError::PurchaseNotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                PurchaseError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Store(_) | Self::Token(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn client_message(&self) -> String {
        // Don't expose internal error details to clients
        if self.is_server_error() {
            return "Internal Server Error".to_string();
        }

        match self {
            Self::Purchase(err) => match err {
                PurchaseError::InvalidReference(_) => "Invalid id".to_string(),
                PurchaseError::InvalidQuantity(e) => e.to_string(),
                PurchaseError::FoodNotFound(_) => "Food not found".to_string(),
                PurchaseError::PurchaseNotFound(_) => "Purchase not found".to_string(),
                PurchaseError::InsufficientInventory { available, .. } => {
                    format!("Insufficient quantity available (only {available} left)")
                }
                PurchaseError::Store(_) => "Internal Server Error".to_string(),
            },
            Self::Unauthorized(_) => "unauthorized access".to_string(),
            Self::Forbidden(_) => "forbidden access".to_string(),
            Self::BadRequest(msg) => msg.clone(),
            Self::Store(_) | Self::Token(_) | Self::Internal(_) => {
                "Internal Server Error".to_string()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        let status = self.status();
        let body = Json(json!({ "error": self.client_message() }));
        (status, body).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use restaurant_core::{FoodId, PurchaseId, Quantity};

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::Forbidden("claims mismatch".to_string());
        assert_eq!(err.to_string(), "Forbidden: claims mismatch");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_purchase_error_status_codes() {
        let invalid_ref = PurchaseError::from(FoodId::parse("nope").unwrap_err());
        assert_eq!(get_status(invalid_ref.into()), StatusCode::BAD_REQUEST);

        let invalid_qty = PurchaseError::from(Quantity::new(0).unwrap_err());
        assert_eq!(get_status(invalid_qty.into()), StatusCode::BAD_REQUEST);

        let short = PurchaseError::InsufficientInventory {
            requested: 3,
            available: 1,
        };
        assert_eq!(get_status(short.into()), StatusCode::BAD_REQUEST);

        let missing = PurchaseError::PurchaseNotFound(PurchaseId::generate());
        assert_eq!(get_status(missing.into()), StatusCode::NOT_FOUND);

        let store = PurchaseError::Store(StoreError::DataCorruption("bad".to_string()));
        assert_eq!(
            get_status(store.into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_access_error_status_codes() {
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_server_errors_hide_details() {
        let err = AppError::Store(StoreError::DataCorruption("row 7 is broken".to_string()));
        assert_eq!(err.client_message(), "Internal Server Error");

        let err = AppError::Purchase(PurchaseError::InsufficientInventory {
            requested: 3,
            available: 2,
        });
        assert_eq!(
            err.client_message(),
            "Insufficient quantity available (only 2 left)"
        );
    }
}
