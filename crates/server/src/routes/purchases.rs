//! Purchase routes.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};
use serde::Serialize;
use tracing::instrument;

use restaurant_core::PurchaseId;

use crate::error::Result;
use crate::middleware::{PurchaseAccess, RequireSession, authorize_purchase_query};
use crate::models::{BuyerQuery, NewPurchase, PurchaseRecord};
use crate::services::PurchaseService;
use crate::state::AppState;

/// Response body for a created purchase.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedResponse {
    pub message: &'static str,
    pub inserted_id: PurchaseId,
}

/// Response body for a deleted purchase.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedResponse {
    pub deleted_count: u64,
}

/// Place a purchase.
///
/// POST /purchase
///
/// # Errors
///
/// 400 for a malformed body, food id, quantity, or insufficient inventory;
/// 404 if the food does not exist.
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    body: std::result::Result<Json<NewPurchase>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedResponse>)> {
    let Json(input) = body?;
    let purchase_id = PurchaseService::new(state.store()).create(input).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            message: "Purchase data added successfully",
            inserted_id: purchase_id,
        }),
    ))
}

/// List the caller's own purchases.
///
/// GET /myPurchase?buyerEmail=...&buyerName=...&buyerPhoto=...
///
/// # Errors
///
/// 401 without a valid session, 403 if the query names another buyer.
#[instrument(skip_all)]
pub async fn mine(
    State(state): State<AppState>,
    RequireSession(claims): RequireSession,
    query: std::result::Result<Query<BuyerQuery>, QueryRejection>,
) -> Result<Json<Vec<PurchaseRecord>>> {
    let Query(query) = query?;

    let purchases = match authorize_purchase_query(&claims, &query)? {
        PurchaseAccess::Granted => {
            PurchaseService::new(state.store())
                .list_for_buyer(&query)
                .await?
        }
        PurchaseAccess::NoIdentity => Vec::new(),
    };

    Ok(Json(purchases))
}

/// Cancel a purchase and return its units to inventory.
///
/// POST /myPurchase/{id}
///
/// # Errors
///
/// 400 for a malformed id, 404 if the purchase does not exist.
#[instrument(skip(state))]
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeletedResponse>> {
    let deletion = PurchaseService::new(state.store()).delete(&id).await?;

    Ok(Json(DeletedResponse {
        deleted_count: deletion.deleted_count,
    }))
}
