//! Food catalog routes.

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use crate::error::Result;
use crate::models::FoodItem;
use crate::services::PurchaseService;
use crate::state::AppState;

/// Get a single food.
///
/// GET /foods/{id}
///
/// # Errors
///
/// 400 for a malformed id, 404 if the food does not exist.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<FoodItem>> {
    let food = PurchaseService::new(state.store()).food(&id).await?;
    Ok(Json(food))
}
