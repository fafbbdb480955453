//! Food catalog repository.

use serde_json::Value;

use restaurant_core::{FoodId, Quantity};

use super::StoreError;
use super::document::{Document, Filter, MatchPolicy, Update, WriteBatch};
use super::store::DocumentStore;
use crate::models::{FoodItem, fields};

/// Collection holding [`FoodItem`] documents.
pub const FOODS_COLLECTION: &str = "foods";

/// Typed access to the `foods` collection.
pub struct FoodRepository<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> FoodRepository<'a> {
    /// Create a new food repository.
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Get a food by its identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails or the stored document does
    /// not decode as a [`FoodItem`].
    pub async fn get(&self, id: FoodId) -> Result<Option<FoodItem>, StoreError> {
        self.store
            .find_one(FOODS_COLLECTION, &Filter::by_id(id))
            .await?
            .map(decode)
            .transpose()
    }

    /// Insert a catalog entry as given, returning its identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn insert(&self, document: Document) -> Result<FoodId, StoreError> {
        let id = self.store.insert_one(FOODS_COLLECTION, document).await?;
        Ok(id.into())
    }

    /// Remove every catalog entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub async fn clear(&self) -> Result<u64, StoreError> {
        self.store
            .delete_many(FOODS_COLLECTION, &Filter::new())
            .await
    }
}

/// Decode a stored document into a [`FoodItem`].
fn decode(document: Document) -> Result<FoodItem, StoreError> {
    serde_json::from_value(Value::Object(document))
        .map_err(|e| StoreError::DataCorruption(format!("invalid food document: {e}")))
}

/// Append the guarded inventory decrement for a purchase of `quantity` units.
///
/// The step matches only while the food still holds at least `quantity`
/// units, and is required: if it matches nothing the whole batch is dropped.
#[must_use]
pub fn reserve_inventory(batch: WriteBatch, id: FoodId, quantity: Quantity) -> WriteBatch {
    let units = quantity.as_i64();
    batch.update(
        FOODS_COLLECTION,
        Filter::by_id(id).gte(fields::QUANTITY, units),
        Update::new()
            .inc(fields::QUANTITY, -units)
            .inc(fields::PURCHASE_COUNT, 1)
            .inc(fields::TOTAL_SOLD, units),
        MatchPolicy::Required,
    )
}

/// Append an inventory restore of `units`.
///
/// Optional: a food removed from the catalog is skipped without failing the
/// batch. Sales counters are left as they are.
#[must_use]
pub fn restock_inventory(batch: WriteBatch, id: FoodId, units: i64) -> WriteBatch {
    batch.update(
        FOODS_COLLECTION,
        Filter::by_id(id),
        Update::new().inc(fields::QUANTITY, units),
        MatchPolicy::Optional,
    )
}
