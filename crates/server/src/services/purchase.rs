//! Purchase workflow.
//!
//! Creating a purchase moves units from a food's inventory into the ledger;
//! deleting it moves them back. For every food,
//! `quantity + sum(outstanding purchase quantities)` is unchanged by either
//! operation.
//!
//! Each operation validates first and then commits a single [`WriteBatch`],
//! so the inventory adjustment and the ledger write land together or not at
//! all. The inventory decrement is guarded by a `quantity >= requested`
//! filter evaluated atomically with the write, which makes concurrent
//! purchases of the last units safe without any locking here.

use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, instrument, warn};

use restaurant_core::{FoodId, IdError, PurchaseId, Quantity, QuantityError};

use crate::db::foods::{reserve_inventory, restock_inventory};
use crate::db::purchases::{record_purchase, remove_purchase};
use crate::db::{
    Document, DocumentStore, FoodRepository, ID_FIELD, PurchaseRepository, StoreError, WriteBatch,
    WriteOutcome,
};
use crate::models::{BuyerQuery, FoodItem, NewPurchase, PurchaseRecord, fields};

/// Errors from the purchase workflow.
#[derive(Debug, Error)]
pub enum PurchaseError {
    /// A food or purchase identifier is not well formed.
    #[error("invalid reference: {0}")]
    InvalidReference(#[from] IdError),

    /// The requested quantity is not a positive integer.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(#[from] QuantityError),

    /// The referenced food does not exist.
    #[error("food not found: {0}")]
    FoodNotFound(FoodId),

    /// The purchase does not exist.
    #[error("purchase not found: {0}")]
    PurchaseNotFound(PurchaseId),

    /// Fewer units are available than requested. Nothing was written.
    #[error("insufficient inventory: requested {requested}, available {available}")]
    InsufficientInventory {
        /// Units requested.
        requested: u32,
        /// Units available when the request was rejected.
        available: i64,
    },

    /// The underlying store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of a purchase deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurchaseDeletion {
    /// The deleted purchase.
    pub purchase_id: PurchaseId,
    /// Number of ledger records removed (always 1).
    pub deleted_count: u64,
    /// Whether the purchased units were returned to the food's inventory.
    pub inventory_restored: bool,
}

/// Purchase operations over a document store.
pub struct PurchaseService<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> PurchaseService<'a> {
    /// Create a new purchase service.
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Get a food by its identifier.
    ///
    /// # Errors
    ///
    /// Returns `InvalidReference` for a malformed id, `FoodNotFound` if the
    /// food does not exist, or `Store` on store failure.
    #[instrument(skip(self))]
    pub async fn food(&self, food_id: &str) -> Result<FoodItem, PurchaseError> {
        let food_id = FoodId::parse(food_id)?;
        FoodRepository::new(self.store)
            .get(food_id)
            .await?
            .ok_or(PurchaseError::FoodNotFound(food_id))
    }

    /// Place a purchase, taking its units out of the food's inventory.
    ///
    /// On success the food's `quantity` has dropped by the purchased amount,
    /// `purchaseCount` has grown by one, `totalSeals` by the amount, and a new
    /// ledger record exists.
    ///
    /// # Errors
    ///
    /// - `InvalidReference` if `foodId` is malformed
    /// - `InvalidQuantity` if `quantity` is zero or negative
    /// - `FoodNotFound` if the food does not exist
    /// - `InsufficientInventory` if fewer units remain than requested,
    ///   including when a concurrent purchase took them first
    /// - `Store` on store failure
    #[instrument(skip(self, input), fields(food_id = %input.food_id, quantity = input.quantity))]
    pub async fn create(&self, input: NewPurchase) -> Result<PurchaseId, PurchaseError> {
        let food_id = FoodId::parse(&input.food_id)?;
        let quantity = Quantity::new(input.quantity)?;

        let foods = FoodRepository::new(self.store);
        let food = foods
            .get(food_id)
            .await?
            .ok_or(PurchaseError::FoodNotFound(food_id))?;

        if food.quantity < quantity.as_i64() {
            return Err(PurchaseError::InsufficientInventory {
                requested: quantity.get(),
                available: food.quantity,
            });
        }

        let purchase_id = PurchaseId::generate();
        let batch = reserve_inventory(WriteBatch::new(), food_id, quantity);
        let batch = record_purchase(batch, purchase_document(purchase_id, food_id, quantity, input));

        match self.store.commit(batch).await {
            Ok(_) => {
                info!(%purchase_id, food = food.name().unwrap_or_default(), "Purchase recorded");
                Ok(purchase_id)
            }
            // The inventory guard failed between the check above and the commit
            Err(StoreError::Unmatched { .. }) => match foods.get(food_id).await? {
                None => Err(PurchaseError::FoodNotFound(food_id)),
                Some(current) => {
                    warn!(available = current.quantity, "Lost inventory race");
                    Err(PurchaseError::InsufficientInventory {
                        requested: quantity.get(),
                        available: current.quantity,
                    })
                }
            },
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a purchase and return its units to the food's inventory.
    ///
    /// `purchaseCount` and `totalSeals` are historical totals and are not
    /// reduced. If the food is gone, the record's `foodId` is not a valid
    /// reference, or its `quantity` is not readable as a whole number, the
    /// record is still deleted and nothing is restored.
    ///
    /// # Errors
    ///
    /// Returns `InvalidReference` for a malformed id, `PurchaseNotFound` if
    /// the record does not exist (or was deleted concurrently), or `Store` on
    /// store failure.
    #[instrument(skip(self))]
    pub async fn delete(&self, purchase_id: &str) -> Result<PurchaseDeletion, PurchaseError> {
        let purchase_id = PurchaseId::parse(purchase_id)?;

        let record = PurchaseRepository::new(self.store)
            .get(purchase_id)
            .await?
            .ok_or(PurchaseError::PurchaseNotFound(purchase_id))?;

        let units = record.units();
        let mut batch = remove_purchase(WriteBatch::new(), purchase_id);
        match (FoodId::parse(&record.food_id), units) {
            (Ok(food_id), Some(units)) if units > 0 => {
                batch = restock_inventory(batch, food_id, units);
            }
            (Ok(_), _) => warn!(quantity = ?record.quantity, "Purchase has no units to restore"),
            (Err(e), _) => warn!(food_id = %record.food_id, error = %e, "Purchase references an invalid food id"),
        }

        let outcomes = match self.store.commit(batch).await {
            Ok(outcomes) => outcomes,
            Err(StoreError::Unmatched { .. }) => {
                return Err(PurchaseError::PurchaseNotFound(purchase_id));
            }
            Err(e) => return Err(e.into()),
        };

        let inventory_restored = outcomes.get(1) == Some(&WriteOutcome::Updated(1));
        if inventory_restored {
            info!(food_id = %record.food_id, quantity = ?units, "Purchase deleted, inventory restored");
        } else {
            warn!(food_id = %record.food_id, "Purchase deleted without restoring inventory");
        }

        Ok(PurchaseDeletion {
            purchase_id,
            deleted_count: 1,
            inventory_restored,
        })
    }

    /// List the purchases of the buyer named by `query`.
    ///
    /// Callers must authorize the query against the session first.
    ///
    /// # Errors
    ///
    /// Returns `Store` on store failure.
    #[instrument(skip(self))]
    pub async fn list_for_buyer(
        &self,
        query: &BuyerQuery,
    ) -> Result<Vec<PurchaseRecord>, PurchaseError> {
        Ok(PurchaseRepository::new(self.store)
            .list_by_buyer(query)
            .await?)
    }
}

/// Build the ledger document for a new purchase.
///
/// Unknown client fields are kept; the validated fields overwrite anything the
/// client sent under the same keys.
fn purchase_document(
    purchase_id: PurchaseId,
    food_id: FoodId,
    quantity: Quantity,
    input: NewPurchase,
) -> Document {
    let NewPurchase {
        buyer_name,
        buyer_photo,
        buyer_email,
        extra: mut document,
        ..
    } = input;

    document.insert(ID_FIELD.to_owned(), Value::String(purchase_id.to_string()));
    document.insert(fields::FOOD_ID.to_owned(), Value::String(food_id.to_string()));
    document.insert(fields::QUANTITY.to_owned(), Value::from(quantity.as_i64()));
    if let Some(name) = buyer_name {
        document.insert(fields::BUYER_NAME.to_owned(), Value::String(name));
    }
    if let Some(photo) = buyer_photo {
        document.insert(fields::BUYER_PHOTO.to_owned(), Value::String(photo));
    }
    if let Some(email) = buyer_email {
        document.insert(fields::BUYER_EMAIL.to_owned(), Value::String(email.into()));
    }
    document.insert(
        fields::CREATED_AT.to_owned(),
        Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    document
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use restaurant_core::Email;

    use super::*;
    use crate::db::{FOODS_COLLECTION, Filter, MemoryStore, PURCHASES_COLLECTION};
    use crate::models::Stored;

    async fn seed_food(store: &MemoryStore, quantity: i64) -> FoodId {
        let Value::Object(document) = json!({
            "food_name": "Bibimbap",
            "price": 11,
            "quantity": quantity,
            "purchaseCount": 0,
            "totalSeals": 0
        }) else {
            unreachable!()
        };
        FoodRepository::new(store).insert(document).await.unwrap()
    }

    fn order(food_id: impl ToString, quantity: i64) -> NewPurchase {
        NewPurchase {
            food_id: food_id.to_string(),
            quantity,
            buyer_name: Some("Ana".to_owned()),
            buyer_photo: Some("ana.png".to_owned()),
            buyer_email: Some(Email::parse("u@x.com").unwrap()),
            extra: Document::new(),
        }
    }

    async fn food(store: &MemoryStore, id: FoodId) -> FoodItem {
        FoodRepository::new(store).get(id).await.unwrap().unwrap()
    }

    async fn ledger_size(store: &MemoryStore) -> usize {
        store
            .find_many(PURCHASES_COLLECTION, &Filter::new())
            .await
            .unwrap()
            .len()
    }

    #[tokio::test]
    async fn test_create_moves_units_into_ledger() {
        let store = MemoryStore::new();
        let food_id = seed_food(&store, 10).await;

        let purchase_id = PurchaseService::new(&store)
            .create(order(food_id, 2))
            .await
            .unwrap();

        let after = food(&store, food_id).await;
        assert_eq!(after.quantity, 8);
        assert_eq!(after.purchase_count, 1);
        assert_eq!(after.total_sold, 2);

        let record = PurchaseRepository::new(&store)
            .get(purchase_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.food_id, food_id.to_string());
        assert_eq!(record.units(), Some(2));
        assert_eq!(record.buyer_email.as_deref(), Some("u@x.com"));
        assert!(record.placed_at().is_some());
    }

    #[tokio::test]
    async fn test_create_keeps_client_fields_but_not_client_id() {
        let store = MemoryStore::new();
        let food_id = seed_food(&store, 3).await;

        let mut input = order(food_id, 1);
        input.extra.insert("note".to_owned(), json!("extra spicy"));
        input.extra.insert(ID_FIELD.to_owned(), json!("client-chosen"));

        let purchase_id = PurchaseService::new(&store).create(input).await.unwrap();
        let record = PurchaseRepository::new(&store)
            .get(purchase_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.extra["note"], json!("extra spicy"));
    }

    #[tokio::test]
    async fn test_create_rejects_excess_quantity_without_writing() {
        let store = MemoryStore::new();
        let food_id = seed_food(&store, 2).await;

        let result = PurchaseService::new(&store).create(order(food_id, 3)).await;
        assert!(matches!(
            result,
            Err(PurchaseError::InsufficientInventory {
                requested: 3,
                available: 2
            })
        ));

        let after = food(&store, food_id).await;
        assert_eq!(after.quantity, 2);
        assert_eq!(after.purchase_count, 0);
        assert_eq!(ledger_size(&store).await, 0);
    }

    #[tokio::test]
    async fn test_create_validates_input_in_order() {
        let store = MemoryStore::new();
        let service = PurchaseService::new(&store);

        assert!(matches!(
            service.create(order("not-an-id", 1)).await,
            Err(PurchaseError::InvalidReference(_))
        ));
        assert!(matches!(
            service.create(order(FoodId::generate(), 0)).await,
            Err(PurchaseError::InvalidQuantity(_))
        ));
        assert!(matches!(
            service.create(order(FoodId::generate(), -4)).await,
            Err(PurchaseError::InvalidQuantity(_))
        ));
        assert!(matches!(
            service.create(order(FoodId::generate(), 1)).await,
            Err(PurchaseError::FoodNotFound(_))
        ));
        assert_eq!(ledger_size(&store).await, 0);
    }

    #[tokio::test]
    async fn test_create_then_delete_restores_quantity_only() {
        let store = MemoryStore::new();
        let food_id = seed_food(&store, 10).await;
        let service = PurchaseService::new(&store);

        let purchase_id = service.create(order(food_id, 4)).await.unwrap();
        let deletion = service.delete(&purchase_id.to_string()).await.unwrap();

        assert_eq!(deletion.deleted_count, 1);
        assert!(deletion.inventory_restored);

        let after = food(&store, food_id).await;
        assert_eq!(after.quantity, 10);
        assert_eq!(after.purchase_count, 1);
        assert_eq!(after.total_sold, 4);
        assert_eq!(ledger_size(&store).await, 0);
    }

    #[tokio::test]
    async fn test_delete_twice_restores_once() {
        let store = MemoryStore::new();
        let food_id = seed_food(&store, 5).await;
        let service = PurchaseService::new(&store);

        let purchase_id = service.create(order(food_id, 2)).await.unwrap().to_string();
        service.delete(&purchase_id).await.unwrap();

        assert!(matches!(
            service.delete(&purchase_id).await,
            Err(PurchaseError::PurchaseNotFound(_))
        ));
        assert_eq!(food(&store, food_id).await.quantity, 5);
    }

    #[tokio::test]
    async fn test_delete_succeeds_when_food_is_gone() {
        let store = MemoryStore::new();
        let food_id = seed_food(&store, 5).await;
        let service = PurchaseService::new(&store);

        let purchase_id = service.create(order(food_id, 2)).await.unwrap();
        store
            .delete_one(FOODS_COLLECTION, &Filter::by_id(food_id))
            .await
            .unwrap();

        let deletion = service.delete(&purchase_id.to_string()).await.unwrap();
        assert!(!deletion.inventory_restored);
        assert_eq!(ledger_size(&store).await, 0);
    }

    #[tokio::test]
    async fn test_delete_record_with_invalid_food_reference() {
        let store = MemoryStore::new();
        let Value::Object(document) = json!({"foodId": "legacy", "quantity": 2}) else {
            unreachable!()
        };
        let purchase_id = store
            .insert_one(PURCHASES_COLLECTION, document)
            .await
            .unwrap();

        let deletion = PurchaseService::new(&store)
            .delete(&purchase_id.to_string())
            .await
            .unwrap();
        assert!(!deletion.inventory_restored);
        assert_eq!(ledger_size(&store).await, 0);
    }

    #[tokio::test]
    async fn test_legacy_record_with_text_quantity_is_listed_and_restored() {
        let store = MemoryStore::new();
        let food_id = seed_food(&store, 3).await;
        let Value::Object(document) = json!({
            "foodId": food_id.to_string(),
            "quantity": "2",
            "buyerEmail": "a@x.com",
            "createdAt": "Tue May 07 2024 18:30:00 GMT+0600"
        }) else {
            unreachable!()
        };
        let purchase_id = store
            .insert_one(PURCHASES_COLLECTION, document)
            .await
            .unwrap();
        let service = PurchaseService::new(&store);

        let listed = service
            .list_for_buyer(&BuyerQuery::by_email("a@x.com"))
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].placed_at().is_none());

        let deletion = service.delete(&purchase_id.to_string()).await.unwrap();
        assert!(deletion.inventory_restored);
        assert_eq!(food(&store, food_id).await.quantity, 5);
        assert_eq!(ledger_size(&store).await, 0);
    }

    #[tokio::test]
    async fn test_delete_record_with_unreadable_quantity() {
        let store = MemoryStore::new();
        let food_id = seed_food(&store, 3).await;
        let Value::Object(document) = json!({
            "foodId": food_id.to_string(),
            "quantity": "a couple"
        }) else {
            unreachable!()
        };
        let purchase_id = store
            .insert_one(PURCHASES_COLLECTION, document)
            .await
            .unwrap();

        let deletion = PurchaseService::new(&store)
            .delete(&purchase_id.to_string())
            .await
            .unwrap();
        assert!(!deletion.inventory_restored);
        assert_eq!(food(&store, food_id).await.quantity, 3);
        assert_eq!(ledger_size(&store).await, 0);
    }

    #[tokio::test]
    async fn test_create_for_food_with_loosely_shaped_listing() {
        let store = MemoryStore::new();
        let Value::Object(document) = json!({
            "food_name": null,
            "quantity": 5,
            "made_by": "Chef Kenji"
        }) else {
            unreachable!()
        };
        let food_id = FoodRepository::new(&store).insert(document).await.unwrap();

        PurchaseService::new(&store)
            .create(order(food_id, 1))
            .await
            .unwrap();

        let after = food(&store, food_id).await;
        assert_eq!(after.quantity, 4);
        assert_eq!(after.made_by, Some(Stored::Raw(json!("Chef Kenji"))));
    }

    #[tokio::test]
    async fn test_delete_rejects_malformed_and_unknown_ids() {
        let store = MemoryStore::new();
        let service = PurchaseService::new(&store);

        assert!(matches!(
            service.delete("xyz").await,
            Err(PurchaseError::InvalidReference(_))
        ));
        assert!(matches!(
            service.delete(&PurchaseId::generate().to_string()).await,
            Err(PurchaseError::PurchaseNotFound(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_purchases_never_oversell() {
        let store = Arc::new(MemoryStore::new());
        let food_id = seed_food(&store, 5).await;

        let attempts: Vec<_> = (0..2)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    PurchaseService::new(store.as_ref())
                        .create(order(food_id, 3))
                        .await
                })
            })
            .collect();

        let mut succeeded = 0;
        let mut rejected = 0;
        for attempt in attempts {
            match attempt.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(PurchaseError::InsufficientInventory { .. }) => rejected += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!((succeeded, rejected), (1, 1));
        let after = food(&store, food_id).await;
        assert_eq!(after.quantity, 2);
        assert_eq!(after.purchase_count, 1);
        assert_eq!(ledger_size(&store).await, 1);
    }

    #[tokio::test]
    async fn test_list_for_buyer_returns_only_that_buyer() {
        let store = MemoryStore::new();
        let food_id = seed_food(&store, 10).await;
        let service = PurchaseService::new(&store);

        service.create(order(food_id, 1)).await.unwrap();
        let mut other = order(food_id, 1);
        other.buyer_email = Some(Email::parse("b@x.com").unwrap());
        service.create(other).await.unwrap();

        let mine = service
            .list_for_buyer(&BuyerQuery::by_email("u@x.com"))
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].buyer_email.as_deref(), Some("u@x.com"));
    }

    #[tokio::test]
    async fn test_food_lookup() {
        let store = MemoryStore::new();
        let food_id = seed_food(&store, 1).await;
        let service = PurchaseService::new(&store);

        assert_eq!(service.food(&food_id.to_string()).await.unwrap().id, food_id);
        assert!(matches!(
            service.food("bad").await,
            Err(PurchaseError::InvalidReference(_))
        ));
        assert!(matches!(
            service.food(&FoodId::generate().to_string()).await,
            Err(PurchaseError::FoodNotFound(_))
        ));
    }
}
