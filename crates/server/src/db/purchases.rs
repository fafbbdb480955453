//! Purchase ledger repository.

use serde_json::Value;

use restaurant_core::PurchaseId;

use super::StoreError;
use super::document::{Document, Filter, MatchPolicy, WriteBatch};
use super::store::DocumentStore;
use crate::models::{BuyerQuery, PurchaseRecord, fields};

/// Collection holding [`PurchaseRecord`] documents.
pub const PURCHASES_COLLECTION: &str = "Purchase";

/// Typed access to the `Purchase` collection.
pub struct PurchaseRepository<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> PurchaseRepository<'a> {
    /// Create a new purchase repository.
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Get a purchase by its identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails or the stored document does
    /// not decode as a [`PurchaseRecord`].
    pub async fn get(&self, id: PurchaseId) -> Result<Option<PurchaseRecord>, StoreError> {
        self.store
            .find_one(PURCHASES_COLLECTION, &Filter::by_id(id))
            .await?
            .map(decode)
            .transpose()
    }

    /// List purchases matching every buyer identity field in `query`.
    ///
    /// An unidentified query yields no purchases rather than the whole ledger.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails or a record does not decode.
    pub async fn list_by_buyer(
        &self,
        query: &BuyerQuery,
    ) -> Result<Vec<PurchaseRecord>, StoreError> {
        if !query.is_identified() {
            return Ok(Vec::new());
        }

        let mut filter = Filter::new();
        if let Some(email) = query.email() {
            filter = filter.eq(fields::BUYER_EMAIL, email);
        }
        if let Some((name, photo)) = query.profile() {
            filter = filter
                .eq(fields::BUYER_NAME, name)
                .eq(fields::BUYER_PHOTO, photo);
        }

        self.store
            .find_many(PURCHASES_COLLECTION, &filter)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }
}

fn decode(document: Document) -> Result<PurchaseRecord, StoreError> {
    serde_json::from_value(Value::Object(document))
        .map_err(|e| StoreError::DataCorruption(format!("invalid purchase document: {e}")))
}

/// Append the insert of a new purchase record.
#[must_use]
pub fn record_purchase(batch: WriteBatch, document: Document) -> WriteBatch {
    batch.insert(PURCHASES_COLLECTION, document)
}

/// Append the removal of a purchase record.
///
/// Required, so that two concurrent deletions of the same record cannot both
/// commit their inventory restore.
#[must_use]
pub fn remove_purchase(batch: WriteBatch, id: PurchaseId) -> WriteBatch {
    batch.delete(PURCHASES_COLLECTION, Filter::by_id(id), MatchPolicy::Required)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::db::MemoryStore;

    async fn seed(store: &MemoryStore, value: Value) {
        let Value::Object(document) = value else {
            unreachable!()
        };
        store
            .insert_one(PURCHASES_COLLECTION, document)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_list_by_email() {
        let store = MemoryStore::new();
        seed(&store, json!({"foodId": "a", "quantity": 1, "buyerEmail": "a@x.com"})).await;
        seed(&store, json!({"foodId": "b", "quantity": 2, "buyerEmail": "b@x.com"})).await;

        let repo = PurchaseRepository::new(&store);
        let mine = repo
            .list_by_buyer(&BuyerQuery::by_email("a@x.com"))
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].food_id, "a");
    }

    #[tokio::test]
    async fn test_list_by_profile_requires_both_fields() {
        let store = MemoryStore::new();
        seed(
            &store,
            json!({"foodId": "a", "quantity": 1, "buyerName": "Ana", "buyerPhoto": "ana.png"}),
        )
        .await;
        seed(
            &store,
            json!({"foodId": "b", "quantity": 1, "buyerName": "Ana", "buyerPhoto": "other.png"}),
        )
        .await;

        let repo = PurchaseRepository::new(&store);
        let mine = repo
            .list_by_buyer(&BuyerQuery::by_profile("Ana", "ana.png"))
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].food_id, "a");
    }

    #[tokio::test]
    async fn test_unidentified_query_lists_nothing() {
        let store = MemoryStore::new();
        seed(&store, json!({"foodId": "a", "quantity": 1})).await;

        let repo = PurchaseRepository::new(&store);
        let all = repo.list_by_buyer(&BuyerQuery::default()).await.unwrap();
        assert!(all.is_empty());
    }
}
