//! The document store interface consumed by the purchase workflow.

use async_trait::async_trait;

use restaurant_core::DocumentId;

use super::StoreError;
use super::document::{Document, Filter, Update, WriteBatch, WriteOutcome};

/// Collection-oriented persistence with filter and update-operator semantics.
///
/// Implementations are shared across request tasks behind an `Arc` and must
/// be safe to call concurrently. Each single-document call is atomic on its
/// own; only [`DocumentStore::commit`] groups several writes.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Find the first document matching `filter`.
    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError>;

    /// Find all documents matching `filter`, in no particular order.
    async fn find_many(&self, collection: &str, filter: &Filter)
    -> Result<Vec<Document>, StoreError>;

    /// Insert a document, assigning an `_id` if it has none.
    async fn insert_one(
        &self,
        collection: &str,
        document: Document,
    ) -> Result<DocumentId, StoreError>;

    /// Update the first document matching `filter`.
    ///
    /// Returns the number of matched documents (0 or 1). The filter is
    /// re-checked atomically with the write, so a floor condition such as
    /// `gte("quantity", n)` cannot be invalidated by a concurrent update.
    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<u64, StoreError>;

    /// Delete the first document matching `filter`, returning the count (0 or 1).
    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError>;

    /// Delete every document matching `filter`, returning the count.
    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError>;

    /// Apply every step of `batch` or none of them.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unmatched` if a step with `MatchPolicy::Required`
    /// matched nothing; no step of the batch is persisted in that case.
    async fn commit(&self, batch: WriteBatch) -> Result<Vec<WriteOutcome>, StoreError>;

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Release underlying resources. Called once during shutdown.
    async fn close(&self) {}
}
