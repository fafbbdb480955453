//! In-process document store.
//!
//! Backs the server when `RESTAURANT_STORE=memory` and every unit test that
//! needs a store. A single `RwLock` serialises writers, which makes each
//! conditional update and each batch atomic. Batches apply in place and a
//! failing one is rolled back step by step, so no batch copies the store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use restaurant_core::DocumentId;

use super::StoreError;
use super::document::{
    Document, Filter, MatchPolicy, Update, WriteBatch, WriteOutcome, WriteStep, assign_id,
};
use super::store::DocumentStore;

type Collections = HashMap<String, Vec<Document>>;

/// A document store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<Collections>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn insert(
    collections: &mut Collections,
    collection: &str,
    document: Document,
) -> Result<DocumentId, StoreError> {
    let (id, document) = assign_id(document)?;
    collections
        .entry(collection.to_owned())
        .or_default()
        .push(document);
    Ok(id)
}

/// Update the first match, returning its position and previous contents.
fn update(
    collections: &mut Collections,
    collection: &str,
    filter: &Filter,
    update: &Update,
) -> Result<Option<(usize, Document)>, StoreError> {
    let Some((index, target)) = collections.get_mut(collection).and_then(|documents| {
        documents
            .iter_mut()
            .enumerate()
            .find(|(_, d)| filter.matches(d))
    }) else {
        return Ok(None);
    };

    // Apply to a copy so a failing modifier leaves the document untouched
    let mut next = target.clone();
    update.apply(&mut next)?;
    Ok(Some((index, std::mem::replace(target, next))))
}

/// Remove the first match, returning its position and contents.
fn delete(
    collections: &mut Collections,
    collection: &str,
    filter: &Filter,
) -> Option<(usize, Document)> {
    let documents = collections.get_mut(collection)?;
    let index = documents.iter().position(|d| filter.matches(d))?;
    Some((index, documents.remove(index)))
}

/// How to reverse one applied batch step.
enum Undo {
    Insert {
        collection: String,
    },
    Update {
        collection: String,
        index: usize,
        previous: Document,
    },
    Delete {
        collection: String,
        index: usize,
        removed: Document,
    },
}

impl Undo {
    fn revert(self, collections: &mut Collections) {
        match self {
            Self::Insert { collection } => {
                if let Some(documents) = collections.get_mut(&collection) {
                    documents.pop();
                }
            }
            Self::Update {
                collection,
                index,
                previous,
            } => {
                if let Some(slot) = collections
                    .get_mut(&collection)
                    .and_then(|documents| documents.get_mut(index))
                {
                    *slot = previous;
                }
            }
            Self::Delete {
                collection,
                index,
                removed,
            } => collections
                .entry(collection)
                .or_default()
                .insert(index, removed),
        }
    }
}

/// Apply every step in order, recording how to undo each applied one.
fn apply_steps(
    collections: &mut Collections,
    steps: Vec<WriteStep>,
    undo: &mut Vec<Undo>,
) -> Result<Vec<WriteOutcome>, StoreError> {
    let mut outcomes = Vec::with_capacity(steps.len());

    for (step, write) in steps.into_iter().enumerate() {
        let outcome = match write {
            WriteStep::Insert {
                collection,
                document,
            } => {
                let id = insert(collections, &collection, document)?;
                undo.push(Undo::Insert { collection });
                WriteOutcome::Inserted(id)
            }
            WriteStep::Update {
                collection,
                filter,
                update: update_spec,
                policy,
            } => {
                let previous = update(collections, &collection, &filter, &update_spec)?;
                let matched = u64::from(previous.is_some());
                if let Some((index, previous)) = previous {
                    undo.push(Undo::Update {
                        collection,
                        index,
                        previous,
                    });
                }
                check_policy(matched, policy, step)?;
                WriteOutcome::Updated(matched)
            }
            WriteStep::Delete {
                collection,
                filter,
                policy,
            } => {
                let removed = delete(collections, &collection, &filter);
                let deleted = u64::from(removed.is_some());
                if let Some((index, removed)) = removed {
                    undo.push(Undo::Delete {
                        collection,
                        index,
                        removed,
                    });
                }
                check_policy(deleted, policy, step)?;
                WriteOutcome::Deleted(deleted)
            }
        };
        outcomes.push(outcome);
    }

    Ok(outcomes)
}

fn check_policy(matched: u64, policy: MatchPolicy, step: usize) -> Result<(), StoreError> {
    if matched == 0 && matches!(policy, MatchPolicy::Required) {
        return Err(StoreError::Unmatched { step });
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|documents| documents.iter().find(|d| filter.matches(d)))
            .cloned())
    }

    async fn find_many(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .filter(|d| filter.matches(d))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn insert_one(
        &self,
        collection: &str,
        document: Document,
    ) -> Result<DocumentId, StoreError> {
        let mut collections = self.collections.write().await;
        insert(&mut collections, collection, document)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update_spec: &Update,
    ) -> Result<u64, StoreError> {
        let mut collections = self.collections.write().await;
        let previous = update(&mut collections, collection, filter, update_spec)?;
        Ok(u64::from(previous.is_some()))
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let mut collections = self.collections.write().await;
        Ok(u64::from(delete(&mut collections, collection, filter).is_some()))
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(documents) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let before = documents.len();
        documents.retain(|d| !filter.matches(d));
        Ok(u64::try_from(before - documents.len()).unwrap_or(u64::MAX))
    }

    async fn commit(&self, batch: WriteBatch) -> Result<Vec<WriteOutcome>, StoreError> {
        let mut collections = self.collections.write().await;

        // Steps are applied in place; on failure they are reverted newest first
        let mut undo = Vec::with_capacity(batch.len());
        let result = apply_steps(&mut collections, batch.into_steps(), &mut undo);
        if result.is_err() {
            for step in undo.into_iter().rev() {
                step.revert(&mut collections);
            }
        }
        result
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
