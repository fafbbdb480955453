//! Document, filter, and update types shared by every store implementation.
//!
//! Filters and updates only address top-level fields. The `_id` field is
//! assigned on insert and is never modified by an [`Update`].

use serde_json::{Map, Value};

use restaurant_core::DocumentId;

use super::StoreError;

/// A stored document: a JSON object.
pub type Document = Map<String, Value>;

/// Field holding a document's identifier (hex form).
pub const ID_FIELD: &str = "_id";

/// A condition on a single top-level field.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Field equals the given JSON value.
    Eq(Value),
    /// Field is a number greater than or equal to the floor.
    ///
    /// A missing or non-numeric field never matches.
    Gte(i64),
}

impl Condition {
    /// Check the condition against a field value (`None` when absent).
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Float fields compare against the floor as float
    pub fn matches(&self, value: Option<&Value>) -> bool {
        match self {
            Self::Eq(expected) => value == Some(expected),
            Self::Gte(floor) => value.is_some_and(|v| {
                v.as_i64().map_or_else(
                    || v.as_f64().is_some_and(|f| f >= *floor as f64),
                    |n| n >= *floor,
                )
            }),
        }
    }
}

/// A conjunction of field conditions.
///
/// An empty filter matches every document in the collection.
///
/// # Example
///
/// ```rust,ignore
/// let filter = Filter::by_id(food_id).gte("quantity", 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<(String, Condition)>,
}

impl Filter {
    /// Create an empty filter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter on a document identifier.
    #[must_use]
    pub fn by_id(id: impl Into<DocumentId>) -> Self {
        Self::new().eq(ID_FIELD, id.into().to_string())
    }

    /// Require `field` to equal `value`.
    #[must_use]
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses
            .push((field.into(), Condition::Eq(value.into())));
        self
    }

    /// Require `field` to be at least `floor`.
    #[must_use]
    pub fn gte(mut self, field: impl Into<String>, floor: i64) -> Self {
        self.clauses.push((field.into(), Condition::Gte(floor)));
        self
    }

    /// The individual clauses, in insertion order.
    #[must_use]
    pub fn clauses(&self) -> &[(String, Condition)] {
        &self.clauses
    }

    /// Returns `true` if the filter has no clauses.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Evaluate the filter against a document.
    #[must_use]
    pub fn matches(&self, document: &Document) -> bool {
        self.clauses
            .iter()
            .all(|(field, condition)| condition.matches(document.get(field)))
    }
}

/// A change to a single top-level field.
#[derive(Debug, Clone, PartialEq)]
pub enum Modifier {
    /// Add to a numeric field. A missing field counts as zero.
    Inc(i64),
    /// Replace the field value.
    Set(Value),
}

/// A list of field modifiers applied together (`$inc` / `$set`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    modifiers: Vec<(String, Modifier)>,
}

impl Update {
    /// Create an empty update.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment `field` by `delta` (negative to decrement).
    #[must_use]
    pub fn inc(mut self, field: impl Into<String>, delta: i64) -> Self {
        self.modifiers.push((field.into(), Modifier::Inc(delta)));
        self
    }

    /// Set `field` to `value`.
    #[must_use]
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.modifiers
            .push((field.into(), Modifier::Set(value.into())));
        self
    }

    /// Modifiers that will be applied, skipping any that target `_id`.
    pub fn modifiers(&self) -> impl Iterator<Item = (&str, &Modifier)> {
        self.modifiers
            .iter()
            .filter(|(field, _)| field != ID_FIELD)
            .map(|(field, modifier)| (field.as_str(), modifier))
    }

    /// Apply the update to an in-memory document.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DataCorruption` when incrementing a field that
    /// holds a non-numeric value, or when an integer increment overflows.
    pub fn apply(&self, document: &mut Document) -> Result<(), StoreError> {
        for (field, modifier) in self.modifiers() {
            let next = match modifier {
                Modifier::Set(value) => value.clone(),
                Modifier::Inc(delta) => increment(field, document.get(field), *delta)?,
            };
            document.insert(field.to_owned(), next);
        }
        Ok(())
    }
}

/// Compute the incremented value of a field.
fn increment(field: &str, current: Option<&Value>, delta: i64) -> Result<Value, StoreError> {
    match current {
        None | Some(Value::Null) => Ok(Value::from(delta)),
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                i.checked_add(delta).map(Value::from).ok_or_else(|| {
                    StoreError::DataCorruption(format!("increment of `{field}` overflows"))
                })
            } else {
                #[allow(clippy::cast_precision_loss)] // Float fields stay float, as stored
                let f = n.as_f64().unwrap_or_default() + delta as f64;
                Ok(Value::from(f))
            }
        }
        Some(other) => Err(StoreError::DataCorruption(format!(
            "cannot increment non-numeric field `{field}` ({other})"
        ))),
    }
}

/// Ensure a document carries a well-formed `_id`, generating one if absent.
///
/// # Errors
///
/// Returns `StoreError::DataCorruption` if an existing `_id` is malformed.
pub fn assign_id(mut document: Document) -> Result<(DocumentId, Document), StoreError> {
    let id = match document.get(ID_FIELD) {
        None | Some(Value::Null) => DocumentId::generate(),
        Some(Value::String(s)) => DocumentId::parse(s)
            .map_err(|e| StoreError::DataCorruption(format!("invalid `_id` on insert: {e}")))?,
        Some(other) => {
            return Err(StoreError::DataCorruption(format!(
                "invalid `_id` on insert: {other}"
            )));
        }
    };
    document.insert(ID_FIELD.to_owned(), Value::String(id.to_string()));
    Ok((id, document))
}

/// Whether a batch step must match a document for the batch to commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPolicy {
    /// No match aborts the whole batch with `StoreError::Unmatched`.
    Required,
    /// No match is recorded as a zero count and the batch continues.
    Optional,
}

/// One write inside a [`WriteBatch`].
#[derive(Debug, Clone)]
pub enum WriteStep {
    /// Insert a document (an `_id` is assigned if missing).
    Insert {
        collection: String,
        document: Document,
    },
    /// Update the first document matching `filter`.
    Update {
        collection: String,
        filter: Filter,
        update: Update,
        policy: MatchPolicy,
    },
    /// Delete the first document matching `filter`.
    Delete {
        collection: String,
        filter: Filter,
        policy: MatchPolicy,
    },
}

/// Result of one committed batch step, in step order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Identifier of the inserted document.
    Inserted(DocumentId),
    /// Number of documents updated (0 or 1).
    Updated(u64),
    /// Number of documents deleted (0 or 1).
    Deleted(u64),
}

/// An ordered list of writes applied all-or-nothing.
///
/// # Example
///
/// ```rust,ignore
/// let batch = WriteBatch::new()
///     .update("foods", Filter::by_id(food_id).gte("quantity", 2), Update::new().inc("quantity", -2), MatchPolicy::Required)
///     .insert("Purchase", purchase_document);
/// store.commit(batch).await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    steps: Vec<WriteStep>,
}

impl WriteBatch {
    /// Create an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an insert.
    #[must_use]
    pub fn insert(mut self, collection: impl Into<String>, document: Document) -> Self {
        self.steps.push(WriteStep::Insert {
            collection: collection.into(),
            document,
        });
        self
    }

    /// Append an update of the first matching document.
    #[must_use]
    pub fn update(
        mut self,
        collection: impl Into<String>,
        filter: Filter,
        update: Update,
        policy: MatchPolicy,
    ) -> Self {
        self.steps.push(WriteStep::Update {
            collection: collection.into(),
            filter,
            update,
            policy,
        });
        self
    }

    /// Append a delete of the first matching document.
    #[must_use]
    pub fn delete(
        mut self,
        collection: impl Into<String>,
        filter: Filter,
        policy: MatchPolicy,
    ) -> Self {
        self.steps.push(WriteStep::Delete {
            collection: collection.into(),
            filter,
            policy,
        });
        self
    }

    /// The steps in application order.
    #[must_use]
    pub fn steps(&self) -> &[WriteStep] {
        &self.steps
    }

    /// Consume the batch, yielding its steps.
    #[must_use]
    pub fn into_steps(self) -> Vec<WriteStep> {
        self.steps
    }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns `true` if the batch has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
