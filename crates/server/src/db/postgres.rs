//! `PostgreSQL`-backed document store.
//!
//! Documents live in one `documents` table:
//!
//! ```text
//! collection TEXT | id TEXT | body JSONB | created_at | updated_at
//! PRIMARY KEY (collection, id)
//! ```
//!
//! Filters and updates are compiled to SQL with `QueryBuilder`; every field
//! name and value is a bind parameter. Single-document writes lock the target
//! row and re-check the filter in the same statement, and batches run inside
//! one transaction.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgConnection;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};

use restaurant_core::DocumentId;

use super::StoreError;
use super::document::{
    Condition, Document, Filter, ID_FIELD, MatchPolicy, Modifier, Update, WriteBatch,
    WriteOutcome, WriteStep, assign_id,
};
use super::store::DocumentStore;

/// Document store over a `PostgreSQL` connection pool.
#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// =============================================================================
// SQL Builders
// =============================================================================

/// The `_id` clause targets the indexed `id` column rather than the body.
fn id_text(value: &Value) -> String {
    value
        .as_str()
        .map_or_else(|| value.to_string(), str::to_owned)
}

/// Push `collection = $n AND <clauses>` (no leading `WHERE`).
fn push_conditions(qb: &mut QueryBuilder<'_, Postgres>, collection: &str, filter: &Filter) {
    qb.push("collection = ").push_bind(collection.to_owned());

    for (field, condition) in filter.clauses() {
        match condition {
            Condition::Eq(value) if field == ID_FIELD => {
                qb.push(" AND id = ").push_bind(id_text(value));
            }
            Condition::Eq(value) => {
                qb.push(" AND body -> ")
                    .push_bind(field.clone())
                    .push(" = ")
                    .push_bind(Json(value.clone()));
            }
            Condition::Gte(floor) => {
                // CASE keeps the cast from running on non-numeric values
                qb.push(" AND (CASE WHEN jsonb_typeof(body -> ")
                    .push_bind(field.clone())
                    .push(") = 'number' THEN (body ->> ")
                    .push_bind(field.clone())
                    .push(")::numeric END) >= ")
                    .push_bind(*floor);
            }
        }
    }
}

/// Push the new body expression: nested `jsonb_set` calls, one per modifier.
fn push_update_expr(qb: &mut QueryBuilder<'_, Postgres>, update: &Update) {
    let modifiers: Vec<_> = update.modifiers().collect();

    for _ in &modifiers {
        qb.push("jsonb_set(");
    }
    qb.push("body");

    for (field, modifier) in modifiers {
        qb.push(", ARRAY[").push_bind(field.to_owned()).push("]::text[], ");
        match modifier {
            Modifier::Inc(delta) => {
                qb.push("to_jsonb(COALESCE((body ->> ")
                    .push_bind(field.to_owned())
                    .push(")::numeric, 0) + ")
                    .push_bind(*delta)
                    .push(")");
            }
            Modifier::Set(value) => {
                qb.push_bind(Json(value.clone()));
            }
        }
        qb.push(", true)");
    }
}

/// Push a locked sub-select of the first matching row id.
fn push_first_match(qb: &mut QueryBuilder<'_, Postgres>, collection: &str, filter: &Filter) {
    qb.push("id = (SELECT id FROM documents WHERE ");
    push_conditions(qb, collection, filter);
    qb.push(" LIMIT 1 FOR UPDATE)");
}

// =============================================================================
// Statement Execution
// =============================================================================

async fn find_one_in(
    conn: &mut PgConnection,
    collection: &str,
    filter: &Filter,
) -> Result<Option<Document>, StoreError> {
    let mut qb = QueryBuilder::new("SELECT body FROM documents WHERE ");
    push_conditions(&mut qb, collection, filter);
    qb.push(" LIMIT 1");

    let row = qb
        .build_query_scalar::<Json<Document>>()
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.map(|Json(document)| document))
}

async fn insert_in(
    conn: &mut PgConnection,
    collection: &str,
    document: Document,
) -> Result<DocumentId, StoreError> {
    let (id, document) = assign_id(document)?;

    sqlx::query("INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3)")
        .bind(collection)
        .bind(id.to_string())
        .bind(Json(document))
        .execute(&mut *conn)
        .await?;

    Ok(id)
}

async fn update_in(
    conn: &mut PgConnection,
    collection: &str,
    filter: &Filter,
    update: &Update,
) -> Result<u64, StoreError> {
    let mut qb = QueryBuilder::new("UPDATE documents SET body = ");
    push_update_expr(&mut qb, update);
    qb.push(", updated_at = now() WHERE ");
    push_conditions(&mut qb, collection, filter);
    qb.push(" AND ");
    push_first_match(&mut qb, collection, filter);

    let result = qb.build().execute(&mut *conn).await?;
    Ok(result.rows_affected())
}

async fn delete_in(
    conn: &mut PgConnection,
    collection: &str,
    filter: &Filter,
) -> Result<u64, StoreError> {
    let mut qb = QueryBuilder::new("DELETE FROM documents WHERE ");
    push_conditions(&mut qb, collection, filter);
    qb.push(" AND ");
    push_first_match(&mut qb, collection, filter);

    let result = qb.build().execute(&mut *conn).await?;
    Ok(result.rows_affected())
}

fn check_policy(affected: u64, policy: MatchPolicy, step: usize) -> Result<(), StoreError> {
    if affected == 0 && matches!(policy, MatchPolicy::Required) {
        return Err(StoreError::Unmatched { step });
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        find_one_in(&mut conn, collection, filter).await
    }

    async fn find_many(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Vec<Document>, StoreError> {
        let mut qb = QueryBuilder::new("SELECT body FROM documents WHERE ");
        push_conditions(&mut qb, collection, filter);

        let rows = qb
            .build_query_scalar::<Json<Document>>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|Json(document)| document).collect())
    }

    async fn insert_one(
        &self,
        collection: &str,
        document: Document,
    ) -> Result<DocumentId, StoreError> {
        let mut conn = self.pool.acquire().await?;
        insert_in(&mut conn, collection, document).await
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<u64, StoreError> {
        let mut conn = self.pool.acquire().await?;
        update_in(&mut conn, collection, filter, update).await
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let mut conn = self.pool.acquire().await?;
        delete_in(&mut conn, collection, filter).await
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let mut qb = QueryBuilder::new("DELETE FROM documents WHERE ");
        push_conditions(&mut qb, collection, filter);

        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<Vec<WriteOutcome>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut outcomes = Vec::with_capacity(batch.len());

        // Returning early drops `tx`, which rolls the transaction back
        for (step, write) in batch.into_steps().into_iter().enumerate() {
            let outcome = match write {
                WriteStep::Insert {
                    collection,
                    document,
                } => WriteOutcome::Inserted(insert_in(&mut tx, &collection, document).await?),
                WriteStep::Update {
                    collection,
                    filter,
                    update,
                    policy,
                } => {
                    let matched = update_in(&mut tx, &collection, &filter, &update).await?;
                    check_policy(matched, policy, step)?;
                    WriteOutcome::Updated(matched)
                }
                WriteStep::Delete {
                    collection,
                    filter,
                    policy,
                } => {
                    let deleted = delete_in(&mut tx, &collection, &filter).await?;
                    check_policy(deleted, policy, step)?;
                    WriteOutcome::Deleted(deleted)
                }
            };
            outcomes.push(outcome);
        }

        tx.commit().await?;
        Ok(outcomes)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sql_for_update(filter: &Filter, update: &Update) -> String {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE documents SET body = ");
        push_update_expr(&mut qb, update);
        qb.push(" WHERE ");
        push_conditions(&mut qb, "foods", filter);
        qb.sql().to_owned()
    }

    #[test]
    fn test_conditions_bind_every_value() {
        let filter = Filter::new().eq("buyerEmail", "a@x.com").gte("quantity", 3);
        let mut qb = QueryBuilder::<Postgres>::new("SELECT body FROM documents WHERE ");
        push_conditions(&mut qb, "Purchase", &filter);

        let sql = qb.sql();
        assert!(sql.contains("collection = $1"));
        assert!(sql.contains("body -> $2 = $3"));
        assert!(sql.contains("THEN (body ->> $5)::numeric END) >= $6"));
        assert!(!sql.contains("a@x.com"));
    }

    #[test]
    fn test_id_clause_uses_id_column() {
        let id = DocumentId::generate();
        let mut qb = QueryBuilder::<Postgres>::new("");
        push_conditions(&mut qb, "foods", &Filter::by_id(id));
        assert_eq!(qb.sql(), "collection = $1 AND id = $2");
    }

    #[test]
    fn test_update_nests_one_jsonb_set_per_modifier() {
        let update = Update::new()
            .inc("quantity", -2)
            .inc("purchaseCount", 1)
            .set("food_name", "Pho");
        let sql = sql_for_update(&Filter::new(), &update);

        assert!(sql.starts_with("UPDATE documents SET body = jsonb_set(jsonb_set(jsonb_set(body"));
        assert_eq!(sql.matches(", true)").count(), 3);
        assert!(sql.contains("COALESCE((body ->> $2)::numeric, 0) + $3"));
    }

    #[test]
    fn test_update_skips_id_modifier() {
        let update = Update::new().set(ID_FIELD, "x");
        let sql = sql_for_update(&Filter::new(), &update);
        assert!(sql.starts_with("UPDATE documents SET body = body WHERE"));
    }
}
