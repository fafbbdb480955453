//! Document store access for the restaurant backend.
//!
//! # Collections
//!
//! - `foods` - Food catalog entries with live inventory counters
//! - `Purchase` - Purchase ledger (one document per purchase)
//!
//! Both collections live in a single `documents` table keyed by
//! `(collection, id)` with a `JSONB` body, so field names match the
//! persisted keys (`food_name`, `purchaseCount`, `totalSeals`, `foodId`,
//! `buyerEmail`, ...).
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p restaurant-cli -- migrate
//! ```

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub mod document;
pub mod foods;
pub mod memory;
pub mod postgres;
pub mod purchases;
pub mod store;

pub use document::{
    Condition, Document, Filter, ID_FIELD, MatchPolicy, Modifier, Update, WriteBatch, WriteOutcome,
    WriteStep,
};
pub use foods::{FOODS_COLLECTION, FoodRepository};
pub use memory::MemoryStore;
pub use postgres::PgDocumentStore;
pub use purchases::{PURCHASES_COLLECTION, PurchaseRepository};
pub use store::DocumentStore;

/// Errors that can occur during document store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failed.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Data in the store is corrupted or does not match the expected shape.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// A batch step that required a matching document found none.
    ///
    /// The whole batch was discarded.
    #[error("write batch step {step} matched no document")]
    Unmatched {
        /// Zero-based index of the failing step.
        step: usize,
    },
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Apply pending schema migrations.
///
/// # Errors
///
/// Returns `StoreError::Migration` if a migration fails to apply.
pub async fn run_migrations(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
