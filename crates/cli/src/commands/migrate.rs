//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! restaurant-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `RESTAURANT_DATABASE_URL` - `PostgreSQL` connection string (falls back
//!   to `DATABASE_URL`)
//!
//! # Migration Files
//!
//! Migrations live in `crates/server/migrations/` and are embedded in the
//! binary at compile time.

use tracing::info;

use restaurant_server::config::database_url_from_env;
use restaurant_server::db;

/// Apply all pending migrations.
///
/// # Errors
///
/// Returns an error if the database URL is missing, the connection fails, or
/// a migration fails to apply.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let database_url = database_url_from_env()?;

    info!("Connecting to database...");
    let pool = db::create_pool(&database_url).await?;

    info!("Running migrations...");
    db::run_migrations(&pool).await?;

    pool.close().await;
    info!("Migrations complete!");
    Ok(())
}
