//! Seed the food catalog from a YAML file.
//!
//! # File Format
//!
//! ```yaml
//! foods:
//!   - food_name: Tonkotsu Ramen
//!     price: 12.5
//!     quantity: 20
//!     food_category: Noodles
//!     made_by:
//!       name: Kenji
//!       email: kenji@example.com
//! ```
//!
//! `food_name` and `quantity` are required. `purchaseCount` and `totalSeals`
//! start at zero unless given. Any other key is stored as-is.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use restaurant_server::config::database_url_from_env;
use restaurant_server::db::{self, Document, FoodRepository, PgDocumentStore};
use restaurant_server::models::fields;

/// A seed file.
#[derive(Debug, Deserialize)]
pub struct SeedFile {
    pub foods: Vec<Value>,
}

/// Problems found in a seed file entry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SeedError {
    #[error("entry {0}: expected a mapping")]
    NotAMapping(usize),
    #[error("entry {0}: `food_name` must be a non-empty string")]
    MissingName(usize),
    #[error("entry {0}: `{1}` must be a non-negative integer")]
    InvalidCounter(usize, &'static str),
}

/// Turn parsed seed entries into catalog documents.
///
/// # Errors
///
/// Returns the first invalid entry.
pub fn to_documents(file: SeedFile) -> Result<Vec<Document>, SeedError> {
    file.foods
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let Value::Object(mut document) = entry else {
                return Err(SeedError::NotAMapping(index));
            };

            let named = document
                .get("food_name")
                .and_then(Value::as_str)
                .is_some_and(|name| !name.trim().is_empty());
            if !named {
                return Err(SeedError::MissingName(index));
            }

            for (field, required) in [
                (fields::QUANTITY, true),
                (fields::PURCHASE_COUNT, false),
                (fields::TOTAL_SOLD, false),
            ] {
                match document.get(field) {
                    None if !required => {
                        document.insert(field.to_owned(), Value::from(0));
                    }
                    Some(value) if value.as_u64().is_some() => {}
                    _ => return Err(SeedError::InvalidCounter(index, field)),
                }
            }

            Ok(document)
        })
        .collect()
}

/// Seed foods from a YAML file.
///
/// # Arguments
///
/// * `file_path` - Path to the YAML file
/// * `clear_existing` - If true, remove every existing food first
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, an entry is
/// invalid, or database operations fail.
pub async fn foods(file_path: &str, clear_existing: bool) -> Result<(), Box<dyn std::error::Error>> {
    let database_url = database_url_from_env()?;

    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading foods from file");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(path).await?;
    let documents = to_documents(serde_yaml::from_str(&content)?)?;
    info!(foods = documents.len(), "Seed file validated");

    let pool = db::create_pool(&database_url).await?;
    let store = PgDocumentStore::new(pool);
    let repo = FoodRepository::new(&store);
    info!("Connected to database");

    if clear_existing {
        let removed = repo.clear().await?;
        info!(removed, "Cleared existing foods");
    }

    for document in documents {
        let id = repo.insert(document).await?;
        info!(%id, "Inserted food");
    }

    store.pool().close().await;
    info!("Seeding complete!");
    Ok(())
}
