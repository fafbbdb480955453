//! Purchase ledger records and the requests that create and list them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use restaurant_core::{Email, PurchaseId};

use crate::db::Document;
use crate::models::Stored;

/// A purchase in the `Purchase` collection.
///
/// `food_id`, `quantity` and `created_at` are kept as stored: a legacy record
/// may carry a malformed reference, a quantity written as a string, or a
/// free-form timestamp, and such a record must still be listed and deletable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRecord {
    #[serde(rename = "_id")]
    pub id: PurchaseId,

    #[serde(default)]
    pub food_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Stored<i64>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer_photo: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer_email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Stored<DateTime<Utc>>>,

    #[serde(flatten)]
    pub extra: Document,
}

impl PurchaseRecord {
    /// Units this purchase took from inventory, if the stored quantity is
    /// readable as an integer.
    #[must_use]
    pub fn units(&self) -> Option<i64> {
        self.quantity.as_ref().and_then(Stored::as_count)
    }

    /// When the purchase was placed, if recorded as an RFC 3339 timestamp.
    #[must_use]
    pub fn placed_at(&self) -> Option<DateTime<Utc>> {
        self.created_at.as_ref().and_then(Stored::typed).copied()
    }
}

/// Body of `POST /purchase`.
///
/// `food_id` and `quantity` are validated by the purchase service so that a
/// malformed reference and a non-positive quantity map to distinct errors.
/// Fields the backend does not interpret (delivery notes, price snapshots,
/// ...) are kept in `extra` and stored with the record.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPurchase {
    pub food_id: String,

    pub quantity: i64,

    #[serde(default)]
    pub buyer_name: Option<String>,

    #[serde(default)]
    pub buyer_photo: Option<String>,

    #[serde(default)]
    pub buyer_email: Option<Email>,

    #[serde(flatten)]
    pub extra: Document,
}

/// Query string of `GET /myPurchase`.
///
/// Empty parameters are treated as absent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerQuery {
    #[serde(default)]
    pub buyer_name: Option<String>,

    #[serde(default)]
    pub buyer_photo: Option<String>,

    #[serde(default)]
    pub buyer_email: Option<String>,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

impl BuyerQuery {
    /// Query by email address.
    #[must_use]
    pub fn by_email(email: impl Into<String>) -> Self {
        Self {
            buyer_email: Some(email.into()),
            ..Self::default()
        }
    }

    /// Query by display name and avatar.
    #[must_use]
    pub fn by_profile(name: impl Into<String>, photo: impl Into<String>) -> Self {
        Self {
            buyer_name: Some(name.into()),
            buyer_photo: Some(photo.into()),
            ..Self::default()
        }
    }

    /// The requested buyer email, trimmed, if any.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        non_empty(self.buyer_email.as_deref().map(str::trim))
    }

    /// The requested name and photo, only when both are present.
    #[must_use]
    pub fn profile(&self) -> Option<(&str, &str)> {
        Some((
            non_empty(self.buyer_name.as_deref())?,
            non_empty(self.buyer_photo.as_deref())?,
        ))
    }

    /// Returns `true` if the query names a buyer at all.
    #[must_use]
    pub fn is_identified(&self) -> bool {
        self.email().is_some() || self.profile().is_some()
    }
}
