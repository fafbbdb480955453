//! Food catalog entries.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use restaurant_core::FoodId;

use crate::db::Document;
use crate::models::stored::{Stored, count};

/// The user who listed a food.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OwnerIdentity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// A food in the `foods` collection.
///
/// Only the inventory counters are interpreted by the backend. Display
/// fields keep whatever shape the catalog gave them, and every other catalog
/// field (description, origin, image, ...) is carried through `extra`
/// untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FoodItem {
    #[serde(rename = "_id")]
    pub id: FoodId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub food_name: Option<Stored<String>>,

    /// Displayed price, stored as the catalog supplied it (number or string).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Value>,

    /// Units still available. Never driven below zero by a purchase.
    #[serde(default, deserialize_with = "count")]
    pub quantity: i64,

    #[serde(rename = "purchaseCount", default, deserialize_with = "count")]
    pub purchase_count: i64,

    /// Units sold (the persisted key is `totalSeals`).
    #[serde(rename = "totalSeals", default, deserialize_with = "count")]
    pub total_sold: i64,

    /// Listing owner; older entries store a bare name string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub made_by: Option<Stored<OwnerIdentity>>,

    #[serde(flatten)]
    pub extra: Document,
}

impl FoodItem {
    /// Display name, when stored as a string.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.food_name
            .as_ref()
            .and_then(Stored::typed)
            .map(String::as_str)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_decodes_stored_document_with_extra_fields() {
        let id = FoodId::generate();
        let food: FoodItem = serde_json::from_value(json!({
            "_id": id.to_string(),
            "food_name": "Tonkotsu Ramen",
            "price": 12.5,
            "quantity": 7,
            "purchaseCount": 3,
            "totalSeals": 9,
            "made_by": {"name": "Chef", "email": "chef@x.com"},
            "food_origin": "Japan"
        }))
        .unwrap();

        assert_eq!(food.id, id);
        assert_eq!(food.quantity, 7);
        assert_eq!(food.total_sold, 9);
        assert_eq!(food.name(), Some("Tonkotsu Ramen"));
        assert_eq!(food.made_by.as_ref().and_then(Stored::typed).unwrap().name.as_deref(), Some("Chef"));
        assert_eq!(food.extra["food_origin"], json!("Japan"));
    }

    #[test]
    fn test_missing_counters_default_to_zero() {
        let id = FoodId::generate();
        let food: FoodItem = serde_json::from_value(json!({"_id": id.to_string()})).unwrap();
        assert_eq!(food.quantity, 0);
        assert_eq!(food.purchase_count, 0);

        let value = serde_json::to_value(&food).unwrap();
        assert_eq!(value["totalSeals"], json!(0));
        assert!(value.get("price").is_none());
        assert!(value.get("food_name").is_none());
    }

    #[test]
    fn test_loosely_shaped_display_fields() {
        let id = FoodId::generate();
        let stored = json!({
            "_id": id.to_string(),
            "food_name": null,
            "quantity": 5.0,
            "made_by": "Chef Kenji"
        });
        let food: FoodItem = serde_json::from_value(stored).unwrap();

        assert_eq!(food.quantity, 5);
        assert_eq!(food.name(), None);
        assert_eq!(food.made_by, Some(Stored::Raw(json!("Chef Kenji"))));
    }
}
