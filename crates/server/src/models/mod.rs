//! Domain models for the restaurant backend.
//!
//! Field names on the wire match the persisted document keys, so the same
//! serde representation serves request bodies, responses, and storage.

pub mod food;
pub mod purchase;
pub mod session;
pub mod stored;

pub use food::{FoodItem, OwnerIdentity};
pub use purchase::{BuyerQuery, NewPurchase, PurchaseRecord};
pub use session::{SessionClaims, SessionIdentity};
pub use stored::Stored;

/// Persisted document keys.
pub mod fields {
    /// Remaining units available for sale.
    pub const QUANTITY: &str = "quantity";

    /// Number of purchase orders placed against a food.
    pub const PURCHASE_COUNT: &str = "purchaseCount";

    /// Units sold across all purchases of a food.
    pub const TOTAL_SOLD: &str = "totalSeals";

    /// Purchase reference to the bought food.
    pub const FOOD_ID: &str = "foodId";

    /// Purchase buyer display name.
    pub const BUYER_NAME: &str = "buyerName";

    /// Purchase buyer avatar URL.
    pub const BUYER_PHOTO: &str = "buyerPhoto";

    /// Purchase buyer email address.
    pub const BUYER_EMAIL: &str = "buyerEmail";

    /// Purchase creation timestamp (RFC 3339).
    pub const CREATED_AT: &str = "createdAt";
}
