//! Business services.
//!
//! - [`token`] - Session token signing and verification
//! - [`purchase`] - Purchase creation, cancellation, and listing

pub mod purchase;
pub mod token;

pub use purchase::{PurchaseDeletion, PurchaseError, PurchaseService};
pub use token::{TOKEN_LIFETIME_SECS, TokenError, TokenService};
