//! Document identifiers and typed entity references.
//!
//! Every stored document carries a [`DocumentId`]: 12 bytes rendered as 24
//! lowercase hex characters. Use the `define_id!` macro to create typed
//! wrappers that prevent accidentally mixing references to different
//! collections.

use core::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`DocumentId`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The input does not have exactly 24 characters.
    #[error("identifier must be {expected} hex characters (got {actual})")]
    InvalidLength {
        /// Required length.
        expected: usize,
        /// Length of the input.
        actual: usize,
    },
    /// The input contains a non-hex character.
    #[error("identifier must contain only hex characters")]
    InvalidCharacter,
}

/// Per-process random bytes embedded in every generated id.
static PROCESS_UNIQUE: OnceLock<[u8; 5]> = OnceLock::new();

/// Monotonic counter for ids generated within the same second.
static COUNTER: AtomicU32 = AtomicU32::new(0);

/// A store-assigned document identifier.
///
/// ## Layout
///
/// - 4 bytes: seconds since the unix epoch (big-endian)
/// - 5 bytes: random value fixed for the lifetime of the process
/// - 3 bytes: wrapping counter
///
/// ## Examples
///
/// ```
/// use restaurant_core::DocumentId;
///
/// let id = DocumentId::parse("65a1f0c2e4b0a1b2c3d4e5f6").unwrap();
/// assert_eq!(id.to_string(), "65a1f0c2e4b0a1b2c3d4e5f6");
///
/// assert!(DocumentId::parse("not-an-id").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId([u8; 12]);

impl DocumentId {
    /// Length of the hex representation.
    pub const HEX_LENGTH: usize = 24;

    /// Generate a fresh identifier.
    #[must_use]
    pub fn generate() -> Self {
        let seconds = u32::try_from(chrono::Utc::now().timestamp()).unwrap_or(u32::MAX);
        let process = PROCESS_UNIQUE.get_or_init(rand::random::<[u8; 5]>);
        let [_, c1, c2, c3] = COUNTER.fetch_add(1, Ordering::Relaxed).to_be_bytes();

        let mut bytes = [0_u8; 12];
        let (time_part, rest) = bytes.split_at_mut(4);
        let (process_part, counter_part) = rest.split_at_mut(5);
        time_part.copy_from_slice(&seconds.to_be_bytes());
        process_part.copy_from_slice(process);
        counter_part.copy_from_slice(&[c1, c2, c3]);

        Self(bytes)
    }

    /// Parse an identifier from its hex form.
    ///
    /// Upper-case hex is accepted and normalised to lower case.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not exactly 24 hex characters.
    pub fn parse(s: &str) -> Result<Self, IdError> {
        if s.len() != Self::HEX_LENGTH {
            return Err(IdError::InvalidLength {
                expected: Self::HEX_LENGTH,
                actual: s.len(),
            });
        }

        let mut bytes = [0_u8; 12];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| IdError::InvalidCharacter)?;
        Ok(Self(bytes))
    }

    /// Returns `true` if the input is a well-formed identifier.
    #[must_use]
    pub fn is_valid(s: &str) -> bool {
        Self::parse(s).is_ok()
    }

    /// Seconds since the unix epoch encoded in the identifier.
    #[must_use]
    pub const fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    /// Returns the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for DocumentId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DocumentId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.to_string()
    }
}

/// Macro to define a typed reference to a document in one collection.
///
/// Creates a newtype wrapper around [`DocumentId`] with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`
/// - `parse()`, `generate()`, `as_document_id()`
/// - `From<DocumentId>` and `Into<DocumentId>` implementations
///
/// # Example
///
/// ```rust
/// # use restaurant_core::define_id;
/// define_id!(TableId);
/// define_id!(WaiterId);
///
/// let table = TableId::generate();
///
/// // These are different types, so this won't compile:
/// // let _: WaiterId = table;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name($crate::DocumentId);

        impl $name {
            /// Parse a reference from its hex form.
            ///
            /// # Errors
            ///
            /// Returns an error if the input is not a well-formed identifier.
            pub fn parse(s: &str) -> ::core::result::Result<Self, $crate::IdError> {
                $crate::DocumentId::parse(s).map(Self)
            }

            /// Generate a fresh identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self($crate::DocumentId::generate())
            }

            /// Get the underlying document identifier.
            #[must_use]
            pub const fn as_document_id(&self) -> $crate::DocumentId {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                ::core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = $crate::IdError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl From<$crate::DocumentId> for $name {
            fn from(id: $crate::DocumentId) -> Self {
                Self(id)
            }
        }

        impl From<$name> for $crate::DocumentId {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(FoodId);
define_id!(PurchaseId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let id = DocumentId::parse("65a1f0c2e4b0a1b2c3d4e5f6").unwrap();
        assert_eq!(id.to_string(), "65a1f0c2e4b0a1b2c3d4e5f6");
    }

    #[test]
    fn test_parse_uppercase_normalised() {
        let id = DocumentId::parse("65A1F0C2E4B0A1B2C3D4E5F6").unwrap();
        assert_eq!(id.to_string(), "65a1f0c2e4b0a1b2c3d4e5f6");
    }

    #[test]
    fn test_parse_wrong_length() {
        assert_eq!(
            DocumentId::parse("abc"),
            Err(IdError::InvalidLength {
                expected: 24,
                actual: 3
            })
        );
        assert!(DocumentId::parse("").is_err());
    }

    #[test]
    fn test_parse_non_hex() {
        assert_eq!(
            DocumentId::parse("zzzzzzzzzzzzzzzzzzzzzzzz"),
            Err(IdError::InvalidCharacter)
        );
    }

    #[test]
    fn test_generate_is_unique_and_valid() {
        let a = DocumentId::generate();
        let b = DocumentId::generate();
        assert_ne!(a, b);
        assert!(DocumentId::is_valid(&a.to_string()));
    }

    #[test]
    fn test_generate_embeds_timestamp() {
        let before = u32::try_from(chrono::Utc::now().timestamp()).unwrap();
        let id = DocumentId::generate();
        assert!(id.timestamp() >= before);
    }

    #[test]
    fn test_serde_as_hex_string() {
        let id = DocumentId::parse("65a1f0c2e4b0a1b2c3d4e5f6").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"65a1f0c2e4b0a1b2c3d4e5f6\"");

        let bad: Result<DocumentId, _> = serde_json::from_str("\"nope\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_typed_ids_share_representation() {
        let food = FoodId::parse("65a1f0c2e4b0a1b2c3d4e5f6").unwrap();
        let json = serde_json::to_string(&food).unwrap();
        assert_eq!(json, "\"65a1f0c2e4b0a1b2c3d4e5f6\"");

        let purchase: PurchaseId = food.as_document_id().into();
        assert_eq!(purchase.to_string(), food.to_string());
    }
}
