//! Purchase quantity type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Quantity`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QuantityError {
    /// Zero or negative quantity.
    #[error("quantity must be at least 1 (got {0})")]
    NotPositive(i64),
    /// Larger than the inventory counters can represent.
    #[error("quantity must be at most {max} (got {actual})")]
    TooLarge {
        /// Maximum allowed value.
        max: u32,
        /// Requested value.
        actual: i64,
    },
}

/// A strictly positive number of units requested in one purchase.
///
/// ## Examples
///
/// ```
/// use restaurant_core::Quantity;
///
/// assert_eq!(Quantity::new(3).unwrap().get(), 3);
/// assert!(Quantity::new(0).is_err());
/// assert!(Quantity::new(-2).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Quantity(u32);

impl Quantity {
    /// Build a quantity from a signed value.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` is zero, negative, or exceeds `u32::MAX`.
    pub fn new(value: i64) -> Result<Self, QuantityError> {
        if value < 1 {
            return Err(QuantityError::NotPositive(value));
        }

        u32::try_from(value)
            .map(Self)
            .map_err(|_| QuantityError::TooLarge {
                max: u32::MAX,
                actual: value,
            })
    }

    /// Get the quantity as an unsigned value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Get the quantity as a signed value for counter arithmetic.
    #[must_use]
    pub fn as_i64(self) -> i64 {
        i64::from(self.0)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for Quantity {
    type Error = QuantityError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for i64 {
    fn from(quantity: Quantity) -> Self {
        quantity.as_i64()
    }
}
