//! Tolerant decoding of persisted fields.
//!
//! Older clients wrote request bodies into the store unchanged, so fields the
//! backend reads may hold the wrong JSON type. Decoding such a document must
//! not fail: the purchase workflow only needs its counters and references.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A persisted field that decodes to `T` when well-formed and is otherwise
/// kept verbatim, so it is written back and returned unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Stored<T> {
    Typed(T),
    Raw(Value),
}

impl<T> Stored<T> {
    /// The decoded value, if the stored one had the expected shape.
    #[must_use]
    pub const fn typed(&self) -> Option<&T> {
        match self {
            Self::Typed(value) => Some(value),
            Self::Raw(_) => None,
        }
    }
}

impl Stored<i64> {
    /// The stored integer, also reading numeric strings and whole floats.
    #[must_use]
    pub fn as_count(&self) -> Option<i64> {
        match self {
            Self::Typed(n) => Some(*n),
            Self::Raw(Value::String(s)) => s.trim().parse().ok(),
            Self::Raw(value) => whole_number(value),
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn whole_number(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.is_finite() && f.fract() == 0.0)
            .map(|f| f as i64)
    })
}

/// Decode an inventory counter.
///
/// Whole floats count as integers. Anything that is not a number counts as
/// zero, matching the store's numeric guards, which never match it either.
pub fn count<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(whole_number).unwrap_or(0))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{DateTime, Utc};
    use serde_json::json;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Counter {
        #[serde(default, deserialize_with = "count")]
        n: i64,
    }

    #[test]
    fn test_well_formed_value_is_typed() {
        let stored: Stored<i64> = serde_json::from_value(json!(4)).unwrap();
        assert_eq!(stored, Stored::Typed(4));
        assert_eq!(stored.as_count(), Some(4));
    }

    #[test]
    fn test_numeric_string_is_read_as_count() {
        let stored: Stored<i64> = serde_json::from_value(json!(" 2 ")).unwrap();
        assert_eq!(stored.typed(), None);
        assert_eq!(stored.as_count(), Some(2));
        assert_eq!(serde_json::to_value(&stored).unwrap(), json!(" 2 "));
    }

    #[test]
    fn test_unreadable_count() {
        for raw in [json!("two"), json!(1.5), json!({"n": 1}), json!(true)] {
            let stored: Stored<i64> = serde_json::from_value(raw).unwrap();
            assert_eq!(stored.as_count(), None);
        }
        let stored: Stored<i64> = serde_json::from_value(json!(3.0)).unwrap();
        assert_eq!(stored.as_count(), Some(3));
    }

    #[test]
    fn test_bad_timestamp_is_kept_verbatim() {
        let stored: Stored<DateTime<Utc>> =
            serde_json::from_value(json!("last tuesday")).unwrap();
        assert!(stored.typed().is_none());
        assert_eq!(serde_json::to_value(&stored).unwrap(), json!("last tuesday"));

        let stored: Stored<DateTime<Utc>> =
            serde_json::from_value(json!("2024-05-01T12:00:00.000Z")).unwrap();
        assert!(stored.typed().is_some());
    }

    #[test]
    fn test_counter_field() {
        let parse = |v| serde_json::from_value::<Counter>(v).unwrap().n;
        assert_eq!(parse(json!({"n": 5})), 5);
        assert_eq!(parse(json!({"n": 5.0})), 5);
        assert_eq!(parse(json!({"n": "5"})), 0);
        assert_eq!(parse(json!({"n": null})), 0);
        assert_eq!(parse(json!({})), 0);
    }
}
