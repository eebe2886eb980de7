//! Parameter values carried by cache keys.
//!
//! Cache keys need a total order over parameter values so they can key a
//! sorted map. Driver-level parameter types are open-ended; [`ParamValue`]
//! closes them into a fixed set of variants with hand-written `Ord`, `Eq`
//! and `Hash` implementations that agree with each other (floats compare via
//! `total_cmp` and hash via their bit pattern).

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::mem;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A query parameter value.
///
/// Values of different variants order by variant rank (the declaration
/// order below); values of the same variant order by their natural total
/// order. `Int(1)` and `Float(1.0)` are therefore *not* equal - a key built
/// from a differently-typed driver parameter is a different key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
}

impl ParamValue {
    fn rank(&self) -> u8 {
        match self {
            ParamValue::Null => 0,
            ParamValue::Bool(_) => 1,
            ParamValue::Int(_) => 2,
            ParamValue::Float(_) => 3,
            ParamValue::Text(_) => 4,
            ParamValue::Bytes(_) => 5,
            ParamValue::Uuid(_) => 6,
            ParamValue::Timestamp(_) => 7,
        }
    }
}

impl Ord for ParamValue {
    fn cmp(&self, other: &Self) -> Ordering {
        use ParamValue::*;

        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Int(a), Int(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            (Bytes(a), Bytes(b)) => a.cmp(b),
            (Uuid(a), Uuid(b)) => a.cmp(b),
            (Timestamp(a), Timestamp(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for ParamValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ParamValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ParamValue {}

impl Hash for ParamValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        mem::discriminant(self).hash(state);
        match self {
            ParamValue::Null => {}
            ParamValue::Bool(v) => v.hash(state),
            ParamValue::Int(v) => v.hash(state),
            // Bit pattern keeps Hash consistent with total_cmp equality.
            ParamValue::Float(v) => v.to_bits().hash(state),
            ParamValue::Text(v) => v.hash(state),
            ParamValue::Bytes(v) => v.hash(state),
            ParamValue::Uuid(v) => v.hash(state),
            ParamValue::Timestamp(v) => v.hash(state),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Int(value.into())
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<Vec<u8>> for ParamValue {
    fn from(value: Vec<u8>) -> Self {
        ParamValue::Bytes(value)
    }
}

impl From<Uuid> for ParamValue {
    fn from(value: Uuid) -> Self {
        ParamValue::Uuid(value)
    }
}

impl From<DateTime<Utc>> for ParamValue {
    fn from(value: DateTime<Utc>) -> Self {
        ParamValue::Timestamp(value)
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ParamValue::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(value: &ParamValue) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_same_variant_orders_by_value() {
        assert!(ParamValue::Int(1) < ParamValue::Int(2));
        assert!(ParamValue::Text("a".into()) < ParamValue::Text("b".into()));
        assert!(ParamValue::Float(1.4) < ParamValue::Float(1.45));
    }

    #[test]
    fn test_different_variants_order_by_rank() {
        assert!(ParamValue::Null < ParamValue::Bool(false));
        assert!(ParamValue::Int(i64::MAX) < ParamValue::Float(f64::MIN));
        assert!(ParamValue::Float(f64::MAX) < ParamValue::Text(String::new()));
    }

    #[test]
    fn test_int_and_float_are_never_equal() {
        assert_ne!(ParamValue::Int(1), ParamValue::Float(1.0));
    }

    #[test]
    fn test_nan_is_equal_to_itself() {
        let nan = ParamValue::Float(f64::NAN);
        assert_eq!(nan, nan.clone());
        assert_eq!(hash_of(&nan), hash_of(&nan.clone()));
    }

    #[test]
    fn test_hash_agrees_with_equality() {
        let a = ParamValue::Float(1.45);
        let b = ParamValue::Float(1.45);
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(ParamValue::from(None::<i64>), ParamValue::Null);
        assert_eq!(ParamValue::from(Some(3i64)), ParamValue::Int(3));
    }
}
