//! Canonical identity of a parameterized query.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::param::ParamValue;

/// A key used for caching the results of a SQL statement. Keys are unique
/// based on the SQL itself and the parameters and their values.
///
/// # Canonical Form
///
/// Parameters are sorted by name at construction, so the order in which a
/// caller supplies them never affects comparison: two keys built from the
/// same SQL and the same (name, value) pairs are equal regardless of
/// construction order.
///
/// # Ordering
///
/// Keys are totally ordered so they can key a sorted map. Comparison is
/// lexicographic: SQL text (byte-wise) first, then parameter count, then
/// each name and each value pairwise in sorted order. The first non-zero
/// comparison wins; equality and hashing agree with a zero comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    sql: String,
    params: Vec<(String, ParamValue)>,
}

impl CacheKey {
    /// A key for a parameterless SQL statement.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// A key for a SQL statement with named parameters.
    pub fn with_params<I, N, V>(sql: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = (N, V)>,
        N: Into<String>,
        V: Into<ParamValue>,
    {
        let mut params: Vec<(String, ParamValue)> = params
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect();
        params.sort_by(|a, b| a.0.cmp(&b.0));

        Self {
            sql: sql.into(),
            params,
        }
    }

    /// The SQL statement this key identifies.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The canonicalized (name-sorted) parameter pairs.
    pub fn params(&self) -> &[(String, ParamValue)] {
        &self.params
    }
}

impl Ord for CacheKey {
    fn cmp(&self, other: &Self) -> Ordering {
        let result = self.sql.cmp(&other.sql);
        if result != Ordering::Equal {
            return result;
        }

        let result = self.params.len().cmp(&other.params.len());
        if result != Ordering::Equal {
            return result;
        }

        for ((name, value), (other_name, other_value)) in
            self.params.iter().zip(other.params.iter())
        {
            let result = name.cmp(other_name);
            if result != Ordering::Equal {
                return result;
            }

            let result = value.cmp(other_value);
            if result != Ordering::Equal {
                return result;
            }
        }

        Ordering::Equal
    }
}

impl PartialOrd for CacheKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_params() -> Vec<(&'static str, ParamValue)> {
        vec![
            ("@Test1", ParamValue::Int(0)),
            ("@Test2", ParamValue::Text("Test".into())),
            ("@Test3", ParamValue::Float(1.45)),
        ]
    }

    #[test]
    fn test_different_sql_compares_non_zero() {
        let key1 = CacheKey::with_params("sql1", sample_params());
        let key2 = CacheKey::with_params("sql2", sample_params());

        assert_eq!(key1.cmp(&key2), Ordering::Less);
        assert_ne!(key1, key2);
    }

    #[test]
    fn test_same_sql_and_names_but_different_values_compares_non_zero() {
        let key1 = CacheKey::with_params("sql", sample_params());
        let key2 = CacheKey::with_params(
            "sql",
            vec![
                ("@Test1", ParamValue::Int(0)),
                ("@Test2", ParamValue::Text("Test".into())),
                ("@Test3", ParamValue::Float(1.452)),
            ],
        );

        assert_eq!(key1.cmp(&key2), Ordering::Less);
    }

    #[test]
    fn test_same_parameters_in_different_order_compares_zero() {
        let mut reversed = sample_params();
        reversed.reverse();

        let key1 = CacheKey::with_params("sql", sample_params());
        let key2 = CacheKey::with_params("sql", reversed);

        assert_eq!(key1.cmp(&key2), Ordering::Equal);
        assert_eq!(key1, key2);
    }

    #[test]
    fn test_same_sql_but_fewer_parameters_compares_non_zero() {
        let key1 = CacheKey::with_params("sql", sample_params().into_iter().take(1));
        let key2 = CacheKey::with_params("sql", sample_params());

        assert_eq!(key1.cmp(&key2), Ordering::Less);
    }

    #[test]
    fn test_identical_keys_compare_zero() {
        let key1 = CacheKey::with_params("sql", sample_params());
        let key2 = CacheKey::with_params("sql", sample_params());

        assert_eq!(key1.cmp(&key2), Ordering::Equal);
        assert_eq!(key1, key2);
    }

    #[test]
    fn test_parameterless_keys_compare_by_sql_alone() {
        assert_eq!(CacheKey::new("sql"), CacheKey::new("sql"));
        assert!(CacheKey::new("a") < CacheKey::new("b"));
    }

    #[test]
    fn test_differing_names_at_same_position_are_unequal() {
        // Same value multiset, different names: pairs compare positionally
        // after sorting by name, so these keys must differ.
        let key1 = CacheKey::with_params("sql", vec![("@A", 1i64), ("@B", 2i64)]);
        let key2 = CacheKey::with_params("sql", vec![("@A", 1i64), ("@C", 2i64)]);

        assert_ne!(key1, key2);
    }

    #[test]
    fn test_count_is_compared_before_names() {
        // A single late-sorting name still orders before a longer set.
        let key1 = CacheKey::with_params("sql", vec![("@Z", 1i64)]);
        let key2 = CacheKey::with_params("sql", vec![("@A", 1i64), ("@B", 2i64)]);

        assert_eq!(key1.cmp(&key2), Ordering::Less);
    }

    #[test]
    fn test_serde_roundtrip() {
        let key = CacheKey::with_params("sql", sample_params());
        let json = serde_json::to_string(&key).expect("serialize should succeed");
        let back: CacheKey = serde_json::from_str(&json).expect("deserialize should succeed");

        assert_eq!(key, back);
    }
}
