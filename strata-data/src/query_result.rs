//! Cache-aware query outcomes.

use crate::cache_key::CacheKey;

/// The outcome of a cache-aware query.
///
/// A data connector that recognizes a query it has already answered within
/// the current session returns [`QueryResult::Cached`] and does not touch
/// the database; the finder layer is expected to read the entity back from
/// the session cache under the carried key. Otherwise the connector executes
/// the query and returns [`QueryResult::Fresh`] - the key is still carried
/// so the finder can register what it hydrates.
///
/// Consumers must branch on the variant first; only the `Fresh` variant
/// carries data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryResult<T> {
    /// The result should be read from the session cache under `key`.
    Cached {
        /// The cache key for the query.
        key: CacheKey,
    },
    /// Freshly loaded data; `None` when the query found nothing.
    Fresh {
        /// The cache key for the query.
        key: CacheKey,
        /// The query result.
        result: Option<T>,
    },
}

impl<T> QueryResult<T> {
    /// A result instructing the consumer to read the session cache.
    pub fn cached(key: CacheKey) -> Self {
        QueryResult::Cached { key }
    }

    /// A result carrying freshly loaded data.
    pub fn fresh(key: CacheKey, result: Option<T>) -> Self {
        QueryResult::Fresh { key, result }
    }

    /// True when the result should be retrieved from the cache instead of
    /// [`QueryResult::result`].
    pub fn use_cache(&self) -> bool {
        matches!(self, QueryResult::Cached { .. })
    }

    /// The cache key for the query, present on both variants.
    pub fn cache_key(&self) -> &CacheKey {
        match self {
            QueryResult::Cached { key } => key,
            QueryResult::Fresh { key, .. } => key,
        }
    }

    /// The fresh result, or `None` for a cache hit or an empty query.
    pub fn result(&self) -> Option<&T> {
        match self {
            QueryResult::Cached { .. } => None,
            QueryResult::Fresh { result, .. } => result.as_ref(),
        }
    }

    /// Decompose into the key and the fresh result (if any).
    pub fn into_parts(self) -> (CacheKey, Option<T>) {
        match self {
            QueryResult::Cached { key } => (key, None),
            QueryResult::Fresh { key, result } => (key, result),
        }
    }
}
