//! The cache probe consumed by data connectors.

use strata_core::SessionResult;

use crate::cache_key::CacheKey;

/// Represents a way to determine if a cache key exists in a cache.
///
/// Data connectors probe this before executing a query: a cached key means
/// the connector can skip the database round trip and return a
/// [`crate::QueryResult::Cached`] instead. Probing outside an active session
/// is a contract violation and surfaces the session error.
pub trait QueryCache {
    /// Determines if the specified cache key has been cached.
    fn is_cached(&self, key: &CacheKey) -> SessionResult<bool>;
}
