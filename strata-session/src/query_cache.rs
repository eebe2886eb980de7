//! Joins data connectors with the session cache indirectly.

use strata_core::SessionResult;
use strata_data::{CacheKey, QueryCache};

use crate::manager::SessionManager;

/// A [`QueryCache`] implementation used by data connectors to determine if a
/// query is already answered by the ambient session.
///
/// Probes through [`SessionManager::entities`], so a key caching a
/// multi-entity batch still reports as cached; probing with no active
/// session surfaces the session error.
pub struct SessionQueryCache {
    manager: SessionManager,
}

impl SessionQueryCache {
    /// A probe over the given manager's ambient session.
    pub fn new(manager: SessionManager) -> Self {
        Self { manager }
    }
}

impl QueryCache for SessionQueryCache {
    fn is_cached(&self, key: &CacheKey) -> SessionResult<bool> {
        Ok(!self.manager.entities(key)?.is_empty())
    }
}
