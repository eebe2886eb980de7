//! Lazy entity references.
//!
//! An entity relationship that is only loaded when first accessed. The
//! session tracks the identifier of a lazy reference under its
//! [`LazyToken`] until the value materializes; afterwards the realized
//! entity itself carries the identity (see
//! [`crate::Session::lazy_entity_id`]).

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use once_cell::unsync::OnceCell;
use strata_core::EntityId;

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(0);

/// Unique identity of a lazy entity reference.
///
/// Tokens are process-unique and survive materialization, so the session can
/// key its lazy-identifier map by value instead of by reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LazyToken(u64);

impl LazyToken {
    fn next() -> Self {
        LazyToken(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed))
    }
}

/// An entity reference that is resolved by a loader on first access and
/// memoized afterwards.
pub struct LazyEntity<T> {
    token: LazyToken,
    loader: Box<dyn Fn() -> Arc<T>>,
    cell: OnceCell<Arc<T>>,
}

impl<T> LazyEntity<T> {
    /// A lazy entity resolved by `loader` on first access.
    pub fn new(loader: impl Fn() -> Arc<T> + 'static) -> Self {
        Self {
            token: LazyToken::next(),
            loader: Box::new(loader),
            cell: OnceCell::new(),
        }
    }

    /// A lazy entity retrieved by its ID. The ID is captured into the
    /// loader; finders use this to defer a by-id lookup.
    pub fn by_id(id: EntityId, loader: impl Fn(EntityId) -> Arc<T> + 'static) -> Self {
        Self::new(move || loader(id))
    }

    /// This reference's session-unique token.
    pub fn token(&self) -> LazyToken {
        self.token
    }

    /// True once the value has been loaded.
    pub fn is_materialized(&self) -> bool {
        self.cell.get().is_some()
    }

    /// The realized value if it has been loaded, without forcing it.
    pub fn materialized(&self) -> Option<&Arc<T>> {
        self.cell.get()
    }

    /// The entity, loading and memoizing it on first access.
    pub fn get(&self) -> &Arc<T> {
        self.cell.get_or_init(|| (self.loader)())
    }
}

impl<T> fmt::Debug for LazyEntity<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyEntity")
            .field("token", &self.token)
            .field("materialized", &self.is_materialized())
            .finish()
    }
}
