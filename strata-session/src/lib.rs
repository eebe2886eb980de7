//! STRATA Session - Session-Scoped Identity-Map Cache
//!
//! A session guarantees at-most-one cached instance per entity identity
//! within one logical unit of work. Finders register the entities they
//! hydrate, repositories report persists and deletes, and repeated queries
//! are answered from the cache through their [`strata_data::CacheKey`].
//!
//! # Scoping
//!
//! Sessions are ambient within a [`SessionManager`]: the first
//! [`SessionManager::enroll`] creates the session, nested enrollments on the
//! same manager reuse it, and dropping the outermost [`SessionScope`] tears
//! it down. Managers are deliberately not `Send`/`Sync` - one session
//! belongs to one logical flow, and the type system enforces it.
//!
//! # Key Types
//!
//! - [`Session`]: the three-map cache state and its operations
//! - [`SessionManager`] / [`SessionScope`]: ambient enrollment and teardown
//! - [`TransactionalSessionManager`]: enrollment coupled with transaction
//!   enlistment
//! - [`SessionObserver`]: pluggable persisted/found/removed diagnostics
//! - [`LazyEntity`]: a not-yet-materialized entity reference the session can
//!   resolve identifiers for
//! - [`CachingFinder`]: the cache-hit/fresh-data branch finders share

pub mod finder;
pub mod lazy;
pub mod manager;
pub mod observer;
pub mod query_cache;
pub mod session;

pub use finder::{CachingFinder, FinderResult, NotFoundHandling};
pub use lazy::{LazyEntity, LazyToken};
pub use manager::{
    SessionManager, SessionScope, TransactionalSessionManager, TransactionalSessionScope,
};
pub use observer::{
    NullSessionObserver, SessionObserver, TracingSessionObserver, WriterSessionObserver,
};
pub use query_cache::SessionQueryCache;
pub use session::{Session, SessionStats};
