//! STRATA Data - Query Identity and Collaborator Contracts
//!
//! The value types that tie query execution to the session cache, plus the
//! narrow contracts the cache consumes from its data-access collaborators.
//!
//! # Key Types
//!
//! - [`CacheKey`]: canonical, totally-ordered identity of a parameterized
//!   query; equal keys mean "the same query with the same arguments".
//! - [`ParamValue`]: the closed set of parameter values a key can carry.
//! - [`QueryResult`]: the discriminated outcome of a cache-aware query -
//!   either "read the session cache for this key" or "here is fresh data".
//! - [`QueryCache`]: the probe data connectors use to decide between the two.
//!
//! # Collaborator Contracts
//!
//! The transaction seam ([`Transaction`], [`TransactionManager`]) is consumed
//! by the transactional session manager; [`NullTransaction`] and
//! [`NonTransactionalTransactionManager`] are the provided no-op
//! implementations for non-transactional flows.

pub mod cache_key;
pub mod param;
pub mod query_cache;
pub mod query_result;
pub mod transaction;

pub use cache_key::CacheKey;
pub use param::ParamValue;
pub use query_cache::QueryCache;
pub use query_result::QueryResult;
pub use transaction::{
    EnlistmentOption, EnlistmentOptions, IsolationLevel, NonTransactionalTransactionManager,
    NullTransaction, Transaction, TransactionManager,
};
