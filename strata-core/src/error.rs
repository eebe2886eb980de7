//! Error types for STRATA operations

use thiserror::Error;

use crate::identity::EntityId;

/// Session cache errors.
///
/// Every variant is a programming-contract violation rather than a
/// recoverable runtime condition: the cache has no repair path for
/// inconsistent state, so callers are expected to prevent the condition or
/// let the error propagate to the application boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Entity has a different ID than the same entity in the cache: cached {cached_id}, incoming {incoming_id}")]
    IdentityConflict {
        cached_id: EntityId,
        incoming_id: EntityId,
    },

    #[error("Cannot cache more than one type of entity per cache key: {first} and {second}")]
    MixedEntityTypes {
        first: &'static str,
        second: &'static str,
    },

    #[error("Cannot cache the same entity more than once: {entity_type}")]
    DuplicateEntityInBatch { entity_type: &'static str },

    #[error("Cannot cache a lazy entity more than once")]
    LazyEntityAlreadyCached,

    #[error("At least one entity was not cached before being removed")]
    EntityNotCachedForRemoval,

    #[error("Entity is not cached")]
    EntityNotCached,

    #[error("Lazy entity is not cached")]
    LazyEntityNotCached,

    #[error("There is more than one entity associated with the cache key: {count}")]
    AmbiguousCacheKey { count: usize },

    #[error("No session context found")]
    NoSessionContext,
}

/// Result type alias for session cache operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Finder layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FinderError {
    #[error("{entity_type} not found")]
    EntityNotFound { entity_type: &'static str },

    #[error("Cached entity has an unexpected type: expected {expected}, found {found}")]
    UnexpectedEntityType {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// Master error type for all STRATA errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StrataError {
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Finder error: {0}")]
    Finder(#[from] FinderError),
}

/// Result type alias for STRATA operations.
pub type StrataResult<T> = Result<T, StrataError>;

// =============================================================================
// TESTS
// =============================================================================
