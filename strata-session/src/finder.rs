//! The cache-hit/fresh-data branch shared by caching finders.
//!
//! A finder runs a query through a data connector and gets back a
//! [`QueryResult`]: either "the session already answered this key" or fresh
//! row data. [`CachingFinder`] implements the branch once - finders supply
//! only [`CachingFinder::hydrate`], the conversion from row data to a typed
//! entity.

use std::any::{type_name, Any};
use std::sync::Arc;

use strata_core::{CacheEntity, EntityId, FinderError};
use strata_data::QueryResult;

use crate::lazy::LazyEntity;
use crate::manager::SessionManager;

/// Result type alias for finder operations.
pub type FinderResult<T> = Result<T, FinderError>;

/// Indicates how to handle when entity data is not found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotFoundHandling {
    /// An error should be raised when entity data is not found.
    #[default]
    Error,
    /// `None` should be returned when entity data is not found.
    ReturnNone,
}

fn when_not_found<T>(
    not_found: NotFoundHandling,
    entity_type: &'static str,
) -> FinderResult<Option<T>> {
    match not_found {
        NotFoundHandling::Error => Err(FinderError::EntityNotFound { entity_type }),
        NotFoundHandling::ReturnNone => Ok(None),
    }
}

/// Finds entities and caches found entities.
pub trait CachingFinder {
    /// The entity type this finder produces.
    type Entity: Any + Send + Sync;
    /// The row data the connector returns.
    type Data;

    /// The session cache this finder registers entities with.
    fn session(&self) -> &SessionManager;

    /// Converts row data into an entity paired with its ID.
    fn hydrate(&self, data: Self::Data) -> CacheEntity<Self::Entity>;

    /// Processes a single-entity query result.
    ///
    /// A cache hit reads the entity back from the session under the carried
    /// key; fresh data is hydrated and registered under the key before being
    /// returned.
    fn resolve_entity(
        &self,
        query_result: QueryResult<Self::Data>,
        not_found: NotFoundHandling,
    ) -> FinderResult<Option<CacheEntity<Self::Entity>>> {
        match query_result {
            QueryResult::Cached { key } => match self.session().entity(&key)? {
                Some(cached) => {
                    let typed = cached.downcast::<Self::Entity>().ok_or_else(|| {
                        FinderError::UnexpectedEntityType {
                            expected: type_name::<Self::Entity>(),
                            found: cached.type_name(),
                        }
                    })?;
                    Ok(Some(typed))
                }
                None => when_not_found(not_found, type_name::<Self::Entity>()),
            },
            QueryResult::Fresh { key, result } => match result {
                Some(data) => {
                    let cache_entity = self.hydrate(data);
                    self.session().entity_was_found(key, cache_entity.erase())?;
                    Ok(Some(cache_entity))
                }
                None => when_not_found(not_found, type_name::<Self::Entity>()),
            },
        }
    }

    /// Processes a multi-entity query result.
    ///
    /// Fresh rows are hydrated and registered as one found-batch (an empty
    /// row set registers an empty batch, caching "this query answered with
    /// nothing").
    fn resolve_entities(
        &self,
        query_result: QueryResult<Vec<Self::Data>>,
    ) -> FinderResult<Vec<CacheEntity<Self::Entity>>> {
        match query_result {
            QueryResult::Cached { key } => self
                .session()
                .entities(&key)?
                .into_iter()
                .map(|cached| {
                    cached.downcast::<Self::Entity>().ok_or_else(|| {
                        FinderError::UnexpectedEntityType {
                            expected: type_name::<Self::Entity>(),
                            found: cached.type_name(),
                        }
                    })
                })
                .collect(),
            QueryResult::Fresh { key, result } => {
                let cache_entities: Vec<CacheEntity<Self::Entity>> = result
                    .unwrap_or_default()
                    .into_iter()
                    .map(|data| self.hydrate(data))
                    .collect();

                self.session().entities_were_found(
                    key,
                    cache_entities.iter().map(CacheEntity::erase).collect(),
                )?;

                Ok(cache_entities)
            }
        }
    }

    /// Creates a lazy entity retrieved by its ID and registers it with the
    /// session.
    fn lazy_by_id(
        &self,
        entity_id: EntityId,
        loader: impl Fn(EntityId) -> Arc<Self::Entity> + 'static,
    ) -> FinderResult<LazyEntity<Self::Entity>>
    where
        Self: Sized,
    {
        let lazy_entity = LazyEntity::by_id(entity_id, loader);
        self.session().lazy_entity_was_created(&lazy_entity, entity_id)?;
        Ok(lazy_entity)
    }
}
