//! The session-scoped identity-map cache.

use std::any::Any;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;
use std::sync::Arc;

use strata_core::{CachedEntity, EntityHandle, EntityId, SessionError, SessionResult};
use strata_data::CacheKey;
use uuid::Uuid;

use crate::lazy::{LazyEntity, LazyToken};
use crate::observer::SessionObserver;

/// Counts of what a session currently tracks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Entities in the identity map.
    pub tracked_entities: usize,
    /// Cache keys with a found-set.
    pub cache_keys: usize,
    /// Registered, not-yet-materialized lazy references.
    pub lazy_handles: usize,
}

/// One logical unit of work's cache state.
///
/// Three maps hold the state:
///
/// - found-set per cache key: the entities a query answered with, so the
///   same query can be answered from memory next time
/// - identifier per entity: the identity map proper
/// - identifier per lazy token: identifiers for references that have not
///   materialized yet
///
/// Every operation validates fully before mutating, so an error leaves the
/// maps untouched. The session is a single-logical-thread type (`RefCell`
/// inside, not `Sync`); create it through a [`crate::SessionManager`], which
/// also handles teardown.
pub struct Session {
    session_id: Uuid,
    observer: Rc<dyn SessionObserver>,
    state: RefCell<SessionState>,
}

#[derive(Default)]
struct SessionState {
    found_by_key: BTreeMap<CacheKey, Vec<EntityHandle>>,
    id_by_entity: HashMap<EntityHandle, EntityId>,
    id_by_lazy: HashMap<LazyToken, EntityId>,
}

impl Session {
    /// A brand-new session with a fresh random session ID.
    pub(crate) fn new(observer: Rc<dyn SessionObserver>) -> Self {
        Self {
            session_id: Uuid::now_v7(),
            observer,
            state: RefCell::new(SessionState::default()),
        }
    }

    /// The session's ID. Regenerated only when a brand-new session is
    /// created, never on nested enrollment.
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Counts of the session's current contents.
    pub fn stats(&self) -> SessionStats {
        let state = self.state.borrow();
        SessionStats {
            tracked_entities: state.id_by_entity.len(),
            cache_keys: state.found_by_key.len(),
            lazy_handles: state.id_by_lazy.len(),
        }
    }

    // ========================================================================
    // RECORDING
    // ========================================================================

    /// Caches a persisted entity.
    ///
    /// Idempotent for a matching identifier; re-registering the same entity
    /// under a different identifier is an identity conflict.
    pub fn entity_was_persisted(&self, cache_entity: CachedEntity) -> SessionResult<()> {
        {
            let mut state = self.state.borrow_mut();

            if let Some(&cached_id) = state.id_by_entity.get(cache_entity.handle()) {
                if cached_id != cache_entity.id() {
                    return Err(SessionError::IdentityConflict {
                        cached_id,
                        incoming_id: cache_entity.id(),
                    });
                }
            }

            state
                .id_by_entity
                .insert(cache_entity.handle().clone(), cache_entity.id());
        }

        self.observer
            .entity_persisted(self.session_id, cache_entity.type_name(), cache_entity.id());

        Ok(())
    }

    /// Caches a single found entity under a cache key.
    pub fn entity_was_found(
        &self,
        cache_key: CacheKey,
        cache_entity: CachedEntity,
    ) -> SessionResult<()> {
        self.entities_were_found(cache_key, vec![cache_entity])
    }

    /// Caches a found-batch under a cache key, replacing any previous batch
    /// for that key.
    ///
    /// The batch must be shape-valid: one concrete entity type, no repeated
    /// entity reference, and no member already tracked under a different
    /// identifier. An empty batch is legal and caches "this query answered
    /// with nothing".
    pub fn entities_were_found(
        &self,
        cache_key: CacheKey,
        cache_entities: Vec<CachedEntity>,
    ) -> SessionResult<()> {
        {
            let mut state = self.state.borrow_mut();

            for cache_entity in &cache_entities {
                if let Some(&cached_id) = state.id_by_entity.get(cache_entity.handle()) {
                    if cached_id != cache_entity.id() {
                        return Err(SessionError::IdentityConflict {
                            cached_id,
                            incoming_id: cache_entity.id(),
                        });
                    }
                }
            }

            if let Some(first) = cache_entities.first() {
                let batch_type = first.handle().entity_type();
                if let Some(other) = cache_entities
                    .iter()
                    .find(|entity| entity.handle().entity_type() != batch_type)
                {
                    return Err(SessionError::MixedEntityTypes {
                        first: first.type_name(),
                        second: other.type_name(),
                    });
                }
            }

            let mut seen = HashSet::with_capacity(cache_entities.len());
            for cache_entity in &cache_entities {
                if !seen.insert(cache_entity.handle().clone()) {
                    return Err(SessionError::DuplicateEntityInBatch {
                        entity_type: cache_entity.type_name(),
                    });
                }
            }

            state.found_by_key.insert(
                cache_key,
                cache_entities
                    .iter()
                    .map(|entity| entity.handle().clone())
                    .collect(),
            );
            for cache_entity in &cache_entities {
                state
                    .id_by_entity
                    .insert(cache_entity.handle().clone(), cache_entity.id());
            }
        }

        for cache_entity in &cache_entities {
            self.observer
                .entity_found(self.session_id, cache_entity.type_name(), cache_entity.id());
        }

        Ok(())
    }

    /// Notifies the cache that a lazy entity was created.
    pub fn lazy_entity_was_created<T>(
        &self,
        lazy_entity: &LazyEntity<T>,
        entity_id: EntityId,
    ) -> SessionResult<()> {
        let mut state = self.state.borrow_mut();

        if state.id_by_lazy.contains_key(&lazy_entity.token()) {
            return Err(SessionError::LazyEntityAlreadyCached);
        }

        state.id_by_lazy.insert(lazy_entity.token(), entity_id);

        Ok(())
    }

    // ========================================================================
    // REMOVAL
    // ========================================================================

    /// Removes an entity from the cache. The entity must be tracked.
    pub fn remove_entity(&self, entity: &EntityHandle) -> SessionResult<()> {
        self.remove_entities(std::slice::from_ref(entity))
    }

    /// Removes the entity tracked under `entity_id`, if any. Unlike removal
    /// by reference, an unknown identifier is a no-op.
    pub fn remove_entity_by_id(&self, entity_id: EntityId) -> SessionResult<()> {
        let matching: Vec<EntityHandle> = self
            .state
            .borrow()
            .id_by_entity
            .iter()
            .filter(|(_, &id)| id == entity_id)
            .map(|(handle, _)| handle.clone())
            .collect();

        if matching.is_empty() {
            return Ok(());
        }

        self.remove_entities(&matching)
    }

    /// Removes entities from the cache, cascading over found-batches.
    ///
    /// Every cache key whose found-set intersects the removal set is dropped
    /// whole: its entire batch leaves both the found-set map and the
    /// identity map, not just the intersecting members. A query result is
    /// only trustworthy as a unit, so invalidating one member invalidates
    /// what the query answered.
    pub fn remove_entities(&self, entities: &[EntityHandle]) -> SessionResult<()> {
        let removed = {
            let mut state = self.state.borrow_mut();

            if entities
                .iter()
                .any(|entity| !state.id_by_entity.contains_key(entity))
            {
                return Err(SessionError::EntityNotCachedForRemoval);
            }

            let removal_set: HashSet<&EntityHandle> = entities.iter().collect();
            let affected_keys: Vec<CacheKey> = state
                .found_by_key
                .iter()
                .filter(|(_, found)| found.iter().any(|handle| removal_set.contains(handle)))
                .map(|(key, _)| key.clone())
                .collect();

            // Union of the requested entities and every batch member swept
            // in through an affected key.
            let mut to_remove: Vec<EntityHandle> = Vec::new();
            let mut seen: HashSet<EntityHandle> = HashSet::new();
            for key in &affected_keys {
                if let Some(found) = state.found_by_key.get(key) {
                    for handle in found {
                        if seen.insert(handle.clone()) {
                            to_remove.push(handle.clone());
                        }
                    }
                }
            }
            for entity in entities {
                if seen.insert(entity.clone()) {
                    to_remove.push(entity.clone());
                }
            }

            for key in &affected_keys {
                state.found_by_key.remove(key);
            }

            let mut removed: Vec<(EntityHandle, EntityId)> = Vec::new();
            for handle in to_remove {
                if let Some(id) = state.id_by_entity.remove(&handle) {
                    removed.push((handle, id));
                }
            }
            removed
        };

        for (handle, id) in removed {
            self.observer
                .entity_removed(self.session_id, handle.type_name(), id);
        }

        Ok(())
    }

    /// Removes every entity of type `T` from the cache, along with every
    /// cache key whose found-set contains one.
    pub fn clear_type<T: Any>(&self) {
        self.clear_type_id(std::any::TypeId::of::<T>());
    }

    /// Removes every entity of the given type from the cache.
    pub fn clear_type_id(&self, entity_type: std::any::TypeId) {
        let dropped = {
            let mut state = self.state.borrow_mut();

            let affected_keys: Vec<CacheKey> = state
                .found_by_key
                .iter()
                .filter(|(_, found)| {
                    found
                        .iter()
                        .any(|handle| handle.entity_type() == entity_type)
                })
                .map(|(key, _)| key.clone())
                .collect();
            for key in &affected_keys {
                state.found_by_key.remove(key);
            }

            let dropped: Vec<(EntityHandle, EntityId)> = state
                .id_by_entity
                .iter()
                .filter(|(handle, _)| handle.entity_type() == entity_type)
                .map(|(handle, &id)| (handle.clone(), id))
                .collect();
            for (handle, _) in &dropped {
                state.id_by_entity.remove(handle);
            }
            dropped
        };

        for (handle, id) in dropped {
            self.observer
                .entity_removed(self.session_id, handle.type_name(), id);
        }
    }

    /// Removes all entities from the cache, notifying the observer for each
    /// tracked entity.
    pub fn clear_all(&self) {
        let removed = {
            let mut state = self.state.borrow_mut();
            let removed: Vec<(EntityHandle, EntityId)> = state.id_by_entity.drain().collect();
            state.found_by_key.clear();
            state.id_by_lazy.clear();
            removed
        };

        for (handle, id) in removed {
            self.observer
                .entity_removed(self.session_id, handle.type_name(), id);
        }
    }

    // ========================================================================
    // LOOKUP
    // ========================================================================

    /// Retrieves a cached entity's ID; fails when the entity is not tracked.
    pub fn entity_id(&self, entity: &EntityHandle) -> SessionResult<EntityId> {
        self.state
            .borrow()
            .id_by_entity
            .get(entity)
            .copied()
            .ok_or(SessionError::EntityNotCached)
    }

    /// Retrieves a cached entity's ID, or `default_id` when the entity is
    /// not tracked.
    pub fn entity_id_or(&self, entity: &EntityHandle, default_id: EntityId) -> EntityId {
        self.state
            .borrow()
            .id_by_entity
            .get(entity)
            .copied()
            .unwrap_or(default_id)
    }

    /// Retrieves the ID of a lazy-loaded entity.
    ///
    /// Once the lazy reference has materialized, identity follows the
    /// realized entity: the lookup goes through the identity map and fails
    /// if the realized entity was never separately registered. Before
    /// materialization, the lookup goes through the lazy-token map.
    pub fn lazy_entity_id<T: Any + Send + Sync>(
        &self,
        lazy_entity: &LazyEntity<T>,
    ) -> SessionResult<EntityId> {
        if let Some(entity) = lazy_entity.materialized() {
            let handle = EntityHandle::new(Arc::clone(entity));
            return self
                .state
                .borrow()
                .id_by_entity
                .get(&handle)
                .copied()
                .ok_or(SessionError::EntityNotCached);
        }

        self.state
            .borrow()
            .id_by_lazy
            .get(&lazy_entity.token())
            .copied()
            .ok_or(SessionError::LazyEntityNotCached)
    }

    /// Retrieves the single entity cached under a key, or `None` when the
    /// key has no cached entities. More than one entity is an error.
    pub fn entity(&self, cache_key: &CacheKey) -> SessionResult<Option<CachedEntity>> {
        let mut cache_entities = self.entities(cache_key);

        if cache_entities.len() > 1 {
            return Err(SessionError::AmbiguousCacheKey {
                count: cache_entities.len(),
            });
        }

        Ok(cache_entities.pop())
    }

    /// Retrieves the entities cached under a key.
    ///
    /// The found-set is joined against the identity map: a batch member that
    /// has since been removed from the identity map is silently excluded.
    /// The join, not the found-set, is the source of truth.
    pub fn entities(&self, cache_key: &CacheKey) -> Vec<CachedEntity> {
        let state = self.state.borrow();

        match state.found_by_key.get(cache_key) {
            Some(found) => found
                .iter()
                .filter_map(|handle| {
                    state
                        .id_by_entity
                        .get(handle)
                        .map(|&id| CachedEntity::new(handle.clone(), id))
                })
                .collect(),
            None => Vec::new(),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        f.debug_struct("Session")
            .field("session_id", &self.session_id)
            .field("stats", &stats)
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
