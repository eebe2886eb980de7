//! Cache entity types and the type-erased entity handle.
//!
//! The session cache tracks entities of arbitrary concrete types inside the
//! same maps. [`EntityHandle`] is the erased representation used as the map
//! key: it pairs a shared `dyn Any` reference with the concrete `TypeId` so
//! the session can compare identities without knowing the entity type.
//!
//! # Identity semantics
//!
//! Handle equality is *pointer* identity, not value equality. Two handles are
//! equal iff they wrap the same allocation, which is what "the same in-memory
//! representation of a persisted entity" means for an identity map. Cloning
//! an `Arc` and wrapping both clones yields equal handles; two structurally
//! identical entities in separate allocations yield distinct handles.

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::identity::EntityId;

/// A type-erased shared reference to a cached entity.
///
/// Compares and hashes by pointer identity so it can key the session's
/// identity map. The concrete `TypeId` and type name are captured at
/// construction for type-based cache clearing and diagnostics.
#[derive(Clone)]
pub struct EntityHandle {
    entity: Arc<dyn Any + Send + Sync>,
    type_id: TypeId,
    type_name: &'static str,
}

impl EntityHandle {
    /// Erase a concrete entity reference into a handle.
    pub fn new<T: Any + Send + Sync>(entity: Arc<T>) -> Self {
        Self {
            entity,
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        }
    }

    /// The concrete type of the wrapped entity.
    pub fn entity_type(&self) -> TypeId {
        self.type_id
    }

    /// The concrete type's name, for diagnostics and observer events.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns true if the wrapped entity is a `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Recover the concrete entity reference, or `None` on a type mismatch.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.entity).downcast::<T>().ok()
    }

    /// Address of the wrapped allocation; the basis for identity.
    fn addr(&self) -> usize {
        Arc::as_ptr(&self.entity) as *const () as usize
    }
}

impl PartialEq for EntityHandle {
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl Eq for EntityHandle {}

impl Hash for EntityHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl fmt::Debug for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityHandle")
            .field("type_name", &self.type_name)
            .field("addr", &(self.addr() as *const ()))
            .finish()
    }
}

/// Pairs an entity with its ID to uniquely identify an entity in a cache.
pub struct CacheEntity<T> {
    entity: Arc<T>,
    id: EntityId,
}

impl<T: Any + Send + Sync> CacheEntity<T> {
    /// Pair an entity with its ID.
    pub fn new(entity: Arc<T>, id: EntityId) -> Self {
        Self { entity, id }
    }

    /// The cached entity.
    pub fn entity(&self) -> &Arc<T> {
        &self.entity
    }

    /// The cached entity's ID.
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Widen to the erased form stored inside the session's maps.
    ///
    /// This is the explicit counterpart of storing a typed entity in the
    /// untyped identity map; recover the typed view with
    /// [`CachedEntity::downcast`].
    pub fn erase(&self) -> CachedEntity {
        CachedEntity {
            handle: EntityHandle::new(Arc::clone(&self.entity)),
            id: self.id,
        }
    }
}

impl<T> Clone for CacheEntity<T> {
    fn clone(&self) -> Self {
        Self {
            entity: Arc::clone(&self.entity),
            id: self.id,
        }
    }
}

impl<T> fmt::Debug for CacheEntity<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntity")
            .field("entity_type", &type_name::<T>())
            .field("id", &self.id)
            .finish()
    }
}

impl<T: Any + Send + Sync> From<CacheEntity<T>> for CachedEntity {
    fn from(cache_entity: CacheEntity<T>) -> Self {
        cache_entity.erase()
    }
}

/// The erased entity/ID pair the session stores and returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedEntity {
    handle: EntityHandle,
    id: EntityId,
}

impl CachedEntity {
    /// Pair an erased entity handle with its ID.
    pub fn new(handle: EntityHandle, id: EntityId) -> Self {
        Self { handle, id }
    }

    /// The erased entity handle.
    pub fn handle(&self) -> &EntityHandle {
        &self.handle
    }

    /// The cached entity's ID.
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// The concrete type name of the underlying entity.
    pub fn type_name(&self) -> &'static str {
        self.handle.type_name()
    }

    /// Recover the typed view, or `None` if the underlying entity is not a
    /// `T`. Callers that cached a batch under a known type may rely on the
    /// recorded batch type instead of re-checking every member.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<CacheEntity<T>> {
        self.handle
            .downcast::<T>()
            .map(|entity| CacheEntity::new(entity, self.id))
    }
}
