//! Session enrollment and ambient scoping.
//!
//! The "current session" lives in an explicit, `Rc`-shared ambient slot
//! owned by the [`SessionManager`] rather than in thread-affine storage.
//! Clones of a manager share one slot, so the
//! collaborators of a logical flow (finders, repositories, connectors) all
//! see the same ambient session, while independent flows construct
//! independent managers. The manager is not `Send`/`Sync`, which keeps the
//! slot context-local by construction.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::ops::Deref;
use std::rc::Rc;

use strata_core::{CachedEntity, EntityHandle, EntityId, SessionError, SessionResult};
use strata_data::{CacheKey, EnlistmentOptions, Transaction, TransactionManager};

use crate::lazy::LazyEntity;
use crate::observer::{NullSessionObserver, SessionObserver};
use crate::session::Session;

struct AmbientSlot {
    session: Rc<Session>,
    depth: usize,
}

/// Enrolls callers into an ambient session and forwards cache operations to
/// it.
///
/// The first [`SessionManager::enroll`] creates the session; nested
/// enrollments on the same manager (or a clone) reuse it and only bump the
/// scope depth. Every forwarded operation fails with
/// [`SessionError::NoSessionContext`] outside an enrollment.
#[derive(Clone, Default)]
pub struct SessionManager {
    slot: Rc<RefCell<Option<AmbientSlot>>>,
}

impl SessionManager {
    /// A manager with an empty ambient slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enrolls in a session. An existing session context is reused if there
    /// is one; otherwise, a new session context is created with the no-op
    /// observer.
    pub fn enroll(&self) -> SessionScope {
        self.enroll_with(None)
    }

    /// Enrolls in a session. An existing session context is reused if there
    /// is one (in which case `observer` is ignored - the session keeps the
    /// observer it was created with); otherwise, a new session context is
    /// created and wired to `observer`.
    pub fn enroll_observed(&self, observer: Rc<dyn SessionObserver>) -> SessionScope {
        self.enroll_with(Some(observer))
    }

    fn enroll_with(&self, observer: Option<Rc<dyn SessionObserver>>) -> SessionScope {
        let mut slot = self.slot.borrow_mut();

        let session = match slot.as_mut() {
            Some(ambient) => {
                ambient.depth += 1;
                Rc::clone(&ambient.session)
            }
            None => {
                let observer = observer.unwrap_or_else(|| Rc::new(NullSessionObserver));
                let session = Rc::new(Session::new(observer));
                *slot = Some(AmbientSlot {
                    session: Rc::clone(&session),
                    depth: 1,
                });
                session
            }
        };

        SessionScope {
            slot: Rc::clone(&self.slot),
            session,
        }
    }

    /// True when a session context is active.
    pub fn has_session(&self) -> bool {
        self.slot.borrow().is_some()
    }

    /// The current session context, or the no-session error.
    pub fn current(&self) -> SessionResult<Rc<Session>> {
        self.slot
            .borrow()
            .as_ref()
            .map(|ambient| Rc::clone(&ambient.session))
            .ok_or(SessionError::NoSessionContext)
    }

    // ========================================================================
    // FORWARDED CACHE OPERATIONS
    // ========================================================================

    /// Notifies the current session cache that an entity was persisted.
    pub fn entity_was_persisted(&self, cache_entity: CachedEntity) -> SessionResult<()> {
        self.current()?.entity_was_persisted(cache_entity)
    }

    /// Notifies the current session cache that an entity was found.
    pub fn entity_was_found(
        &self,
        cache_key: CacheKey,
        cache_entity: CachedEntity,
    ) -> SessionResult<()> {
        self.current()?.entity_was_found(cache_key, cache_entity)
    }

    /// Notifies the current session cache that multiple entities were found.
    pub fn entities_were_found(
        &self,
        cache_key: CacheKey,
        cache_entities: Vec<CachedEntity>,
    ) -> SessionResult<()> {
        self.current()?
            .entities_were_found(cache_key, cache_entities)
    }

    /// Notifies the current session cache that a lazy entity was created.
    pub fn lazy_entity_was_created<T>(
        &self,
        lazy_entity: &LazyEntity<T>,
        entity_id: EntityId,
    ) -> SessionResult<()> {
        self.current()?
            .lazy_entity_was_created(lazy_entity, entity_id)
    }

    /// Instructs the current session cache to remove an entity.
    pub fn remove_entity(&self, entity: &EntityHandle) -> SessionResult<()> {
        self.current()?.remove_entity(entity)
    }

    /// Instructs the current session cache to remove the entity tracked
    /// under `entity_id`, if any.
    pub fn remove_entity_by_id(&self, entity_id: EntityId) -> SessionResult<()> {
        self.current()?.remove_entity_by_id(entity_id)
    }

    /// Instructs the current session cache to remove entities.
    pub fn remove_entities(&self, entities: &[EntityHandle]) -> SessionResult<()> {
        self.current()?.remove_entities(entities)
    }

    /// Retrieves a cached entity's ID from the current session cache.
    pub fn entity_id(&self, entity: &EntityHandle) -> SessionResult<EntityId> {
        self.current()?.entity_id(entity)
    }

    /// Retrieves a cached entity's ID from the current session cache, or
    /// `default_id` when the entity is not tracked.
    pub fn entity_id_or(
        &self,
        entity: &EntityHandle,
        default_id: EntityId,
    ) -> SessionResult<EntityId> {
        Ok(self.current()?.entity_id_or(entity, default_id))
    }

    /// Retrieves the ID of a lazy-loaded entity from the current session
    /// cache.
    pub fn lazy_entity_id<T: Any + Send + Sync>(
        &self,
        lazy_entity: &LazyEntity<T>,
    ) -> SessionResult<EntityId> {
        self.current()?.lazy_entity_id(lazy_entity)
    }

    /// Retrieves the single entity cached under a key from the current
    /// session cache.
    pub fn entity(&self, cache_key: &CacheKey) -> SessionResult<Option<CachedEntity>> {
        self.current()?.entity(cache_key)
    }

    /// Retrieves the entities cached under a key from the current session
    /// cache.
    pub fn entities(&self, cache_key: &CacheKey) -> SessionResult<Vec<CachedEntity>> {
        Ok(self.current()?.entities(cache_key))
    }

    /// Removes every entity of type `T` from the current session cache.
    pub fn clear_type<T: Any>(&self) -> SessionResult<()> {
        self.current()?.clear_type::<T>();
        Ok(())
    }

    /// Removes every entity of the given type from the current session
    /// cache.
    pub fn clear_type_id(&self, entity_type: TypeId) -> SessionResult<()> {
        self.current()?.clear_type_id(entity_type);
        Ok(())
    }

    /// Removes all entities from the current session cache.
    pub fn clear_all(&self) -> SessionResult<()> {
        self.current()?.clear_all();
        Ok(())
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("has_session", &self.has_session())
            .finish()
    }
}

/// A scope guard over an enrollment.
///
/// Dereferences to the underlying [`Session`]. Dropping a nested scope only
/// decrements the depth; dropping the outermost scope clears the session
/// (with its removal notifications) and empties the ambient slot.
pub struct SessionScope {
    slot: Rc<RefCell<Option<AmbientSlot>>>,
    session: Rc<Session>,
}

impl SessionScope {
    /// The enrolled session.
    pub fn session(&self) -> &Session {
        &self.session
    }
}

impl Deref for SessionScope {
    type Target = Session;

    fn deref(&self) -> &Session {
        &self.session
    }
}

impl Drop for SessionScope {
    fn drop(&mut self) {
        let teardown = {
            let mut slot = self.slot.borrow_mut();
            match slot.as_mut() {
                Some(ambient) if ambient.depth > 1 => {
                    ambient.depth -= 1;
                    None
                }
                Some(_) => slot.take().map(|ambient| ambient.session),
                None => None,
            }
        };

        if let Some(session) = teardown {
            session.clear_all();
        }
    }
}

impl std::fmt::Debug for SessionScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionScope")
            .field("session", &*self.session)
            .finish()
    }
}

// =============================================================================
// TRANSACTIONAL VARIANT
// =============================================================================

/// A session manager that couples every enrollment with transaction
/// enlistment.
///
/// Each enrollment - nested ones included - enlists its own transaction
/// through the injected [`TransactionManager`] (ambient-or-new, so nested
/// enlistments join the outer transaction when the underlying manager
/// supports ambient transactions). Committing the scope commits its
/// transaction; dropping it without committing rolls back.
pub struct TransactionalSessionManager {
    manager: SessionManager,
    transaction_manager: Rc<dyn TransactionManager>,
}

impl TransactionalSessionManager {
    /// A transactional manager enlisting through `transaction_manager`.
    pub fn new(transaction_manager: Rc<dyn TransactionManager>) -> Self {
        Self {
            manager: SessionManager::new(),
            transaction_manager,
        }
    }

    /// Enrolls in a session and enlists a transaction.
    pub fn enroll(&self) -> TransactionalSessionScope {
        TransactionalSessionScope {
            scope: self.manager.enroll(),
            transaction: Some(self.transaction_manager.enlist(EnlistmentOptions::new())),
        }
    }

    /// Enrolls in a session with an observer and enlists a transaction.
    pub fn enroll_observed(&self, observer: Rc<dyn SessionObserver>) -> TransactionalSessionScope {
        TransactionalSessionScope {
            scope: self.manager.enroll_observed(observer),
            transaction: Some(self.transaction_manager.enlist(EnlistmentOptions::new())),
        }
    }
}

impl Deref for TransactionalSessionManager {
    type Target = SessionManager;

    fn deref(&self) -> &SessionManager {
        &self.manager
    }
}

/// A transactional enrollment scope.
///
/// Dereferences to the underlying [`Session`]. Call
/// [`TransactionalSessionScope::commit`] to commit the enlisted transaction;
/// dropping the scope without committing rolls it back.
pub struct TransactionalSessionScope {
    scope: SessionScope,
    transaction: Option<Box<dyn Transaction>>,
}

impl TransactionalSessionScope {
    /// Commits the enlisted transaction and ends the scope.
    pub fn commit(mut self) {
        if let Some(transaction) = self.transaction.take() {
            transaction.commit();
        }
    }

    /// The enrolled session.
    pub fn session(&self) -> &Session {
        self.scope.session()
    }
}

impl Deref for TransactionalSessionScope {
    type Target = Session;

    fn deref(&self) -> &Session {
        self.scope.session()
    }
}
