//! End-to-end session scenarios over the public API.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use strata_core::{new_entity_id, CacheEntity, CachedEntity, EntityHandle, EntityId, SessionError};
use strata_data::{CacheKey, ParamValue, QueryCache, QueryResult};
use strata_session::{
    CachingFinder, LazyEntity, NotFoundHandling, SessionManager, SessionObserver,
    SessionQueryCache,
};
use uuid::Uuid;

#[derive(Debug)]
struct Account;

#[derive(Debug)]
struct Order;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventKind {
    Persisted,
    Found,
    Removed,
}

#[derive(Debug, Clone)]
struct Event {
    kind: EventKind,
    entity_type: &'static str,
    entity_id: EntityId,
    session_id: Uuid,
}

#[derive(Default)]
struct RecordingObserver {
    events: RefCell<Vec<Event>>,
}

impl RecordingObserver {
    fn record(&self, kind: EventKind, session_id: Uuid, entity_type: &'static str, id: EntityId) {
        self.events.borrow_mut().push(Event {
            kind,
            entity_type,
            entity_id: id,
            session_id,
        });
    }

    fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    fn events_of(&self, kind: EventKind) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|event| event.kind == kind)
            .collect()
    }
}

impl SessionObserver for RecordingObserver {
    fn entity_persisted(&self, session_id: Uuid, entity_type: &'static str, entity_id: EntityId) {
        self.record(EventKind::Persisted, session_id, entity_type, entity_id);
    }

    fn entity_found(&self, session_id: Uuid, entity_type: &'static str, entity_id: EntityId) {
        self.record(EventKind::Found, session_id, entity_type, entity_id);
    }

    fn entity_removed(&self, session_id: Uuid, entity_type: &'static str, entity_id: EntityId) {
        self.record(EventKind::Removed, session_id, entity_type, entity_id);
    }
}

fn cached(entity: &Arc<Account>, id: EntityId) -> CachedEntity {
    CacheEntity::new(Arc::clone(entity), id).erase()
}

#[test]
fn persisting_an_entity_notifies_the_observer() {
    let observer = Rc::new(RecordingObserver::default());
    let manager = SessionManager::new();
    let scope = manager.enroll_observed(Rc::clone(&observer) as Rc<dyn SessionObserver>);

    let account = Arc::new(Account);
    let id = new_entity_id();
    manager
        .entity_was_persisted(cached(&account, id))
        .expect("persist should succeed");

    let events = observer.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::Persisted);
    assert_eq!(events[0].entity_id, id);
    assert_eq!(events[0].session_id, scope.session_id());
    assert!(events[0].entity_type.contains("Account"));
}

#[test]
fn replacing_a_found_batch_notifies_once_per_entity_in_order() {
    let observer = Rc::new(RecordingObserver::default());
    let manager = SessionManager::new();
    let _scope = manager.enroll_observed(Rc::clone(&observer) as Rc<dyn SessionObserver>);

    let key = CacheKey::new("test");
    let ids: Vec<EntityId> = (0..4).map(|_| new_entity_id()).collect();

    manager
        .entities_were_found(
            key.clone(),
            vec![
                cached(&Arc::new(Account), ids[0]),
                cached(&Arc::new(Account), ids[1]),
            ],
        )
        .expect("first batch should succeed");
    manager
        .entities_were_found(
            key,
            vec![
                cached(&Arc::new(Account), ids[2]),
                cached(&Arc::new(Account), ids[3]),
            ],
        )
        .expect("replacement batch should succeed");

    let found: Vec<EntityId> = observer
        .events_of(EventKind::Found)
        .into_iter()
        .map(|event| event.entity_id)
        .collect();
    assert_eq!(found, ids);
}

#[test]
fn mixed_type_batch_is_rejected() {
    let manager = SessionManager::new();
    let _scope = manager.enroll();

    let result = manager.entities_were_found(
        CacheKey::new("test"),
        vec![
            CacheEntity::new(Arc::new(Account), new_entity_id()).erase(),
            CacheEntity::new(Arc::new(Order), new_entity_id()).erase(),
        ],
    );

    assert!(matches!(result, Err(SessionError::MixedEntityTypes { .. })));
}

#[test]
fn repeated_entity_in_batch_is_rejected() {
    let manager = SessionManager::new();
    let _scope = manager.enroll();
    let account = Arc::new(Account);

    let result = manager.entities_were_found(
        CacheKey::new("test"),
        vec![
            cached(&account, new_entity_id()),
            cached(&account, new_entity_id()),
        ],
    );

    assert!(matches!(
        result,
        Err(SessionError::DuplicateEntityInBatch { .. })
    ));
}

#[test]
fn found_after_persist_with_a_different_id_is_rejected() {
    let manager = SessionManager::new();
    let _scope = manager.enroll();
    let account = Arc::new(Account);

    manager
        .entity_was_persisted(cached(&account, new_entity_id()))
        .expect("persist should succeed");

    let result = manager.entity_was_found(
        CacheKey::new("test"),
        cached(&account, new_entity_id()),
    );
    assert!(matches!(result, Err(SessionError::IdentityConflict { .. })));
}

#[test]
fn removing_part_of_a_batch_removes_the_whole_batch() {
    let observer = Rc::new(RecordingObserver::default());
    let manager = SessionManager::new();
    let _scope = manager.enroll_observed(Rc::clone(&observer) as Rc<dyn SessionObserver>);

    let key = CacheKey::with_params("select", vec![("@Status", ParamValue::Int(1))]);
    let entities: Vec<Arc<Account>> = (0..5).map(|_| Arc::new(Account)).collect();
    manager
        .entities_were_found(
            key.clone(),
            entities
                .iter()
                .map(|entity| cached(entity, new_entity_id()))
                .collect(),
        )
        .expect("batch should succeed");

    let to_remove: Vec<EntityHandle> = entities
        .iter()
        .take(2)
        .map(|entity| EntityHandle::new(Arc::clone(entity)))
        .collect();
    manager
        .remove_entities(&to_remove)
        .expect("removal should succeed");

    assert!(manager.entities(&key).expect("lookup should succeed").is_empty());
    for entity in &entities {
        assert_eq!(
            manager.entity_id(&EntityHandle::new(Arc::clone(entity))),
            Err(SessionError::EntityNotCached)
        );
    }
    // One removal notification per swept entity, not just the two requested.
    assert_eq!(observer.events_of(EventKind::Removed).len(), 5);
}

#[test]
fn removal_by_id_is_tolerant_and_by_handle_is_strict() {
    let manager = SessionManager::new();
    let _scope = manager.enroll();

    manager
        .remove_entity_by_id(new_entity_id())
        .expect("unknown id should be a no-op");

    assert_eq!(
        manager.remove_entity(&EntityHandle::new(Arc::new(Account))),
        Err(SessionError::EntityNotCachedForRemoval)
    );
}

#[test]
fn clear_all_notifies_exactly_once_per_tracked_entity() {
    let observer = Rc::new(RecordingObserver::default());
    let manager = SessionManager::new();
    let scope = manager.enroll_observed(Rc::clone(&observer) as Rc<dyn SessionObserver>);

    let ids: Vec<EntityId> = (0..3).map(|_| new_entity_id()).collect();
    for &id in &ids {
        manager
            .entity_was_persisted(cached(&Arc::new(Account), id))
            .expect("persist should succeed");
    }
    let lazy = LazyEntity::new(|| Arc::new(Account));
    manager
        .lazy_entity_was_created(&lazy, new_entity_id())
        .expect("lazy registration should succeed");

    manager.clear_all().expect("clear should succeed");

    let mut removed: Vec<EntityId> = observer
        .events_of(EventKind::Removed)
        .into_iter()
        .map(|event| event.entity_id)
        .collect();
    let mut expected = ids.clone();
    removed.sort();
    expected.sort();
    assert_eq!(removed, expected);

    let stats = scope.stats();
    assert_eq!(stats.tracked_entities, 0);
    assert_eq!(stats.cache_keys, 0);
    assert_eq!(stats.lazy_handles, 0);
}

#[test]
fn clearing_a_type_leaves_other_types_untouched() {
    let manager = SessionManager::new();
    let _scope = manager.enroll();

    let account = Arc::new(Account);
    let order = Arc::new(Order);
    let order_id = new_entity_id();
    let account_key = CacheKey::new("accounts");
    let order_key = CacheKey::new("orders");

    manager
        .entity_was_found(account_key.clone(), cached(&account, new_entity_id()))
        .expect("found should succeed");
    manager
        .entity_was_found(
            order_key.clone(),
            CacheEntity::new(Arc::clone(&order), order_id).erase(),
        )
        .expect("found should succeed");

    manager
        .clear_type::<Account>()
        .expect("clear should succeed");

    assert!(manager
        .entities(&account_key)
        .expect("lookup should succeed")
        .is_empty());
    assert_eq!(
        manager.entity_id(&EntityHandle::new(order)),
        Ok(order_id)
    );
    assert_eq!(
        manager
            .entities(&order_key)
            .expect("lookup should succeed")
            .len(),
        1
    );
}

#[test]
fn nested_enrollment_shares_the_session_and_outer_drop_clears_it() {
    let manager = SessionManager::new();
    let account = Arc::new(Account);
    let id = new_entity_id();

    let outer = manager.enroll();
    outer
        .entity_was_persisted(cached(&account, id))
        .expect("persist should succeed");

    {
        let inner = manager.enroll();
        assert_eq!(
            inner.entity_id(&EntityHandle::new(Arc::clone(&account))),
            Ok(id)
        );
    }

    // Inner drop leaves the session intact.
    assert_eq!(
        manager.entity_id(&EntityHandle::new(Arc::clone(&account))),
        Ok(id)
    );

    drop(outer);

    assert!(!manager.has_session());
    assert_eq!(
        manager.entity_id(&EntityHandle::new(account)),
        Err(SessionError::NoSessionContext)
    );
}

#[test]
fn every_operation_fails_without_an_enrollment() {
    let manager = SessionManager::new();
    let handle = EntityHandle::new(Arc::new(Account));
    let key = CacheKey::new("sql");
    let lazy = LazyEntity::new(|| Arc::new(Account));

    assert_eq!(
        manager.entity_was_persisted(cached(&Arc::new(Account), new_entity_id())),
        Err(SessionError::NoSessionContext)
    );
    assert_eq!(
        manager.entity_was_found(key.clone(), cached(&Arc::new(Account), new_entity_id())),
        Err(SessionError::NoSessionContext)
    );
    assert_eq!(
        manager.entities_were_found(key.clone(), Vec::new()),
        Err(SessionError::NoSessionContext)
    );
    assert_eq!(
        manager.lazy_entity_was_created(&lazy, new_entity_id()),
        Err(SessionError::NoSessionContext)
    );
    assert_eq!(
        manager.remove_entity(&handle),
        Err(SessionError::NoSessionContext)
    );
    assert_eq!(
        manager.remove_entity_by_id(new_entity_id()),
        Err(SessionError::NoSessionContext)
    );
    assert_eq!(
        manager.remove_entities(std::slice::from_ref(&handle)),
        Err(SessionError::NoSessionContext)
    );
    assert_eq!(
        manager.entity_id(&handle),
        Err(SessionError::NoSessionContext)
    );
    assert_eq!(
        manager.entity_id_or(&handle, new_entity_id()),
        Err(SessionError::NoSessionContext)
    );
    assert_eq!(
        manager.lazy_entity_id(&lazy),
        Err(SessionError::NoSessionContext)
    );
    assert_eq!(manager.entity(&key), Err(SessionError::NoSessionContext));
    assert_eq!(manager.entities(&key), Err(SessionError::NoSessionContext));
    assert_eq!(
        manager.clear_type::<Account>(),
        Err(SessionError::NoSessionContext)
    );
    assert_eq!(manager.clear_all(), Err(SessionError::NoSessionContext));
}

#[test]
fn lazy_identifier_follows_materialization() {
    let manager = SessionManager::new();
    let _scope = manager.enroll();

    let account = Arc::new(Account);
    let realized = Arc::clone(&account);
    let lazy = LazyEntity::new(move || Arc::clone(&realized));
    let lazy_id = new_entity_id();
    let persisted_id = new_entity_id();

    manager
        .lazy_entity_was_created(&lazy, lazy_id)
        .expect("lazy registration should succeed");
    assert_eq!(manager.lazy_entity_id(&lazy), Ok(lazy_id));

    manager
        .entity_was_persisted(cached(&account, persisted_id))
        .expect("persist should succeed");

    lazy.get();

    assert_eq!(manager.lazy_entity_id(&lazy), Ok(persisted_id));
}

// ============================================================================
// FULL DATA FLOW
// ============================================================================

struct AccountRow {
    id: EntityId,
    name: &'static str,
}

#[derive(Debug)]
struct NamedAccount {
    #[allow(dead_code)]
    name: &'static str,
}

struct NamedAccountFinder {
    session: SessionManager,
}

impl CachingFinder for NamedAccountFinder {
    type Entity = NamedAccount;
    type Data = AccountRow;

    fn session(&self) -> &SessionManager {
        &self.session
    }

    fn hydrate(&self, data: AccountRow) -> CacheEntity<NamedAccount> {
        CacheEntity::new(Arc::new(NamedAccount { name: data.name }), data.id)
    }
}

/// The §2 data flow end to end: a connector probes the cache, answers with
/// fresh rows the first time and a cache marker the second time, and the
/// finder serves the identical instance on the repeat query.
#[test]
fn repeated_queries_are_answered_with_the_identical_instance() {
    let manager = SessionManager::new();
    let _scope = manager.enroll();
    let probe = SessionQueryCache::new(manager.clone());
    let finder = NamedAccountFinder {
        session: manager.clone(),
    };

    let key = CacheKey::with_params("select-by-name", vec![("@Name", "alice")]);
    let id = new_entity_id();

    // First execution: the connector sees an unknown key and loads rows.
    assert_eq!(probe.is_cached(&key), Ok(false));
    let first = finder
        .resolve_entity(
            QueryResult::fresh(key.clone(), Some(AccountRow { id, name: "alice" })),
            NotFoundHandling::Error,
        )
        .expect("resolve should succeed")
        .expect("entity should be present");

    // Second execution: the connector skips the database entirely.
    assert_eq!(probe.is_cached(&key), Ok(true));
    let second = finder
        .resolve_entity(QueryResult::cached(key), NotFoundHandling::Error)
        .expect("resolve should succeed")
        .expect("entity should be cached");

    assert!(Arc::ptr_eq(first.entity(), second.entity()));
    assert_eq!(first.id(), second.id());
}
