//! Session observers.
//!
//! An observer receives a callback for every persisted, found, and removed
//! entity. The default is a no-op; the provided implementations format one
//! line of text per event. Observers are diagnostics only - they cannot veto
//! or alter cache operations.

use std::cell::RefCell;
use std::io;

use strata_core::EntityId;
use uuid::Uuid;

/// Represents actions observed in a session.
pub trait SessionObserver {
    /// Invoked when an entity was persisted.
    fn entity_persisted(&self, session_id: Uuid, entity_type: &'static str, entity_id: EntityId);

    /// Invoked when an entity was found.
    fn entity_found(&self, session_id: Uuid, entity_type: &'static str, entity_id: EntityId);

    /// Invoked when an entity was removed from the cache.
    fn entity_removed(&self, session_id: Uuid, entity_type: &'static str, entity_id: EntityId);
}

/// Handles actions observed in a session by doing nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSessionObserver;

impl SessionObserver for NullSessionObserver {
    fn entity_persisted(&self, _session_id: Uuid, _entity_type: &'static str, _entity_id: EntityId) {
    }

    fn entity_found(&self, _session_id: Uuid, _entity_type: &'static str, _entity_id: EntityId) {}

    fn entity_removed(&self, _session_id: Uuid, _entity_type: &'static str, _entity_id: EntityId) {
    }
}

/// Handles actions observed in a session by emitting `tracing` events at
/// debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSessionObserver;

impl SessionObserver for TracingSessionObserver {
    fn entity_persisted(&self, session_id: Uuid, entity_type: &'static str, entity_id: EntityId) {
        tracing::debug!(%session_id, entity_type, %entity_id, "entity persisted");
    }

    fn entity_found(&self, session_id: Uuid, entity_type: &'static str, entity_id: EntityId) {
        tracing::debug!(%session_id, entity_type, %entity_id, "entity found");
    }

    fn entity_removed(&self, session_id: Uuid, entity_type: &'static str, entity_id: EntityId) {
        tracing::debug!(%session_id, entity_type, %entity_id, "entity removed");
    }
}

/// Handles actions observed in a session by writing a line per event to an
/// [`io::Write`].
///
/// Write errors are ignored; an observer must never fail a cache operation.
pub struct WriterSessionObserver<W: io::Write> {
    writer: RefCell<W>,
}

impl<W: io::Write> WriterSessionObserver<W> {
    /// Observe by writing lines to `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            writer: RefCell::new(writer),
        }
    }

    /// Consume the observer and recover the writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn write_event(&self, action: &str, session_id: Uuid, entity_type: &str, entity_id: EntityId) {
        let _ = writeln!(
            self.writer.borrow_mut(),
            "Entity of type '{}' with ID {} {} session {}",
            entity_type,
            entity_id,
            action,
            session_id
        );
    }
}

impl<W: io::Write> SessionObserver for WriterSessionObserver<W> {
    fn entity_persisted(&self, session_id: Uuid, entity_type: &'static str, entity_id: EntityId) {
        self.write_event("persisted in", session_id, entity_type, entity_id);
    }

    fn entity_found(&self, session_id: Uuid, entity_type: &'static str, entity_id: EntityId) {
        self.write_event("found in", session_id, entity_type, entity_id);
    }

    fn entity_removed(&self, session_id: Uuid, entity_type: &'static str, entity_id: EntityId) {
        self.write_event("removed from", session_id, entity_type, entity_id);
    }
}
