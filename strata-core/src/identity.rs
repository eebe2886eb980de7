//! Identity types for STRATA entities

use uuid::Uuid;

/// Entity identifier using UUIDv7 for timestamp-sortable IDs.
/// UUIDv7 embeds a Unix timestamp, making IDs naturally sortable by creation time.
pub type EntityId = Uuid;

/// Generate a new UUIDv7 EntityId (timestamp-sortable).
pub fn new_entity_id() -> EntityId {
    Uuid::now_v7()
}

/// Represents a factory that generates new entity IDs.
///
/// Repositories ask the factory for an ID before inserting a new entity so
/// the identity is known to the session cache ahead of the round trip to
/// storage.
pub trait EntityIdFactory {
    /// Generates a new entity ID.
    fn new_id(&self) -> EntityId;
}

/// The default ID factory, backed by [`new_entity_id`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidEntityIdFactory;

impl EntityIdFactory for UuidEntityIdFactory {
    fn new_id(&self) -> EntityId {
        new_entity_id()
    }
}
