//! Host collaborators
//!
//! The audit trail hooks into a content host: something that stores entities,
//! runs mutations and notifies subscribers around them. This module provides
//! that host surface:
//!
//! - [`EntityStore`]: entity persistence (Postgres or in-memory)
//! - [`LifecycleRegistry`]: hooks keyed by lifecycle event kind
//! - [`EntityService`]: runs mutations and fires hooks around them
//!
//! Entities are JSON objects with an integer `id`.

mod lifecycle;
mod memory;
mod postgres;
mod service;
mod store;

pub use lifecycle::{
    HookError, LifecycleEvent, LifecycleHook, LifecycleKind, LifecycleRegistry, MutationParams,
};
pub use memory::MemoryEntityStore;
pub use postgres::PgEntityStore;
pub use service::{EntityService, ServiceError};
pub use store::{EntityStore, StoreError, StoreResult};

use serde_json::{Map, Value};

/// Primary key of an entity, user or role
pub type EntityId = i64;

/// A full field-value mapping for one entity
pub type Entity = Map<String, Value>;

/// Read the primary key out of an entity snapshot
pub fn entity_id(entity: &Entity) -> Option<EntityId> {
    entity.get("id").and_then(Value::as_i64)
}
