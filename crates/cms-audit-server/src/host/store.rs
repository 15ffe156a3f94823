//! Entity persistence contract

use async_trait::async_trait;
use thiserror::Error;

use super::{Entity, EntityId};

/// Errors raised by entity, audit log and permission stores
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{content_type} with id {id} not found")]
    NotFound { content_type: String, id: EntityId },

    #[error("Invalid entity: {0}")]
    InvalidEntity(String),
}

impl StoreError {
    pub fn not_found(content_type: &str, id: EntityId) -> Self {
        Self::NotFound {
            content_type: content_type.to_string(),
            id,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Entity read/write operations the host exposes
///
/// Reads never populate relations: a snapshot holds the entity's own fields
/// only. Writes ignore any `id` in the supplied data; the store owns keys.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Fetch the current state of one entity
    async fn find_one(&self, content_type: &str, id: EntityId) -> StoreResult<Option<Entity>>;

    /// Insert a new entity, returning it with its assigned `id`
    async fn create(&self, content_type: &str, data: Entity) -> StoreResult<Entity>;

    /// Shallow-merge `data` into an existing entity, returning the new state
    async fn update(
        &self,
        content_type: &str,
        id: EntityId,
        data: Entity,
    ) -> StoreResult<Option<Entity>>;

    /// Remove an entity, returning its last state
    async fn delete(&self, content_type: &str, id: EntityId) -> StoreResult<Option<Entity>>;
}

impl std::fmt::Debug for dyn EntityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn EntityStore")
    }
}
