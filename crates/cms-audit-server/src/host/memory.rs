//! In-memory entity store
//!
//! Used for the `memory` storage backend and throughout the test suite.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use super::store::{EntityStore, StoreResult};
use super::{Entity, EntityId};

#[derive(Debug, Default)]
struct Tables {
    next_id: EntityId,
    rows: HashMap<String, BTreeMap<EntityId, Entity>>,
}

/// Entity store backed by process memory
///
/// Ids come from a single sequence shared by every content type, starting at 1.
#[derive(Debug, Default)]
pub struct MemoryEntityStore {
    tables: RwLock<Tables>,
}

impl MemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entities of one content type
    pub async fn count(&self, content_type: &str) -> usize {
        self.tables
            .read()
            .await
            .rows
            .get(content_type)
            .map_or(0, BTreeMap::len)
    }
}

fn with_id(id: EntityId, data: Entity) -> Entity {
    let mut entity = Entity::new();
    entity.insert("id".to_string(), Value::from(id));
    for (key, value) in data {
        if key != "id" {
            entity.insert(key, value);
        }
    }
    entity
}

#[async_trait]
impl EntityStore for MemoryEntityStore {
    async fn find_one(&self, content_type: &str, id: EntityId) -> StoreResult<Option<Entity>> {
        let tables = self.tables.read().await;
        Ok(tables
            .rows
            .get(content_type)
            .and_then(|rows| rows.get(&id))
            .cloned())
    }

    async fn create(&self, content_type: &str, data: Entity) -> StoreResult<Entity> {
        let mut tables = self.tables.write().await;
        tables.next_id += 1;
        let id = tables.next_id;

        let entity = with_id(id, data);
        tables
            .rows
            .entry(content_type.to_string())
            .or_default()
            .insert(id, entity.clone());

        Ok(entity)
    }

    async fn update(
        &self,
        content_type: &str,
        id: EntityId,
        data: Entity,
    ) -> StoreResult<Option<Entity>> {
        let mut tables = self.tables.write().await;
        let Some(existing) = tables
            .rows
            .get_mut(content_type)
            .and_then(|rows| rows.get_mut(&id))
        else {
            return Ok(None);
        };

        for (key, value) in data {
            if key != "id" {
                existing.insert(key, value);
            }
        }

        Ok(Some(existing.clone()))
    }

    async fn delete(&self, content_type: &str, id: EntityId) -> StoreResult<Option<Entity>> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .rows
            .get_mut(content_type)
            .and_then(|rows| rows.remove(&id)))
    }
}
