//! Postgres entity store
//!
//! Every content type shares the `entities` table; fields live in a JSONB
//! `data` column and the primary key is returned as the entity's `id`.
//! JSONB does not keep key order, so snapshots read back from Postgres list
//! their fields in JSONB order rather than insertion order.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{types::Json, PgPool};
use tracing::debug;

use super::store::{EntityStore, StoreError, StoreResult};
use super::{Entity, EntityId};

/// Entity store backed by the `entities` table
#[derive(Debug, Clone)]
pub struct PgEntityStore {
    pool: PgPool,
}

impl PgEntityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn strip_id(mut data: Entity) -> Entity {
    data.remove("id");
    data
}

fn to_entity(id: EntityId, data: Value) -> StoreResult<Entity> {
    let Value::Object(fields) = data else {
        return Err(StoreError::InvalidEntity(format!(
            "row {} does not hold a JSON object",
            id
        )));
    };

    let mut entity = Entity::new();
    entity.insert("id".to_string(), Value::from(id));
    entity.extend(fields.into_iter().filter(|(key, _)| key != "id"));
    Ok(entity)
}

type EntityRow = (EntityId, Json<Value>);

#[async_trait]
impl EntityStore for PgEntityStore {
    async fn find_one(&self, content_type: &str, id: EntityId) -> StoreResult<Option<Entity>> {
        let row = sqlx::query_as::<_, EntityRow>(
            r#"
            SELECT id, data
            FROM entities
            WHERE content_type = $1 AND id = $2
            "#,
        )
        .bind(content_type)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(id, Json(data))| to_entity(id, data)).transpose()
    }

    async fn create(&self, content_type: &str, data: Entity) -> StoreResult<Entity> {
        let (id, Json(data)) = sqlx::query_as::<_, EntityRow>(
            r#"
            INSERT INTO entities (content_type, data)
            VALUES ($1, $2)
            RETURNING id, data
            "#,
        )
        .bind(content_type)
        .bind(Json(Value::Object(strip_id(data))))
        .fetch_one(&self.pool)
        .await?;

        debug!(content_type = %content_type, id, "Created entity");

        to_entity(id, data)
    }

    async fn update(
        &self,
        content_type: &str,
        id: EntityId,
        data: Entity,
    ) -> StoreResult<Option<Entity>> {
        let row = sqlx::query_as::<_, EntityRow>(
            r#"
            UPDATE entities
            SET data = data || $3, updated_at = NOW()
            WHERE content_type = $1 AND id = $2
            RETURNING id, data
            "#,
        )
        .bind(content_type)
        .bind(id)
        .bind(Json(Value::Object(strip_id(data))))
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(id, Json(data))| to_entity(id, data)).transpose()
    }

    async fn delete(&self, content_type: &str, id: EntityId) -> StoreResult<Option<Entity>> {
        let row = sqlx::query_as::<_, EntityRow>(
            r#"
            DELETE FROM entities
            WHERE content_type = $1 AND id = $2
            RETURNING id, data
            "#,
        )
        .bind(content_type)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(id, Json(data))| to_entity(id, data)).transpose()
    }
}
