//! Role permission lookups

use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashSet;
use tokio::sync::RwLock;

use crate::host::{EntityId, StoreResult};

/// Answers whether any of a user's roles holds a permission action
#[async_trait]
pub trait PermissionStore: Send + Sync {
    async fn any_role_has_permission(&self, role_ids: &[EntityId], action: &str)
        -> StoreResult<bool>;
}

/// Permissions backed by the `role_permissions` table
#[derive(Debug, Clone)]
pub struct PgPermissionStore {
    pool: PgPool,
}

impl PgPermissionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Grant `action` to `role_id`; granting twice is a no-op
    pub async fn grant(&self, role_id: EntityId, action: &str) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO role_permissions (role_id, action)
            VALUES ($1, $2)
            ON CONFLICT (role_id, action) DO NOTHING
            "#,
        )
        .bind(role_id)
        .bind(action)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl PermissionStore for PgPermissionStore {
    async fn any_role_has_permission(
        &self,
        role_ids: &[EntityId],
        action: &str,
    ) -> StoreResult<bool> {
        if role_ids.is_empty() {
            return Ok(false);
        }

        let found: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM role_permissions
                WHERE role_id = ANY($1) AND action = $2
            )
            "#,
        )
        .bind(role_ids)
        .bind(action)
        .fetch_one(&self.pool)
        .await?;

        Ok(found)
    }
}

/// Role permissions held in process memory
#[derive(Debug, Default)]
pub struct MemoryPermissionStore {
    grants: RwLock<HashSet<(EntityId, String)>>,
}

impl MemoryPermissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn grant(&self, role_id: EntityId, action: &str) {
        self.grants.write().await.insert((role_id, action.to_string()));
    }
}

#[async_trait]
impl PermissionStore for MemoryPermissionStore {
    async fn any_role_has_permission(
        &self,
        role_ids: &[EntityId],
        action: &str,
    ) -> StoreResult<bool> {
        let grants = self.grants.read().await;
        Ok(role_ids
            .iter()
            .any(|role_id| grants.contains(&(*role_id, action.to_string()))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::READ_AUDIT_LOGS_ACTION;

    #[tokio::test]
    async fn test_memory_grants() {
        let store = MemoryPermissionStore::new();
        store.grant(2, READ_AUDIT_LOGS_ACTION).await;

        assert!(store.any_role_has_permission(&[1, 2], READ_AUDIT_LOGS_ACTION).await.unwrap());
        assert!(!store.any_role_has_permission(&[1], READ_AUDIT_LOGS_ACTION).await.unwrap());
        assert!(!store.any_role_has_permission(&[2], "other").await.unwrap());
        assert!(!store.any_role_has_permission(&[], READ_AUDIT_LOGS_ACTION).await.unwrap());
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_pg_grants(pool: PgPool) -> StoreResult<()> {
        let store = PgPermissionStore::new(pool);
        store.grant(3, READ_AUDIT_LOGS_ACTION).await?;
        store.grant(3, READ_AUDIT_LOGS_ACTION).await?;

        assert!(store.any_role_has_permission(&[1, 3], READ_AUDIT_LOGS_ACTION).await?);
        assert!(!store.any_role_has_permission(&[1], READ_AUDIT_LOGS_ACTION).await?);
        Ok(())
    }
}
