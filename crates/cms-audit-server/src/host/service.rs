//! Entity service: mutations wrapped in lifecycle hooks

use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use super::lifecycle::{HookError, LifecycleEvent, LifecycleKind, LifecycleRegistry, MutationParams};
use super::store::{EntityStore, StoreError};
use super::{Entity, EntityId};

/// Errors returned by [`EntityService`] mutations
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A hook failed. For after-hooks the mutation itself has already committed.
    #[error(transparent)]
    Hook(#[from] HookError),
}

/// Runs entity mutations and fires lifecycle hooks around them
///
/// Each mutation gets a fresh operation id shared by its before and after
/// events. Before-hook errors abort the mutation; after-hook errors are
/// returned to the caller once the change is committed.
#[derive(Clone, Debug)]
pub struct EntityService {
    store: Arc<dyn EntityStore>,
    lifecycles: Arc<LifecycleRegistry>,
}

impl EntityService {
    pub fn new(store: Arc<dyn EntityStore>, lifecycles: Arc<LifecycleRegistry>) -> Self {
        Self { store, lifecycles }
    }

    pub fn store(&self) -> &Arc<dyn EntityStore> {
        &self.store
    }

    pub async fn find_one(
        &self,
        content_type: &str,
        id: EntityId,
    ) -> Result<Option<Entity>, ServiceError> {
        Ok(self.store.find_one(content_type, id).await?)
    }

    #[tracing::instrument(skip(self, data))]
    pub async fn create(&self, content_type: &str, data: Entity) -> Result<Entity, ServiceError> {
        let operation_id = Uuid::new_v4();
        let params = MutationParams {
            where_id: None,
            data: Some(data.clone()),
        };

        self.fire(LifecycleKind::BeforeCreate, content_type, operation_id, &params, None)
            .await?;
        let created = self.store.create(content_type, data).await?;
        self.fire(LifecycleKind::AfterCreate, content_type, operation_id, &params, Some(&created))
            .await?;

        Ok(created)
    }

    #[tracing::instrument(skip(self, data))]
    pub async fn update(
        &self,
        content_type: &str,
        id: EntityId,
        data: Entity,
    ) -> Result<Entity, ServiceError> {
        let operation_id = Uuid::new_v4();
        let params = MutationParams {
            where_id: Some(id),
            data: Some(data.clone()),
        };

        self.fire(LifecycleKind::BeforeUpdate, content_type, operation_id, &params, None)
            .await?;
        let updated = self
            .store
            .update(content_type, id, data)
            .await?
            .ok_or_else(|| StoreError::not_found(content_type, id))?;
        self.fire(LifecycleKind::AfterUpdate, content_type, operation_id, &params, Some(&updated))
            .await?;

        Ok(updated)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, content_type: &str, id: EntityId) -> Result<Entity, ServiceError> {
        let operation_id = Uuid::new_v4();
        let params = MutationParams {
            where_id: Some(id),
            data: None,
        };

        self.fire(LifecycleKind::BeforeDelete, content_type, operation_id, &params, None)
            .await?;
        let deleted = self
            .store
            .delete(content_type, id)
            .await?
            .ok_or_else(|| StoreError::not_found(content_type, id))?;
        self.fire(LifecycleKind::AfterDelete, content_type, operation_id, &params, Some(&deleted))
            .await?;

        Ok(deleted)
    }

    async fn fire(
        &self,
        kind: LifecycleKind,
        content_type: &str,
        operation_id: Uuid,
        params: &MutationParams,
        result: Option<&Entity>,
    ) -> Result<(), HookError> {
        let event = LifecycleEvent {
            kind,
            content_type: content_type.to_string(),
            operation_id,
            params: params.clone(),
            result: result.map(|entity| Value::Object(entity.clone())),
        };
        self.lifecycles.fire(&event).await
    }
}
