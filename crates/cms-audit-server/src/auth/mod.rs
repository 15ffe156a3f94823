//! Request authentication and audit-log read permissions
//!
//! Authentication is header based: `x-user-id` names a user entity of the
//! `plugin::users-permissions.user` content type. The read policy lives in
//! [`policy`].

pub mod permissions;
pub mod policy;

use async_trait::async_trait;
use axum::http::HeaderMap;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::host::{entity_id, Entity, EntityId, EntityStore, StoreResult};

pub use permissions::{MemoryPermissionStore, PermissionStore, PgPermissionStore};
pub use policy::{require_read_audit_logs, CapabilityChecker, PermissionStoreChecker};

/// Content type holding user accounts
pub const USER_CONTENT_TYPE: &str = "plugin::users-permissions.user";

/// Header carrying the acting user's id
pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated user of a request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuthUser {
    pub id: EntityId,
    pub username: Option<String>,
    pub email: Option<String>,
    /// Capabilities granted to the user directly
    pub permissions: Vec<String>,
    pub role_ids: Vec<EntityId>,
    pub read_audit_logs: bool,
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Role reference given either as a bare id or as an object with an `id`
fn role_id(value: &Value) -> Option<EntityId> {
    match value {
        Value::Object(role) => role.get("id").and_then(Value::as_i64),
        other => other.as_i64(),
    }
}

impl AuthUser {
    /// Build a user from a stored user entity
    ///
    /// Roles are read from `roles` (array) or, failing that, `role`.
    pub fn from_entity(entity: &Entity) -> Option<Self> {
        let id = entity_id(entity)?;

        let permissions = entity
            .get("permissions")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let role_ids = match (entity.get("roles"), entity.get("role")) {
            (Some(Value::Array(roles)), _) => roles.iter().filter_map(role_id).collect(),
            (_, Some(role)) => role_id(role).into_iter().collect(),
            _ => Vec::new(),
        };

        Some(Self {
            id,
            username: non_empty_str(entity.get("username")),
            email: non_empty_str(entity.get("email")),
            permissions,
            role_ids,
            read_audit_logs: entity.get("read_audit_logs") == Some(&Value::Bool(true)),
        })
    }

    /// Name written to audit records: username, else email
    pub fn display_name(&self) -> Option<String> {
        self.username.clone().or_else(|| self.email.clone())
    }
}

/// Resolves the user a request acts for
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, headers: &HeaderMap) -> StoreResult<Option<AuthUser>>;
}

/// Looks the `x-user-id` header up in the entity store
pub struct StoreAuthenticator {
    entities: Arc<dyn EntityStore>,
}

impl StoreAuthenticator {
    pub fn new(entities: Arc<dyn EntityStore>) -> Self {
        Self { entities }
    }
}

#[async_trait]
impl Authenticator for StoreAuthenticator {
    async fn authenticate(&self, headers: &HeaderMap) -> StoreResult<Option<AuthUser>> {
        let Some(raw) = headers.get(USER_ID_HEADER) else {
            return Ok(None);
        };

        let Some(id) = raw.to_str().ok().and_then(|s| s.trim().parse::<EntityId>().ok()) else {
            debug!(header = ?raw, "Ignoring malformed user id header");
            return Ok(None);
        };

        let user = self
            .entities
            .find_one(USER_CONTENT_TYPE, id)
            .await?
            .and_then(|entity| AuthUser::from_entity(&entity));

        if user.is_none() {
            debug!(user_id = id, "Unknown user in request header");
        }

        Ok(user)
    }
}
