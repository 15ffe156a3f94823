//! Read policy for audit logs
//!
//! - no authenticated user: 401
//! - a direct grant on the user, or a role holding the read permission: allowed
//! - anything else: 403

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use super::{permissions::PermissionStore, AuthUser};
use crate::audit::{READ_AUDIT_LOGS_ACTION, READ_AUDIT_LOGS_PERMISSION};
use crate::error::AppError;
use crate::host::StoreResult;
use crate::middleware::request_context::RequestContext;

/// Decides whether a user may read audit logs
#[async_trait]
pub trait CapabilityChecker: Send + Sync {
    async fn can_read_audit_logs(&self, user: &AuthUser) -> StoreResult<bool>;
}

/// Direct grants first, then role permissions from a [`PermissionStore`]
pub struct PermissionStoreChecker {
    permissions: Arc<dyn PermissionStore>,
}

impl PermissionStoreChecker {
    pub fn new(permissions: Arc<dyn PermissionStore>) -> Self {
        Self { permissions }
    }
}

fn has_direct_grant(user: &AuthUser) -> bool {
    user.read_audit_logs
        || user
            .permissions
            .iter()
            .any(|p| p == READ_AUDIT_LOGS_PERMISSION || p == READ_AUDIT_LOGS_ACTION)
}

#[async_trait]
impl CapabilityChecker for PermissionStoreChecker {
    async fn can_read_audit_logs(&self, user: &AuthUser) -> StoreResult<bool> {
        if has_direct_grant(user) {
            return Ok(true);
        }
        if user.role_ids.is_empty() {
            return Ok(false);
        }

        self.permissions
            .any_role_has_permission(&user.role_ids, READ_AUDIT_LOGS_ACTION)
            .await
    }
}

/// Route middleware enforcing the read policy
///
/// Expects [`RequestContext`] in the request extensions, as inserted by
/// [`RequestContextLayer`](crate::middleware::RequestContextLayer).
pub async fn require_read_audit_logs(
    State(checker): State<Arc<dyn CapabilityChecker>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = request
        .extensions()
        .get::<RequestContext>()
        .and_then(|ctx| ctx.user.clone())
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

    if !checker.can_read_audit_logs(&user).await? {
        debug!(user_id = user.id, "Audit log read denied");
        return Err(AppError::Forbidden(format!(
            "Missing permission: {}",
            READ_AUDIT_LOGS_PERMISSION
        )));
    }

    Ok(next.run(request).await)
}
