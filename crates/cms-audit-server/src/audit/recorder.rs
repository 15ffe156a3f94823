//! Audit record construction and persistence
//!
//! Runs in the after-hooks of every mutation, on the task that served the
//! request. Only mutations made while a request context is active produce a
//! record; background work is never audited.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use super::diff::compute_diff;
use super::interceptor::{OperationKey, SnapshotCorrelator};
use super::models::{AuditAction, AuditDiff, AuditLogEntry, NewAuditLogEntry};
use super::sanitize::sanitize;
use super::store::AuditLogStore;
use crate::config::SharedAuditConfig;
use crate::host::{Entity, EntityId, HookError, LifecycleEvent, LifecycleHook, LifecycleKind, StoreError};
use crate::middleware::request_context;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("{0} snapshot is not a JSON object")]
    InvalidSnapshot(&'static str),

    #[error("Failed to persist audit record: {0}")]
    Store(#[from] StoreError),
}

/// Payload and diff of one record
#[derive(Debug, Default, PartialEq)]
pub struct Changes {
    pub payload: Option<Entity>,
    pub diff: Option<AuditDiff>,
}

fn as_entity<'a>(
    value: Option<&'a Value>,
    side: &'static str,
) -> Result<Option<&'a Entity>, AuditError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(entity)) => Ok(Some(entity)),
        Some(_) => Err(AuditError::InvalidSnapshot(side)),
    }
}

/// Build the payload or diff for `action`
///
/// `before` is the snapshot captured ahead of an update or delete, `result`
/// the committed entity. A delete with nothing captured falls back to
/// `{"deletedId": record_id}`.
pub fn build_changes(
    action: AuditAction,
    before: Option<&Entity>,
    result: Option<&Value>,
    record_id: Option<EntityId>,
) -> Result<Changes, AuditError> {
    let changes = match action {
        AuditAction::Create => Changes {
            payload: sanitize(as_entity(result, "result")?),
            diff: None,
        },
        AuditAction::Update => Changes {
            payload: None,
            diff: Some(compute_diff(
                sanitize(before),
                sanitize(as_entity(result, "result")?),
            )),
        },
        AuditAction::Delete => Changes {
            payload: sanitize(before).or_else(|| {
                record_id.and_then(|id| json!({ "deletedId": id }).as_object().cloned())
            }),
            diff: None,
        },
    };

    Ok(changes)
}

/// After-create, after-update and after-delete hook writing audit records
pub struct AuditRecorder {
    audit_logs: Arc<dyn AuditLogStore>,
    config: SharedAuditConfig,
    snapshots: Arc<SnapshotCorrelator>,
}

impl AuditRecorder {
    pub fn new(
        audit_logs: Arc<dyn AuditLogStore>,
        config: SharedAuditConfig,
        snapshots: Arc<SnapshotCorrelator>,
    ) -> Self {
        Self {
            audit_logs,
            config,
            snapshots,
        }
    }

    /// Record `event` as `action`, returning the stored entry if one was written
    ///
    /// The captured snapshot is consumed even when the mutation is not audited.
    /// Payload or diff construction errors degrade to a record without them;
    /// only persistence errors are returned.
    #[tracing::instrument(skip(self, event), fields(content_type = %event.content_type))]
    pub async fn record(
        &self,
        action: AuditAction,
        event: &LifecycleEvent,
    ) -> Result<Option<AuditLogEntry>, AuditError> {
        debug!("Attempting to record audit entry");

        let before = OperationKey::for_event(event).and_then(|key| self.snapshots.take(&key));

        if self.config.current().should_skip(&event.content_type) {
            return Ok(None);
        }

        let Some(context) = request_context::current() else {
            debug!("No request context, mutation not audited");
            return Ok(None);
        };

        let record_id = event
            .result
            .as_ref()
            .and_then(|result| result.get("id"))
            .and_then(Value::as_i64)
            .or(event.params.where_id);

        let changes = build_changes(action, before.as_ref(), event.result.as_ref(), record_id)
            .unwrap_or_else(|e| {
                debug!(error = %e, "Unable to compute audit payload or diff");
                Changes::default()
            });

        let user = context.user.as_ref();
        let entry = NewAuditLogEntry {
            content_type: event.content_type.clone(),
            record_id,
            action,
            timestamp: Utc::now(),
            user_id: user.map(|u| u.id),
            username: user.and_then(|u| u.display_name()),
            changed_fields: changes
                .diff
                .as_ref()
                .map(|diff| diff.changed_fields.clone())
                .unwrap_or_default(),
            diff: changes.diff,
            payload: changes.payload,
        };

        let stored = self.audit_logs.insert(entry).await?;
        debug!(audit_id = stored.id, record_id = ?stored.record_id, "Recorded audit entry");

        Ok(Some(stored))
    }
}

#[async_trait]
impl LifecycleHook for AuditRecorder {
    async fn handle(&self, event: &LifecycleEvent) -> Result<(), HookError> {
        let action = match event.kind {
            LifecycleKind::AfterCreate => AuditAction::Create,
            LifecycleKind::AfterUpdate => AuditAction::Update,
            LifecycleKind::AfterDelete => AuditAction::Delete,
            _ => return Ok(()),
        };

        self.record(action, event)
            .await
            .map(|_| ())
            .map_err(|e| HookError::new("audit-logs", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::store::MemoryAuditLogStore;
    use crate::auth::AuthUser;
    use crate::config::AuditLogConfig;
    use crate::host::MutationParams;
    use crate::middleware::RequestContext;
    use uuid::Uuid;

    fn entity(value: Value) -> Entity {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_create_payload_is_sanitized() {
        let result = json!({"id": 1, "name": "A", "password": "x"});
        let changes = build_changes(AuditAction::Create, None, Some(&result), Some(1)).unwrap();

        assert_eq!(changes.payload.map(Value::Object), Some(json!({"id": 1, "name": "A"})));
        assert_eq!(changes.diff, None);
    }

    #[test]
    fn test_update_without_before_keeps_after() {
        let result = json!({"id": 1, "name": "B", "confirmationToken": "t"});
        let changes = build_changes(AuditAction::Update, None, Some(&result), Some(1)).unwrap();

        let diff = changes.diff.unwrap();
        assert!(diff.changed_fields.is_empty());
        assert_eq!(diff.before, None);
        assert_eq!(diff.after.map(Value::Object), Some(json!({"id": 1, "name": "B"})));
        assert_eq!(changes.payload, None);
    }

    #[test]
    fn test_delete_falls_back_to_deleted_id() {
        let changes = build_changes(AuditAction::Delete, None, None, Some(5)).unwrap();
        assert_eq!(changes.payload.map(Value::Object), Some(json!({"deletedId": 5})));

        let changes = build_changes(AuditAction::Delete, None, None, None).unwrap();
        assert_eq!(changes.payload, None);

        let before = entity(json!({"id": 5, "resetPasswordToken": "t", "title": "x"}));
        let changes = build_changes(AuditAction::Delete, Some(&before), None, Some(5)).unwrap();
        assert_eq!(changes.payload.map(Value::Object), Some(json!({"id": 5, "title": "x"})));
    }

    #[test]
    fn test_non_object_result_is_rejected() {
        let result = json!(["not", "an", "entity"]);
        let err = build_changes(AuditAction::Create, None, Some(&result), None).unwrap_err();
        assert!(matches!(err, AuditError::InvalidSnapshot("result")));
    }

    #[tokio::test]
    async fn test_unbuildable_payload_still_records_event() {
        let audit_logs = Arc::new(MemoryAuditLogStore::new());
        let recorder = AuditRecorder::new(
            audit_logs.clone(),
            SharedAuditConfig::new(AuditLogConfig::default()),
            Arc::new(SnapshotCorrelator::default()),
        );
        let event = LifecycleEvent {
            kind: LifecycleKind::AfterUpdate,
            content_type: "api::article.article".to_string(),
            operation_id: Uuid::new_v4(),
            params: MutationParams {
                where_id: Some(7),
                data: None,
            },
            result: Some(json!([1])),
        };
        let user = AuthUser {
            id: 3,
            username: Some("kim".to_string()),
            ..Default::default()
        };

        let stored = request_context::scope(
            RequestContext::new(Some(user)),
            recorder.record(AuditAction::Update, &event),
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(stored.action, AuditAction::Update);
        assert_eq!(stored.content_type, "api::article.article");
        assert_eq!(stored.record_id, Some(7));
        assert_eq!(stored.user_id, Some(3));
        assert_eq!(stored.username.as_deref(), Some("kim"));
        assert_eq!(stored.payload, None);
        assert_eq!(stored.diff, None);
        assert!(stored.changed_fields.is_empty());
        assert_eq!(audit_logs.entries().await.len(), 1);
    }
}
