//! Audit trail behavior through the entity service
//!
//! Mutations run inside an explicit request context, the way the
//! request-context middleware runs handlers.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use cms_audit_server::{
    audit::{
        AuditAction, AuditLogEntry, AuditLogFilter, AuditLogPlugin, AuditLogStore, AuditSort,
        MemoryAuditLogStore, NewAuditLogEntry, PageRequest, AUDIT_LOG_CONTENT_TYPE,
    },
    config::{AuditLogConfig, SharedAuditConfig},
    host::{
        Entity, EntityService, EntityStore, LifecycleRegistry, MemoryEntityStore, ServiceError,
        StoreError, StoreResult,
    },
    middleware::{request_context, RequestContext},
};

mod helpers;

use helpers::{editor, entity, TestApp, ARTICLE};

fn audited(exclude: &[&str]) -> AuditLogConfig {
    AuditLogConfig {
        enabled: true,
        exclude_content_types: exclude.iter().map(|ct| ct.to_string()).collect(),
    }
}

fn as_value(entity: Option<Entity>) -> Value {
    entity.map(Value::Object).unwrap_or(Value::Null)
}

async fn as_editor<F: std::future::Future>(fut: F) -> F::Output {
    request_context::scope(RequestContext::new(Some(editor())), fut).await
}

#[tokio::test]
async fn test_create_records_sanitized_payload() {
    let app = TestApp::new(audited(&[]));

    as_editor(app.service.create(ARTICLE, entity(json!({"name": "A", "password": "x"}))))
        .await
        .unwrap();

    let recorded = app.recorded().await;
    assert_eq!(recorded.len(), 1);

    let entry = &recorded[0];
    assert_eq!(entry.action, AuditAction::Create);
    assert_eq!(entry.content_type, ARTICLE);
    assert_eq!(entry.record_id, Some(1));
    assert_eq!(entry.user_id, Some(42));
    assert_eq!(entry.username.as_deref(), Some("editor"));
    assert_eq!(as_value(entry.payload.clone()), json!({"id": 1, "name": "A"}));
    assert_eq!(entry.diff, None);
    assert!(entry.changed_fields.is_empty());
}

#[tokio::test]
async fn test_update_records_field_diff() {
    let app = TestApp::new(audited(&[]));
    app.seed(ARTICLE, json!({"name": "A"})).await;

    as_editor(app.service.update(ARTICLE, 1, entity(json!({"name": "B"}))))
        .await
        .unwrap();

    let recorded = app.recorded().await;
    assert_eq!(recorded.len(), 1);

    let entry = &recorded[0];
    assert_eq!(entry.action, AuditAction::Update);
    assert_eq!(entry.changed_fields, vec!["name".to_string()]);
    assert_eq!(entry.payload, None);

    let diff = entry.diff.clone().unwrap();
    assert_eq!(diff.changed_fields, vec!["name".to_string()]);
    assert_eq!(as_value(diff.before), json!({"name": "A"}));
    assert_eq!(as_value(diff.after), json!({"name": "B"}));

    assert!(app.snapshots.is_empty());
}

#[tokio::test]
async fn test_update_hides_sensitive_changes() {
    let app = TestApp::new(audited(&[]));
    app.seed(ARTICLE, json!({"name": "A", "password": "old"})).await;

    as_editor(app.service.update(ARTICLE, 1, entity(json!({"password": "new"}))))
        .await
        .unwrap();

    let entry = &app.recorded().await[0];
    assert!(entry.changed_fields.is_empty());
    assert_eq!(entry.diff.as_ref().map(|d| d.changed_fields.len()), Some(0));
}

#[tokio::test]
async fn test_delete_records_last_state() {
    let app = TestApp::new(audited(&[]));
    app.seed(ARTICLE, json!({"name": "A"})).await;

    as_editor(app.service.delete(ARTICLE, 1)).await.unwrap();

    let recorded = app.recorded().await;
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].action, AuditAction::Delete);
    assert_eq!(recorded[0].record_id, Some(1));
    assert_eq!(as_value(recorded[0].payload.clone()), json!({"id": 1, "name": "A"}));
    assert_eq!(recorded[0].diff, None);
}

#[tokio::test]
async fn test_excluded_and_audit_types_are_never_recorded() {
    let app = TestApp::new(audited(&["api::secret.secret"]));

    for content_type in ["api::secret.secret", AUDIT_LOG_CONTENT_TYPE] {
        as_editor(async {
            let created = app
                .service
                .create(content_type, entity(json!({"name": "A"})))
                .await
                .unwrap();
            let id = created["id"].as_i64().unwrap();
            app.service
                .update(content_type, id, entity(json!({"name": "B"})))
                .await
                .unwrap();
            app.service.delete(content_type, id).await.unwrap();
        })
        .await;
    }

    assert!(app.recorded().await.is_empty());
    assert!(app.snapshots.is_empty());
}

#[tokio::test]
async fn test_disabled_then_enabled_at_runtime() {
    let app = TestApp::new(AuditLogConfig {
        enabled: false,
        exclude_content_types: vec![],
    });

    as_editor(app.service.create(ARTICLE, entity(json!({"name": "A"}))))
        .await
        .unwrap();
    assert!(app.recorded().await.is_empty());

    app.audit_config.replace(audited(&[]));

    as_editor(app.service.update(ARTICLE, 1, entity(json!({"name": "B"}))))
        .await
        .unwrap();

    let recorded = app.recorded().await;
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].changed_fields, vec!["name".to_string()]);
}

#[tokio::test]
async fn test_mutations_outside_a_request_are_not_recorded() {
    let app = TestApp::new(audited(&[]));

    app.service
        .create(ARTICLE, entity(json!({"name": "A"})))
        .await
        .unwrap();
    app.service
        .update(ARTICLE, 1, entity(json!({"name": "B"})))
        .await
        .unwrap();

    assert!(app.recorded().await.is_empty());
    assert!(app.snapshots.is_empty());
}

#[tokio::test]
async fn test_anonymous_request_records_without_user() {
    let app = TestApp::new(audited(&[]));

    request_context::scope(
        RequestContext::new(None),
        app.service.create(ARTICLE, entity(json!({"name": "A"}))),
    )
    .await
    .unwrap();

    let recorded = app.recorded().await;
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].user_id, None);
    assert_eq!(recorded[0].username, None);
}

struct UnavailableAuditLogs;

#[async_trait]
impl AuditLogStore for UnavailableAuditLogs {
    async fn insert(&self, _entry: NewAuditLogEntry) -> StoreResult<AuditLogEntry> {
        Err(StoreError::InvalidEntity("audit log store unavailable".to_string()))
    }

    async fn find_many(
        &self,
        _filter: &AuditLogFilter,
        _sort: AuditSort,
        _page: PageRequest,
    ) -> StoreResult<Vec<AuditLogEntry>> {
        Ok(Vec::new())
    }

    async fn count(&self, _filter: &AuditLogFilter) -> StoreResult<i64> {
        Ok(0)
    }
}

#[tokio::test]
async fn test_audit_write_failure_surfaces_after_commit() {
    let entities = Arc::new(MemoryEntityStore::new());
    let plugin = AuditLogPlugin::new(
        entities.clone(),
        Arc::new(UnavailableAuditLogs),
        SharedAuditConfig::new(audited(&[])),
    );
    let mut lifecycles = LifecycleRegistry::new();
    plugin.bootstrap(&mut lifecycles);
    let service = EntityService::new(entities.clone(), Arc::new(lifecycles));

    let result = as_editor(service.create(ARTICLE, entity(json!({"name": "A"})))).await;

    assert!(matches!(result, Err(ServiceError::Hook(_))));
    assert_eq!(entities.count(ARTICLE).await, 1);
    assert!(entities.find_one(ARTICLE, 1).await.unwrap().is_some());
}

/// Entity store whose lookups fail while writes go through
struct FailingLookups(MemoryEntityStore);

#[async_trait]
impl EntityStore for FailingLookups {
    async fn find_one(&self, _content_type: &str, _id: i64) -> StoreResult<Option<Entity>> {
        Err(StoreError::InvalidEntity("lookup unavailable".to_string()))
    }

    async fn create(&self, content_type: &str, data: Entity) -> StoreResult<Entity> {
        self.0.create(content_type, data).await
    }

    async fn update(&self, content_type: &str, id: i64, data: Entity) -> StoreResult<Option<Entity>> {
        self.0.update(content_type, id, data).await
    }

    async fn delete(&self, content_type: &str, id: i64) -> StoreResult<Option<Entity>> {
        self.0.delete(content_type, id).await
    }
}

#[tokio::test]
async fn test_snapshot_lookup_failure_does_not_block_mutation() {
    let entities = Arc::new(FailingLookups(MemoryEntityStore::new()));
    entities.0.create(ARTICLE, entity(json!({"name": "A"}))).await.unwrap();

    let audit_logs = Arc::new(MemoryAuditLogStore::new());
    let plugin = AuditLogPlugin::new(
        entities.clone(),
        audit_logs.clone(),
        SharedAuditConfig::new(audited(&[])),
    );
    let mut lifecycles = LifecycleRegistry::new();
    plugin.bootstrap(&mut lifecycles);
    let service = EntityService::new(entities.clone(), Arc::new(lifecycles));

    let updated = as_editor(service.update(ARTICLE, 1, entity(json!({"name": "B"}))))
        .await
        .unwrap();
    assert_eq!(Value::Object(updated), json!({"id": 1, "name": "B"}));
    assert_eq!(
        entities.0.find_one(ARTICLE, 1).await.unwrap().map(Value::Object),
        Some(json!({"id": 1, "name": "B"}))
    );

    let recorded = audit_logs.entries().await;
    assert_eq!(recorded.len(), 1);
    let diff = recorded[0].diff.clone().unwrap();
    assert!(diff.changed_fields.is_empty());
    assert_eq!(diff.before, None);
    assert_eq!(as_value(diff.after), json!({"id": 1, "name": "B"}));
}
