//! Shared fixtures for integration tests
//!
//! [`TestApp`] wires the in-memory stores, the audit plugin and the full
//! router the same way the binary does, and keeps handles on each store so
//! tests can seed users and inspect recorded entries.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use cms_audit_server::{
    api::{build_router, Stores},
    audit::{AuditLogEntry, AuditLogPlugin, MemoryAuditLogStore, SnapshotCorrelator},
    auth::{AuthUser, MemoryPermissionStore, USER_CONTENT_TYPE, USER_ID_HEADER},
    config::{AuditLogConfig, Config, SharedAuditConfig},
    host::{Entity, EntityService, EntityStore, LifecycleRegistry, MemoryEntityStore},
};

pub const ARTICLE: &str = "api::article.article";

pub fn entity(value: Value) -> Entity {
    value.as_object().cloned().expect("fixture must be a JSON object")
}

pub fn editor() -> AuthUser {
    AuthUser {
        id: 42,
        username: Some("editor".to_string()),
        ..Default::default()
    }
}

pub struct TestApp {
    pub router: Router,
    pub service: EntityService,
    pub entities: Arc<MemoryEntityStore>,
    pub audit_logs: Arc<MemoryAuditLogStore>,
    pub permissions: Arc<MemoryPermissionStore>,
    pub audit_config: SharedAuditConfig,
    pub snapshots: Arc<SnapshotCorrelator>,
}

impl TestApp {
    pub fn new(audit_log: AuditLogConfig) -> Self {
        let entities = Arc::new(MemoryEntityStore::new());
        let audit_logs = Arc::new(MemoryAuditLogStore::new());
        let permissions = Arc::new(MemoryPermissionStore::new());
        let stores = Stores {
            entities: entities.clone(),
            audit_logs: audit_logs.clone(),
            permissions: permissions.clone(),
            pool: None,
        };

        let audit_config = SharedAuditConfig::new(audit_log);
        let plugin = AuditLogPlugin::new(
            stores.entities.clone(),
            stores.audit_logs.clone(),
            audit_config.clone(),
        );
        let mut lifecycles = LifecycleRegistry::new();
        plugin.bootstrap(&mut lifecycles);

        let service = EntityService::new(stores.entities.clone(), Arc::new(lifecycles));
        let router = build_router(&Config::default(), &stores, service.clone());

        Self {
            router,
            service,
            entities,
            audit_logs,
            permissions,
            audit_config,
            snapshots: plugin.snapshots().clone(),
        }
    }

    /// Store a user account directly, bypassing lifecycles
    pub async fn seed_user(&self, fields: Value) -> i64 {
        let user = self
            .entities
            .create(USER_CONTENT_TYPE, entity(fields))
            .await
            .expect("seed user");
        user["id"].as_i64().expect("user id")
    }

    /// Store an entity directly, bypassing lifecycles
    pub async fn seed(&self, content_type: &str, fields: Value) -> Entity {
        self.entities
            .create(content_type, entity(fields))
            .await
            .expect("seed entity")
    }

    pub async fn recorded(&self) -> Vec<AuditLogEntry> {
        self.audit_logs.entries().await
    }

    /// Send a request through the full middleware stack
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        user_id: Option<i64>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(id) = user_id {
            builder = builder.header(USER_ID_HEADER, id.to_string());
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("valid request");

        let response = self.router.clone().oneshot(request).await.expect("infallible");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("response body")
            .to_bytes();
        let body = if bytes.is_empty() {
            json!(null)
        } else {
            serde_json::from_slice(&bytes).expect("JSON response")
        };

        (status, body)
    }
}
