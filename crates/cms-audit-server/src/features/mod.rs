//! Feature modules implementing the HTTP API
//!
//! Each feature is a vertical slice with its own queries and routes.
//!
//! # Features
//!
//! - **audit_logs**: Read API over the audit trail, gated by the read policy
//! - **content**: Generic entity CRUD whose mutations flow through lifecycles
//!
//! # Architecture
//!
//! Each feature module follows the structure:
//! - `queries/` - Read operations and parameter validation
//! - `routes.rs` - HTTP route definitions
//! - `routes_test.rs` - Router tests driven with `tower::ServiceExt::oneshot`

pub mod audit_logs;
pub mod content;
pub mod shared;

use axum::Router;
use std::sync::Arc;

use crate::audit::{AuditLogStore, AUDIT_LOGS_BASE_PATH};
use crate::auth::CapabilityChecker;
use crate::host::EntityService;

/// Base path of the content API
pub const CONTENT_BASE_PATH: &str = "/api/content";

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    /// Entity service, with the audit hooks registered
    pub entities: EntityService,
    /// Audit record storage
    pub audit_logs: Arc<dyn AuditLogStore>,
    /// Read policy for the audit log endpoint
    pub capabilities: Arc<dyn CapabilityChecker>,
}

/// Creates the API router with all feature routes mounted
///
/// - `/api/audit-logs` - Audit trail read API
/// - `/api/content` - Content API
pub fn router(state: FeatureState) -> Router<()> {
    Router::new()
        .nest(
            AUDIT_LOGS_BASE_PATH,
            audit_logs::audit_logs_routes(state.capabilities).with_state(state.audit_logs),
        )
        .nest(CONTENT_BASE_PATH, content::content_routes().with_state(state.entities))
}
