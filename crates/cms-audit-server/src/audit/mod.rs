//! Audit logging
//!
//! Records one immutable entry per content mutation made on behalf of an HTTP
//! request, and serves those entries back through a filtered, paginated and
//! permission-gated read endpoint.
//!
//! # Architecture
//!
//! - [`ChangeInterceptor`] runs before updates and deletes and captures the
//!   entity's current state into a [`SnapshotCorrelator`]
//! - [`AuditRecorder`] runs after every create, update and delete, and builds
//!   the record from the sanitized snapshots ([`sanitize`], [`compute_diff`])
//! - [`AuditLogStore`] persists records ([`MemoryAuditLogStore`],
//!   [`PgAuditLogStore`])
//! - [`AuditLogPlugin`] registers the hooks during bootstrap
//!
//! The read endpoint lives in `features::audit_logs`.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use cms_audit_server::audit::{AuditLogPlugin, MemoryAuditLogStore};
//! use cms_audit_server::config::SharedAuditConfig;
//! use cms_audit_server::host::{LifecycleRegistry, MemoryEntityStore};
//!
//! let plugin = AuditLogPlugin::new(
//!     Arc::new(MemoryEntityStore::new()),
//!     Arc::new(MemoryAuditLogStore::new()),
//!     SharedAuditConfig::default(),
//! );
//! let mut registry = LifecycleRegistry::new();
//! plugin.bootstrap(&mut registry);
//! ```

mod diff;
mod interceptor;
mod models;
mod plugin;
mod queries;
mod recorder;
mod sanitize;
mod store;

pub use diff::compute_diff;
pub use interceptor::{ChangeInterceptor, OperationKey, SnapshotCorrelator, SNAPSHOT_MAX_AGE};
pub use models::{
    AuditAction, AuditDiff, AuditLogEntry, NewAuditLogEntry, UnknownAction,
    AUDIT_LOG_CONTENT_TYPE, READ_AUDIT_LOGS_ACTION, READ_AUDIT_LOGS_PERMISSION,
};
pub use plugin::{AuditLogPlugin, AUDIT_LOGS_BASE_PATH};
pub use queries::PgAuditLogStore;
pub use recorder::{build_changes, AuditError, AuditRecorder, Changes};
pub use sanitize::{sanitize, SENSITIVE_FIELDS};
pub use store::{
    AuditLogFilter, AuditLogStore, AuditSort, MemoryAuditLogStore, PageRequest, SortDirection,
    SortField, UnknownSortField, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
