//! CMS Audit Server Library
//!
//! Audit trail for a headless content host: every create, update and delete
//! performed on behalf of an HTTP request is recorded with who made it, when,
//! and what changed, and the trail can be read back through a filtered,
//! paginated, permission-gated endpoint.
//!
//! # Overview
//!
//! - **host**: entity storage, lifecycle hooks and the entity service
//! - **audit**: snapshot capture, diffing, sanitizing and record storage
//! - **auth**: header authentication and the audit-log read policy
//! - **middleware**: CORS, HTTP tracing and the per-request context
//! - **features**: the audit-log read API and the generic content API
//! - **api**: store selection, router assembly and the server loop
//!
//! # Request flow
//!
//! A mutation on `/api/content` runs inside the request context established by
//! [`middleware::RequestContextLayer`]. The [`host::EntityService`] fires the
//! before-hooks (snapshot capture), commits, then fires the after-hooks, where
//! [`audit::AuditRecorder`] writes the record.
//!
//! # Example
//!
//! ```no_run
//! use cms_audit_server::{api, config::{Config, SharedAuditConfig}};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let stores = api::Stores::memory();
//!     let entities = api::bootstrap(&stores, SharedAuditConfig::new(config.audit_log.clone()));
//!     api::serve(&config, api::build_router(&config, &stores, entities)).await
//! }
//! ```

pub mod api;
pub mod audit;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod features;
pub mod host;
pub mod middleware;

// Re-export commonly used types
pub use error::{ApiResult, AppError};
