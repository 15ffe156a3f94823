//! Audit log API routes
//!
//! - `GET /api/audit-logs` - List audit records with filters, sort and pagination
//!
//! # Query Parameters
//!
//! - `filters[contentType][$in]` - content type, repeatable
//! - `filters[userId]` - acting user id
//! - `filters[action][$in]` - `create`, `update` or `delete`, repeatable
//! - `filters[dateFrom]`, `filters[dateTo]` - inclusive timestamp bounds
//! - `pagination[page]` (default 1), `pagination[pageSize]` (default 20)
//! - `sort` - `field:direction`, default `timestamp:desc`

use axum::{
    extract::{RawQuery, State},
    middleware::from_fn_with_state,
    routing::get,
    Json, Router,
};
use std::sync::Arc;

use super::queries::{list, ReadAuditLogsQuery};
use crate::audit::{AuditLogEntry, AuditLogStore};
use crate::auth::{require_read_audit_logs, CapabilityChecker};
use crate::error::ApiResult;
use crate::features::shared::{ListResponse, QueryParams};

/// Creates the audit log router, every route behind the read policy
pub fn audit_logs_routes(checker: Arc<dyn CapabilityChecker>) -> Router<Arc<dyn AuditLogStore>> {
    Router::new()
        .route("/", get(read_audit_logs))
        .route_layer(from_fn_with_state(checker, require_read_audit_logs))
}

/// List audit records
///
/// # Response
///
/// - `200 OK` - `{"data": [...], "meta": {"pagination": {...}}}`
/// - `400 Bad Request` - Malformed filter, pagination or sort value
/// - `401 Unauthorized` - No authenticated user
/// - `403 Forbidden` - User lacks the read permission
#[tracing::instrument(skip(store))]
async fn read_audit_logs(
    State(store): State<Arc<dyn AuditLogStore>>,
    RawQuery(query): RawQuery,
) -> ApiResult<Json<ListResponse<AuditLogEntry>>> {
    let query = ReadAuditLogsQuery::from_params(&QueryParams::parse(query.as_deref()))?;
    let response = list::handle(store.as_ref(), query).await?;

    tracing::debug!(
        returned = response.data.len(),
        total = response.meta.pagination.total,
        "Audit logs listed"
    );

    Ok(Json(response))
}
