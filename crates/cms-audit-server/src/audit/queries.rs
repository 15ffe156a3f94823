//! Database queries for audit logs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, PgPool, Postgres, QueryBuilder};
use tracing::debug;

use super::models::{AuditAction, AuditDiff, AuditLogEntry, NewAuditLogEntry};
use super::store::{AuditLogFilter, AuditLogStore, AuditSort, PageRequest, SortDirection};
use crate::host::{Entity, EntityId, StoreError, StoreResult};

const SELECT_COLUMNS: &str = r#"
    SELECT id, content_type, record_id, action, timestamp,
           user_id, username, changed_fields, diff, payload
    FROM audit_logs
"#;

/// Audit record store backed by the `audit_logs` table
#[derive(Debug, Clone)]
pub struct PgAuditLogStore {
    pool: PgPool,
}

impl PgAuditLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AuditLogRow {
    id: i64,
    content_type: String,
    record_id: Option<EntityId>,
    action: String,
    timestamp: DateTime<Utc>,
    user_id: Option<EntityId>,
    username: Option<String>,
    changed_fields: Vec<String>,
    diff: Option<Json<AuditDiff>>,
    payload: Option<Json<Entity>>,
}

impl TryFrom<AuditLogRow> for AuditLogEntry {
    type Error = StoreError;

    fn try_from(row: AuditLogRow) -> Result<Self, Self::Error> {
        let action: AuditAction = row
            .action
            .parse()
            .map_err(|e| StoreError::InvalidEntity(format!("audit log {}: {}", row.id, e)))?;

        Ok(AuditLogEntry {
            id: row.id,
            content_type: row.content_type,
            record_id: row.record_id,
            action,
            timestamp: row.timestamp,
            user_id: row.user_id,
            username: row.username,
            changed_fields: row.changed_fields,
            diff: row.diff.map(|Json(diff)| diff),
            payload: row.payload.map(|Json(payload)| payload),
        })
    }
}

/// Append the `WHERE` clause for `filter`, binding every value
fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &AuditLogFilter) {
    builder.push(" WHERE TRUE");

    if !filter.content_types.is_empty() {
        builder
            .push(" AND content_type = ANY(")
            .push_bind(filter.content_types.clone())
            .push(")");
    }
    if let Some(user_id) = filter.user_id {
        builder.push(" AND user_id = ").push_bind(user_id);
    }
    if !filter.actions.is_empty() {
        let actions: Vec<String> = filter.actions.iter().map(|a| a.as_str().to_string()).collect();
        builder.push(" AND action = ANY(").push_bind(actions).push(")");
    }
    if let Some(from) = filter.date_from {
        builder.push(" AND timestamp >= ").push_bind(from);
    }
    if let Some(to) = filter.date_to {
        builder.push(" AND timestamp <= ").push_bind(to);
    }
}

/// `ORDER BY` matching [`AuditSort::compare`]: NULLs first ascending, last descending
fn order_by(sort: AuditSort) -> String {
    let nulls = match sort.direction {
        SortDirection::Asc => "NULLS FIRST",
        SortDirection::Desc => "NULLS LAST",
    };
    format!(
        " ORDER BY {column} {dir} {nulls}, id {dir}",
        column = sort.field.column(),
        dir = sort.direction.as_sql(),
    )
}

#[async_trait]
impl AuditLogStore for PgAuditLogStore {
    async fn insert(&self, entry: NewAuditLogEntry) -> StoreResult<AuditLogEntry> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO audit_logs (
                content_type, record_id, action, timestamp,
                user_id, username, changed_fields, diff, payload
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(&entry.content_type)
        .bind(entry.record_id)
        .bind(entry.action.as_str())
        .bind(entry.timestamp)
        .bind(entry.user_id)
        .bind(&entry.username)
        .bind(&entry.changed_fields)
        .bind(entry.diff.as_ref().map(Json))
        .bind(entry.payload.as_ref().map(Json))
        .fetch_one(&self.pool)
        .await?;

        debug!(
            audit_id = id,
            action = %entry.action,
            content_type = %entry.content_type,
            "Created audit log entry"
        );

        Ok(entry.into_entry(id))
    }

    async fn find_many(
        &self,
        filter: &AuditLogFilter,
        sort: AuditSort,
        page: PageRequest,
    ) -> StoreResult<Vec<AuditLogEntry>> {
        let mut builder = QueryBuilder::<Postgres>::new(SELECT_COLUMNS);
        push_filter(&mut builder, filter);
        builder.push(order_by(sort));
        builder
            .push(" LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows: Vec<AuditLogRow> = builder.build_query_as().fetch_all(&self.pool).await?;

        debug!(count = rows.len(), "Queried audit logs");

        rows.into_iter().map(AuditLogEntry::try_from).collect()
    }

    async fn count(&self, filter: &AuditLogFilter) -> StoreResult<i64> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM audit_logs");
        push_filter(&mut builder, filter);

        let total: i64 = builder.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(total)
    }
}
