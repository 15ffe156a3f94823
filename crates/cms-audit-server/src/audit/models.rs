//! Audit data models

use chrono::{DateTime, Utc};
use cms_audit_common::time::format_instant;
use serde::{Deserialize, Serialize, Serializer};
use std::str::FromStr;
use thiserror::Error;

use crate::host::{Entity, EntityId};

/// Content type under which audit records are stored. Never audited itself.
pub const AUDIT_LOG_CONTENT_TYPE: &str = "plugin::audit-logs.audit-log";

/// Short capability name accepted as a direct grant on a user
pub const READ_AUDIT_LOGS_PERMISSION: &str = "read_audit_logs";

/// Fully qualified permission action looked up for a user's roles
pub const READ_AUDIT_LOGS_ACTION: &str = "plugin::audit-logs.audit-log.read_audit_logs";

/// Kind of mutation an audit record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

impl AuditAction {
    pub const ALL: [AuditAction; 3] = [Self::Create, Self::Update, Self::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown audit action: {0}")]
pub struct UnknownAction(pub String);

impl FromStr for AuditAction {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}

/// Field-level change description for an update
///
/// `before` and `after` are `None` only when the corresponding snapshot was
/// unavailable; otherwise they hold exactly the changed keys present on that
/// side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditDiff {
    pub changed_fields: Vec<String>,
    pub before: Option<Entity>,
    pub after: Option<Entity>,
}

/// A stored audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: i64,
    pub content_type: String,
    pub record_id: Option<EntityId>,
    pub action: AuditAction,
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub user_id: Option<EntityId>,
    pub username: Option<String>,
    pub changed_fields: Vec<String>,
    pub diff: Option<AuditDiff>,
    pub payload: Option<Entity>,
}

/// An audit record before the store assigns its id
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditLogEntry {
    pub content_type: String,
    pub record_id: Option<EntityId>,
    pub action: AuditAction,
    pub timestamp: DateTime<Utc>,
    pub user_id: Option<EntityId>,
    pub username: Option<String>,
    pub changed_fields: Vec<String>,
    pub diff: Option<AuditDiff>,
    pub payload: Option<Entity>,
}

impl NewAuditLogEntry {
    pub fn into_entry(self, id: i64) -> AuditLogEntry {
        AuditLogEntry {
            id,
            content_type: self.content_type,
            record_id: self.record_id,
            action: self.action,
            timestamp: self.timestamp,
            user_id: self.user_id,
            username: self.username,
            changed_fields: self.changed_fields,
            diff: self.diff,
            payload: self.payload,
        }
    }
}

fn serialize_timestamp<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_instant(ts))
}
