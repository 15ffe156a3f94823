//! Audit record persistence
//!
//! Records are create-only: the store exposes inserts and reads, nothing else.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::str::FromStr;
use thiserror::Error;
use tokio::sync::RwLock;

use super::models::{AuditAction, AuditLogEntry, NewAuditLogEntry};
use crate::host::{EntityId, StoreResult};

/// Default page size for audit record listings
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest page size a caller may request
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Conjunction of optional predicates over audit records
///
/// Empty lists mean "no constraint". Date bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditLogFilter {
    pub content_types: Vec<String>,
    pub user_id: Option<EntityId>,
    pub actions: Vec<AuditAction>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
}

impl AuditLogFilter {
    pub fn matches(&self, entry: &AuditLogEntry) -> bool {
        (self.content_types.is_empty() || self.content_types.contains(&entry.content_type))
            && self.user_id.map_or(true, |id| entry.user_id == Some(id))
            && (self.actions.is_empty() || self.actions.contains(&entry.action))
            && self.date_from.map_or(true, |from| entry.timestamp >= from)
            && self.date_to.map_or(true, |to| entry.timestamp <= to)
    }
}

/// Fields audit records can be ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Id,
    ContentType,
    RecordId,
    Action,
    Timestamp,
    UserId,
    Username,
}

impl SortField {
    pub const ALL: [SortField; 7] = [
        Self::Id,
        Self::ContentType,
        Self::RecordId,
        Self::Action,
        Self::Timestamp,
        Self::UserId,
        Self::Username,
    ];

    /// Name as used in the `sort` query parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::ContentType => "contentType",
            Self::RecordId => "recordId",
            Self::Action => "action",
            Self::Timestamp => "timestamp",
            Self::UserId => "userId",
            Self::Username => "username",
        }
    }

    /// Column in the `audit_logs` table
    pub fn column(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::ContentType => "content_type",
            Self::RecordId => "record_id",
            Self::Action => "action",
            Self::Timestamp => "timestamp",
            Self::UserId => "user_id",
            Self::Username => "username",
        }
    }

    fn compare(&self, a: &AuditLogEntry, b: &AuditLogEntry) -> Ordering {
        match self {
            Self::Id => a.id.cmp(&b.id),
            Self::ContentType => a.content_type.cmp(&b.content_type),
            Self::RecordId => a.record_id.cmp(&b.record_id),
            Self::Action => a.action.as_str().cmp(b.action.as_str()),
            Self::Timestamp => a.timestamp.cmp(&b.timestamp),
            Self::UserId => a.user_id.cmp(&b.user_id),
            Self::Username => a.username.cmp(&b.username),
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown sort field: {0}")]
pub struct UnknownSortField(pub String);

impl FromStr for SortField {
    type Err = UnknownSortField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| UnknownSortField(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// `asc` in any case is ascending; everything else is descending
    pub fn parse_lenient(s: &str) -> Self {
        if s.eq_ignore_ascii_case("asc") {
            Self::Asc
        } else {
            Self::Desc
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Ordering of a listing. Ties are broken by record id in the same direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditSort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for AuditSort {
    fn default() -> Self {
        Self {
            field: SortField::Timestamp,
            direction: SortDirection::Desc,
        }
    }
}

impl AuditSort {
    /// Parse `field[:direction]`; an empty field means `timestamp`
    pub fn parse(s: &str) -> Result<Self, UnknownSortField> {
        let mut parts = s.splitn(2, ':');
        let field = match parts.next().unwrap_or_default() {
            "" => SortField::Timestamp,
            name => name.parse()?,
        };
        let direction = parts
            .next()
            .map_or(SortDirection::Desc, SortDirection::parse_lenient);

        Ok(Self { field, direction })
    }

    /// Total order for in-memory sorting; `None` values sort before `Some`
    pub fn compare(&self, a: &AuditLogEntry, b: &AuditLogEntry) -> Ordering {
        let ordering = self.field.compare(a, b).then_with(|| a.id.cmp(&b.id));
        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

/// One-based page selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn offset(&self) -> i64 {
        (i64::from(self.page.max(1)) - 1) * i64::from(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }
}

/// Persistence for audit records
#[async_trait]
pub trait AuditLogStore: Send + Sync {
    async fn insert(&self, entry: NewAuditLogEntry) -> StoreResult<AuditLogEntry>;

    async fn find_many(
        &self,
        filter: &AuditLogFilter,
        sort: AuditSort,
        page: PageRequest,
    ) -> StoreResult<Vec<AuditLogEntry>>;

    async fn count(&self, filter: &AuditLogFilter) -> StoreResult<i64>;
}

/// Audit records held in process memory
#[derive(Debug, Default)]
pub struct MemoryAuditLogStore {
    entries: RwLock<Vec<AuditLogEntry>>,
}

impl MemoryAuditLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored record in insertion order
    pub async fn entries(&self) -> Vec<AuditLogEntry> {
        self.entries.read().await.clone()
    }
}

#[async_trait]
impl AuditLogStore for MemoryAuditLogStore {
    async fn insert(&self, entry: NewAuditLogEntry) -> StoreResult<AuditLogEntry> {
        let mut entries = self.entries.write().await;
        let id = entries.len() as i64 + 1;
        let entry = entry.into_entry(id);
        entries.push(entry.clone());
        Ok(entry)
    }

    async fn find_many(
        &self,
        filter: &AuditLogFilter,
        sort: AuditSort,
        page: PageRequest,
    ) -> StoreResult<Vec<AuditLogEntry>> {
        let entries = self.entries.read().await;
        let mut matching: Vec<_> = entries.iter().filter(|e| filter.matches(e)).collect();
        matching.sort_by(|a, b| sort.compare(a, b));

        Ok(matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.page_size as usize)
            .cloned()
            .collect())
    }

    async fn count(&self, filter: &AuditLogFilter) -> StoreResult<i64> {
        let entries = self.entries.read().await;
        Ok(entries.iter().filter(|e| filter.matches(e)).count() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn new_entry(content_type: &str, action: AuditAction, hour: u32, user_id: Option<i64>) -> NewAuditLogEntry {
        NewAuditLogEntry {
            content_type: content_type.to_string(),
            record_id: Some(1),
            action,
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap(),
            user_id,
            username: None,
            changed_fields: vec![],
            diff: None,
            payload: None,
        }
    }

    async fn seeded() -> MemoryAuditLogStore {
        let store = MemoryAuditLogStore::new();
        for entry in [
            new_entry("api::article.article", AuditAction::Create, 8, Some(1)),
            new_entry("api::article.article", AuditAction::Update, 9, Some(2)),
            new_entry("api::page.page", AuditAction::Create, 10, None),
            new_entry("api::article.article", AuditAction::Delete, 11, Some(1)),
        ] {
            store.insert(entry).await.unwrap();
        }
        store
    }

    #[test]
    fn test_sort_parse() {
        assert_eq!(AuditSort::parse("timestamp:desc").unwrap(), AuditSort::default());
        assert_eq!(
            AuditSort::parse("contentType:ASC").unwrap(),
            AuditSort {
                field: SortField::ContentType,
                direction: SortDirection::Asc
            }
        );
        assert_eq!(
            AuditSort::parse("id").unwrap().direction,
            SortDirection::Desc
        );
        assert_eq!(
            AuditSort::parse("id:sideways").unwrap().direction,
            SortDirection::Desc
        );
        assert!(AuditSort::parse("password:asc").is_err());
    }

    #[test]
    fn test_page_offsets() {
        let page = PageRequest {
            page: 3,
            page_size: 20,
        };
        assert_eq!(page.offset(), 40);
        assert_eq!(page.limit(), 20);
        assert_eq!(PageRequest::default().offset(), 0);
    }

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids() {
        let store = seeded().await;
        let ids: Vec<_> = store.entries().await.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_filter_and_count() {
        let store = seeded().await;
        let filter = AuditLogFilter {
            content_types: vec!["api::article.article".to_string()],
            actions: vec![AuditAction::Create, AuditAction::Delete],
            user_id: Some(1),
            ..Default::default()
        };

        let found = store
            .find_many(&filter, AuditSort::default(), PageRequest::default())
            .await
            .unwrap();
        let ids: Vec<_> = found.iter().map(|e| e.id).collect();

        assert_eq!(ids, vec![4, 1]);
        assert_eq!(store.count(&filter).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_date_bounds_are_inclusive() {
        let store = seeded().await;
        let filter = AuditLogFilter {
            date_from: Some(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()),
            date_to: Some(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()),
            ..Default::default()
        };

        let sort = AuditSort {
            field: SortField::Timestamp,
            direction: SortDirection::Asc,
        };
        let found = store
            .find_many(&filter, sort, PageRequest::default())
            .await
            .unwrap();
        let ids: Vec<_> = found.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[tokio::test]
    async fn test_pagination_and_null_ordering() {
        let store = seeded().await;
        let sort = AuditSort {
            field: SortField::UserId,
            direction: SortDirection::Asc,
        };

        let first = store
            .find_many(
                &AuditLogFilter::default(),
                sort,
                PageRequest {
                    page: 1,
                    page_size: 3,
                },
            )
            .await
            .unwrap();
        let second = store
            .find_many(
                &AuditLogFilter::default(),
                sort,
                PageRequest {
                    page: 2,
                    page_size: 3,
                },
            )
            .await
            .unwrap();

        let ids: Vec<_> = first.iter().chain(&second).map(|e| e.id).collect();
        assert_eq!(ids, vec![3, 1, 4, 2]);
    }
}
