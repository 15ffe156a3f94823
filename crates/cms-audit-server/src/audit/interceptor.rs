//! Pre-mutation snapshot capture
//!
//! Before an update or delete commits, [`ChangeInterceptor`] reads the current
//! entity and parks it in the [`SnapshotCorrelator`] under the operation's key.
//! The recorder takes it back out in the matching after-hook.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

use crate::config::SharedAuditConfig;
use crate::host::{Entity, EntityId, EntityStore, HookError, LifecycleEvent, LifecycleHook, LifecycleKind};

/// Snapshots older than this are dropped on the next insert
pub const SNAPSHOT_MAX_AGE: Duration = Duration::from_secs(5 * 60);

/// Correlates a before-hook with the after-hook of the same mutation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperationKey {
    pub content_type: String,
    pub record_id: EntityId,
    pub operation_id: Uuid,
}

impl OperationKey {
    /// Key for `event`, if its filter targets a primary key
    pub fn for_event(event: &LifecycleEvent) -> Option<Self> {
        Some(Self {
            content_type: event.content_type.clone(),
            record_id: event.params.where_id?,
            operation_id: event.operation_id,
        })
    }
}

/// Short-lived store of pre-mutation snapshots
///
/// Entries are removed when taken. Mutations that abort between their before
/// and after hooks leave an entry behind until it ages out.
#[derive(Debug)]
pub struct SnapshotCorrelator {
    entries: Mutex<HashMap<OperationKey, (Entity, Instant)>>,
    max_age: Duration,
}

impl Default for SnapshotCorrelator {
    fn default() -> Self {
        Self::new(SNAPSHOT_MAX_AGE)
    }
}

impl SnapshotCorrelator {
    pub fn new(max_age: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_age,
        }
    }

    pub fn insert(&self, key: OperationKey, snapshot: Entity) {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        let before = entries.len();
        entries.retain(|_, (_, stored_at)| now.duration_since(*stored_at) < self.max_age);
        let purged = before - entries.len();
        if purged > 0 {
            debug!(purged, "Dropped stale audit snapshots");
        }

        entries.insert(key, (snapshot, now));
    }

    /// Remove and return the snapshot for `key`
    pub fn take(&self, key: &OperationKey) -> Option<Entity> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .map(|(snapshot, _)| snapshot)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Before-update and before-delete hook capturing the entity's current state
///
/// Lookup failures are logged and swallowed; the mutation proceeds and the
/// record is written without a "before" side.
pub struct ChangeInterceptor {
    entities: Arc<dyn EntityStore>,
    config: SharedAuditConfig,
    snapshots: Arc<SnapshotCorrelator>,
}

impl ChangeInterceptor {
    pub fn new(
        entities: Arc<dyn EntityStore>,
        config: SharedAuditConfig,
        snapshots: Arc<SnapshotCorrelator>,
    ) -> Self {
        Self {
            entities,
            config,
            snapshots,
        }
    }

    async fn capture(&self, event: &LifecycleEvent) {
        let Some(key) = OperationKey::for_event(event) else {
            return;
        };
        if self.config.current().should_skip(&key.content_type) {
            return;
        }

        match self.entities.find_one(&key.content_type, key.record_id).await {
            Ok(Some(snapshot)) => self.snapshots.insert(key, snapshot),
            Ok(None) => {
                debug!(
                    content_type = %key.content_type,
                    record_id = key.record_id,
                    kind = %event.kind,
                    "No entity to snapshot"
                );
            },
            Err(e) => {
                debug!(
                    content_type = %key.content_type,
                    record_id = key.record_id,
                    kind = %event.kind,
                    error = %e,
                    "Failed to fetch entity before mutation"
                );
            },
        }
    }
}

#[async_trait]
impl LifecycleHook for ChangeInterceptor {
    async fn handle(&self, event: &LifecycleEvent) -> Result<(), HookError> {
        if matches!(event.kind, LifecycleKind::BeforeUpdate | LifecycleKind::BeforeDelete) {
            self.capture(event).await;
        }
        Ok(())
    }
}
