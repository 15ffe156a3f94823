//! Audit-log plugin bootstrap

use std::sync::Arc;
use tracing::info;

use super::interceptor::{ChangeInterceptor, SnapshotCorrelator};
use super::recorder::AuditRecorder;
use super::store::AuditLogStore;
use crate::config::SharedAuditConfig;
use crate::host::{EntityStore, LifecycleKind, LifecycleRegistry};

/// Base path the read endpoint is mounted under
pub const AUDIT_LOGS_BASE_PATH: &str = "/api/audit-logs";

/// Wires the change interceptor and the recorder into the host lifecycles
///
/// Hooks are registered even when auditing is disabled at bootstrap; every
/// hook re-reads the shared configuration, so enabling it later takes effect
/// without a restart.
pub struct AuditLogPlugin {
    interceptor: Arc<ChangeInterceptor>,
    recorder: Arc<AuditRecorder>,
    snapshots: Arc<SnapshotCorrelator>,
    config: SharedAuditConfig,
}

impl AuditLogPlugin {
    pub fn new(
        entities: Arc<dyn EntityStore>,
        audit_logs: Arc<dyn AuditLogStore>,
        config: SharedAuditConfig,
    ) -> Self {
        let snapshots = Arc::new(SnapshotCorrelator::default());
        Self {
            interceptor: Arc::new(ChangeInterceptor::new(
                entities,
                config.clone(),
                snapshots.clone(),
            )),
            recorder: Arc::new(AuditRecorder::new(audit_logs, config.clone(), snapshots.clone())),
            snapshots,
            config,
        }
    }

    pub fn recorder(&self) -> &Arc<AuditRecorder> {
        &self.recorder
    }

    pub fn snapshots(&self) -> &Arc<SnapshotCorrelator> {
        &self.snapshots
    }

    /// Subscribe the plugin's hooks
    pub fn bootstrap(&self, registry: &mut LifecycleRegistry) {
        let config = self.config.current();
        info!(
            enabled = config.enabled,
            excluded = ?config.exclude_content_types,
            base_path = AUDIT_LOGS_BASE_PATH,
            "Audit log plugin bootstrap starting"
        );

        registry.subscribe(LifecycleKind::BeforeUpdate, self.interceptor.clone());
        registry.subscribe(LifecycleKind::BeforeDelete, self.interceptor.clone());
        registry.subscribe(LifecycleKind::AfterCreate, self.recorder.clone());
        registry.subscribe(LifecycleKind::AfterUpdate, self.recorder.clone());
        registry.subscribe(LifecycleKind::AfterDelete, self.recorder.clone());

        info!("Audit log lifecycle hooks registered");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditLogStore;
    use crate::config::AuditLogConfig;
    use crate::host::MemoryEntityStore;

    #[test]
    fn test_bootstrap_registers_hooks_even_when_disabled() {
        let plugin = AuditLogPlugin::new(
            Arc::new(MemoryEntityStore::new()),
            Arc::new(MemoryAuditLogStore::new()),
            SharedAuditConfig::new(AuditLogConfig {
                enabled: false,
                exclude_content_types: vec![],
            }),
        );
        let mut registry = LifecycleRegistry::new();
        plugin.bootstrap(&mut registry);

        for kind in [
            LifecycleKind::BeforeUpdate,
            LifecycleKind::BeforeDelete,
            LifecycleKind::AfterCreate,
            LifecycleKind::AfterUpdate,
            LifecycleKind::AfterDelete,
        ] {
            assert_eq!(registry.hook_count(kind), 1, "{kind}");
        }
        assert_eq!(registry.hook_count(LifecycleKind::BeforeCreate), 0);
    }
}
