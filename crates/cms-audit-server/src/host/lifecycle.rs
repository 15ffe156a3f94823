//! Lifecycle hooks
//!
//! Subscribers register once during bootstrap, keyed by the event kind they
//! care about. The registry is then frozen behind an `Arc` and every mutation
//! run by [`EntityService`](super::EntityService) invokes the matching hooks
//! in registration order, inline with the mutation.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use super::{Entity, EntityId};

/// Points in a mutation where hooks run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleKind {
    BeforeCreate,
    BeforeUpdate,
    BeforeDelete,
    AfterCreate,
    AfterUpdate,
    AfterDelete,
}

impl LifecycleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BeforeCreate => "beforeCreate",
            Self::BeforeUpdate => "beforeUpdate",
            Self::BeforeDelete => "beforeDelete",
            Self::AfterCreate => "afterCreate",
            Self::AfterUpdate => "afterUpdate",
            Self::AfterDelete => "afterDelete",
        }
    }
}

impl std::fmt::Display for LifecycleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Operation parameters as seen by hooks
#[derive(Debug, Clone, Default)]
pub struct MutationParams {
    /// Primary key targeted by an update or delete filter
    pub where_id: Option<EntityId>,
    /// Data supplied to a create or update
    pub data: Option<Entity>,
}

/// One hook invocation
///
/// The before and after events of the same mutation share `operation_id`.
#[derive(Debug, Clone)]
pub struct LifecycleEvent {
    pub kind: LifecycleKind,
    pub content_type: String,
    pub operation_id: Uuid,
    pub params: MutationParams,
    /// Committed entity state (after hooks only)
    pub result: Option<Value>,
}

/// Failure raised by a hook, surfaced to whoever ran the mutation
#[derive(Debug, Error)]
#[error("{hook} hook failed: {source}")]
pub struct HookError {
    pub hook: &'static str,
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

impl HookError {
    pub fn new(
        hook: &'static str,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            hook,
            source: source.into(),
        }
    }
}

/// A lifecycle subscriber
#[async_trait]
pub trait LifecycleHook: Send + Sync {
    async fn handle(&self, event: &LifecycleEvent) -> Result<(), HookError>;
}

/// Hooks keyed by lifecycle kind
#[derive(Default, Clone)]
pub struct LifecycleRegistry {
    hooks: HashMap<LifecycleKind, Vec<Arc<dyn LifecycleHook>>>,
}

impl LifecycleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, kind: LifecycleKind, hook: Arc<dyn LifecycleHook>) {
        self.hooks.entry(kind).or_default().push(hook);
    }

    /// Number of hooks registered for `kind`
    pub fn hook_count(&self, kind: LifecycleKind) -> usize {
        self.hooks.get(&kind).map_or(0, Vec::len)
    }

    /// Run every hook registered for the event's kind, stopping at the first error
    pub async fn fire(&self, event: &LifecycleEvent) -> Result<(), HookError> {
        let Some(hooks) = self.hooks.get(&event.kind) else {
            return Ok(());
        };

        for hook in hooks {
            hook.handle(event).await?;
        }

        Ok(())
    }
}

impl std::fmt::Debug for LifecycleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<_, _> = self
            .hooks
            .iter()
            .map(|(kind, hooks)| (kind.as_str(), hooks.len()))
            .collect();
        f.debug_struct("LifecycleRegistry").field("hooks", &counts).finish()
    }
}
