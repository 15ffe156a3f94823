//! Removal of credential fields from entity snapshots

use crate::host::Entity;

/// Top-level keys never written to an audit record
pub const SENSITIVE_FIELDS: [&str; 3] = ["password", "resetPasswordToken", "confirmationToken"];

/// Shallow copy of `entity` without sensitive keys
///
/// Only top-level keys are inspected.
pub fn sanitize(entity: Option<&Entity>) -> Option<Entity> {
    let entity = entity?;
    Some(
        entity
            .iter()
            .filter(|(key, _)| !SENSITIVE_FIELDS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
    )
}
