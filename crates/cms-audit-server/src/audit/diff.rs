//! Shallow field diff between two entity snapshots
//!
//! Only scalar-like fields are compared. A field counts as comparable unless
//! one side is a nested object and neither side is `null` or an array, so
//! nested objects (relations, components) never show up as changes. Arrays are
//! compared by value as opaque units. A key missing on one side is treated as
//! an absent scalar and differs from every present value, `null` included.
//! Numbers are equal when their values are, so `1` and `1.0` do not differ.

use serde_json::Value;

use super::models::AuditDiff;
use crate::host::Entity;

fn is_comparable(before: Option<&Value>, after: Option<&Value>) -> bool {
    let sides = [before, after];
    let any_object = sides.iter().any(|v| matches!(v, Some(Value::Object(_))));
    let any_null_or_array = sides
        .iter()
        .any(|v| matches!(v, Some(Value::Null) | Some(Value::Array(_))));

    !any_object || any_null_or_array
}

fn same_value(before: Option<&Value>, after: Option<&Value>) -> bool {
    match (before, after) {
        (Some(Value::Number(b)), Some(Value::Number(a))) => b == a || b.as_f64() == a.as_f64(),
        _ => before == after,
    }
}

fn pick(entity: &Entity, keys: &[String]) -> Entity {
    keys.iter()
        .filter_map(|key| entity.get(key).map(|value| (key.clone(), value.clone())))
        .collect()
}

/// Diff two snapshots
///
/// When either side is missing nothing is compared and both sides are
/// returned as given. Otherwise keys are visited in `before` order followed by
/// keys only present in `after`, and both sides are narrowed to the changed
/// keys.
pub fn compute_diff(before: Option<Entity>, after: Option<Entity>) -> AuditDiff {
    let (before, after) = match (before, after) {
        (Some(before), Some(after)) => (before, after),
        (before, after) => {
            return AuditDiff {
                changed_fields: Vec::new(),
                before,
                after,
            }
        },
    };

    let keys = before
        .keys()
        .chain(after.keys().filter(|key| !before.contains_key(*key)));

    let changed_fields: Vec<String> = keys
        .filter(|key| {
            let (b, a) = (before.get(*key), after.get(*key));
            is_comparable(b, a) && !same_value(b, a)
        })
        .cloned()
        .collect();

    AuditDiff {
        before: Some(pick(&before, &changed_fields)),
        after: Some(pick(&after, &changed_fields)),
        changed_fields,
    }
}
