use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::filter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    /// Declared but missing from the live object.
    Added,
    /// Present on the live object but not declared.
    Removed,
    Modified,
}

/// Structured before/after for a single diverging field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    /// Dotted/indexed path, e.g. `spec.template.spec.containers[0].image`.
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_value: Option<Value>,
    pub action: ChangeAction,
}

impl FieldChange {
    fn added(path: String, desired: &Value) -> Self {
        Self {
            path,
            desired_value: Some(desired.clone()),
            actual_value: None,
            action: ChangeAction::Added,
        }
    }

    fn removed(path: String, actual: &Value) -> Self {
        Self {
            path,
            desired_value: None,
            actual_value: Some(actual.clone()),
            action: ChangeAction::Removed,
        }
    }

    fn modified(path: String, desired: &Value, actual: &Value) -> Self {
        Self {
            path,
            desired_value: Some(desired.clone()),
            actual_value: Some(actual.clone()),
            action: ChangeAction::Modified,
        }
    }
}

/// Compare a declared document against its live counterpart.
///
/// Only `spec` and the `labels`/`annotations` under `metadata` take part;
/// everything else is outside declared intent. A section declared but
/// absent on the live side is reported as one `added` change; a section
/// only the live side carries is ignored.
pub fn compare_resources(
    desired: &Value,
    actual: &Value,
    ignore_fields: &[String],
) -> Vec<FieldChange> {
    let desired = filter::comparable(desired, ignore_fields);
    let actual = filter::comparable(actual, ignore_fields);
    let mut changes = Vec::new();

    compare_section("spec", desired.get("spec"), actual.get("spec"), &mut changes);

    let desired_meta = desired.get("metadata");
    let actual_meta = actual.get("metadata");
    compare_section(
        "metadata.labels",
        desired_meta.and_then(|m| m.get("labels")),
        actual_meta.and_then(|m| m.get("labels")),
        &mut changes,
    );

    let desired_annotations = desired_meta
        .and_then(|m| m.get("annotations"))
        .map(filter::user_annotations);
    let actual_annotations = actual_meta
        .and_then(|m| m.get("annotations"))
        .map(filter::user_annotations);
    compare_section(
        "metadata.annotations",
        desired_annotations.as_ref(),
        actual_annotations.as_ref(),
        &mut changes,
    );

    changes
}

fn compare_section(
    path: &str,
    desired: Option<&Value>,
    actual: Option<&Value>,
    changes: &mut Vec<FieldChange>,
) {
    match (desired, actual) {
        (Some(d), Some(a)) => diff_values(path, d, a, changes),
        (Some(d), None) => changes.push(FieldChange::added(path.to_string(), d)),
        (None, _) => {}
    }
}

/// Recursive structural diff.
///
/// Maps report added then removed keys before recursing into shared
/// keys. Arrays of different length are one `modified` change for the
/// whole array; equal-length arrays recurse by index. A type mismatch is
/// one `modified` change at that path.
pub fn diff_values(path: &str, desired: &Value, actual: &Value, changes: &mut Vec<FieldChange>) {
    match (desired, actual) {
        (Value::Object(d), Value::Object(a)) => {
            for (key, value) in d.iter().filter(|(key, _)| !a.contains_key(*key)) {
                changes.push(FieldChange::added(join(path, key), value));
            }
            for (key, value) in a.iter().filter(|(key, _)| !d.contains_key(*key)) {
                changes.push(FieldChange::removed(join(path, key), value));
            }
            for (key, d_value) in d {
                if let Some(a_value) = a.get(key) {
                    diff_values(&join(path, key), d_value, a_value, changes);
                }
            }
        }
        (Value::Array(d), Value::Array(a)) => {
            if d.len() != a.len() {
                changes.push(FieldChange::modified(path.to_string(), desired, actual));
                return;
            }
            for (i, (d_item, a_item)) in d.iter().zip(a).enumerate() {
                diff_values(&format!("{path}[{i}]"), d_item, a_item, changes);
            }
        }
        _ => {
            if !scalar_eq(desired, actual) {
                changes.push(FieldChange::modified(path.to_string(), desired, actual));
            }
        }
    }
}

/// Numbers compare by value so `3` and `3.0` are the same replica count.
fn scalar_eq(desired: &Value, actual: &Value) -> bool {
    match (desired, actual) {
        (Value::Number(d), Value::Number(a)) => match (d.as_f64(), a.as_f64()) {
            (Some(d), Some(a)) => d == a,
            _ => d == a,
        },
        _ => desired == actual,
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}
