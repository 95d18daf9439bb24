use serde_json::{Map, Value};

/// Metadata the API server owns; never part of declared intent.
const VOLATILE_METADATA: &[&str] = &[
    "resourceVersion",
    "generation",
    "managedFields",
    "uid",
    "creationTimestamp",
    "selfLink",
    "deletionTimestamp",
    "deletionGracePeriodSeconds",
];

/// Annotation prefixes written by tooling and controllers.
const SYSTEM_ANNOTATION_PREFIXES: &[&str] = &[
    "kubectl.kubernetes.io/",
    "deployment.kubernetes.io/",
    "pv.kubernetes.io/",
];

/// Strip `status`, volatile metadata and configured ignore fields.
pub fn comparable(doc: &Value, ignore_fields: &[String]) -> Value {
    let Some(obj) = doc.as_object() else {
        return doc.clone();
    };

    let mut filtered: Map<String, Value> = obj
        .iter()
        .filter(|(key, _)| key.as_str() != "status")
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    if let Some(Value::Object(meta)) = filtered.get_mut("metadata") {
        meta.retain(|key, _| !VOLATILE_METADATA.contains(&key.as_str()));
    }

    let mut filtered = Value::Object(filtered);
    for field in ignore_fields {
        remove_path(&mut filtered, field);
    }
    filtered
}

/// Remove the value at a dotted path, if present.
fn remove_path(doc: &mut Value, path: &str) {
    let mut segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
    let Some(last) = segments.pop() else {
        return;
    };

    let mut current = doc;
    for segment in segments {
        match current.get_mut(segment) {
            Some(next) => current = next,
            None => return,
        }
    }
    if let Some(obj) = current.as_object_mut() {
        obj.remove(last);
    }
}

/// Drop annotations owned by tooling, keeping user-managed ones.
pub fn user_annotations(annotations: &Value) -> Value {
    match annotations.as_object() {
        Some(map) => Value::Object(
            map.iter()
                .filter(|(key, _)| {
                    !SYSTEM_ANNOTATION_PREFIXES
                        .iter()
                        .any(|prefix| key.starts_with(prefix))
                })
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        ),
        None => annotations.clone(),
    }
}
