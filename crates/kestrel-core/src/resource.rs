use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identity of a declared or live resource.
///
/// `source_file` is informational only: it records where a declared
/// resource came from and never participates in the correlation key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceIdentifier {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
}

impl ResourceIdentifier {
    pub fn new(
        api_version: impl Into<String>,
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
            name: name.into(),
            namespace: namespace.into(),
            source_file: None,
        }
    }

    /// Read the identity out of a resource document. `None` if `apiVersion`
    /// or `kind` is missing.
    pub fn from_document(doc: &Value) -> Option<Self> {
        let api_version = doc.get("apiVersion")?.as_str()?;
        let kind = doc.get("kind")?.as_str()?;
        if api_version.is_empty() || kind.is_empty() {
            return None;
        }
        Some(Self::new(
            api_version,
            kind,
            namespace(doc).unwrap_or_default(),
            name(doc).unwrap_or_default(),
        ))
    }

    pub fn with_source(mut self, source_file: impl Into<String>) -> Self {
        self.source_file = Some(source_file.into());
        self
    }

    pub fn key(&self) -> ResourceKey {
        ResourceKey {
            api_version: self.api_version.clone(),
            kind: self.kind.clone(),
            namespace: self.namespace.clone(),
            name: self.name.clone(),
        }
    }

    /// True when both identifiers address the same object.
    pub fn matches(&self, other: &ResourceIdentifier) -> bool {
        self.api_version == other.api_version
            && self.kind == other.kind
            && self.name == other.name
            && self.namespace == other.namespace
    }
}

impl fmt::Display for ResourceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}/{}", self.kind, self.name)
        } else {
            write!(f, "{}/{}/{}", self.kind, self.namespace, self.name)
        }
    }
}

/// Correlation key for declared vs. live resources:
/// (apiVersion, kind, namespace, name).
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceKey {
    pub api_version: String,
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.api_version, self.kind, self.namespace, self.name
        )
    }
}

pub fn metadata(doc: &Value) -> Option<&Map<String, Value>> {
    doc.get("metadata")?.as_object()
}

pub fn name(doc: &Value) -> Option<String> {
    metadata(doc)?.get("name")?.as_str().map(String::from)
}

pub fn namespace(doc: &Value) -> Option<String> {
    metadata(doc)?.get("namespace")?.as_str().map(String::from)
}

pub fn labels(doc: &Value) -> Option<&Map<String, Value>> {
    metadata(doc)?.get("labels")?.as_object()
}

pub fn annotations(doc: &Value) -> Option<&Map<String, Value>> {
    metadata(doc)?.get("annotations")?.as_object()
}

/// Look up a dotted path (`spec.template.spec`) in a document.
pub fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(doc, |current, segment| current.get(segment))
}
