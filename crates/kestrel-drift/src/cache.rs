use std::collections::HashMap;
use std::sync::RwLock;

use jiff::Timestamp;

use kestrel_core::ResourceKey;

use crate::result::DriftResult;

#[derive(Debug, Default)]
struct Inner {
    results: HashMap<ResourceKey, DriftResult>,
    last_scan: Option<Timestamp>,
}

/// Last known drift result per resource.
///
/// Many concurrent readers; one scan writes at a time. Entries are
/// replaced, never mutated, so readers always see a whole result.
#[derive(Debug, Default)]
pub struct DriftCache {
    inner: RwLock<Inner>,
}

impl DriftCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one scan's results, replacing prior entries for the same keys.
    pub fn record(&self, scanned_at: Timestamp, results: &[DriftResult]) {
        let mut inner = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        inner.last_scan = Some(scanned_at);
        for result in results {
            inner.results.insert(result.resource.key(), result.clone());
        }
    }

    pub fn get(&self, key: &ResourceKey) -> Option<DriftResult> {
        match self.inner.read() {
            Ok(inner) => inner.results.get(key).cloned(),
            Err(poisoned) => poisoned.into_inner().results.get(key).cloned(),
        }
    }

    /// Copy of every cached result, ordered by resource key.
    pub fn snapshot(&self) -> Vec<DriftResult> {
        let inner = match self.inner.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut results: Vec<_> = inner.results.values().cloned().collect();
        results.sort_by_key(|r| r.resource.key());
        results
    }

    pub fn last_scan(&self) -> Option<Timestamp> {
        match self.inner.read() {
            Ok(inner) => inner.last_scan,
            Err(poisoned) => poisoned.into_inner().last_scan,
        }
    }

    pub fn len(&self) -> usize {
        match self.inner.read() {
            Ok(inner) => inner.results.len(),
            Err(poisoned) => poisoned.into_inner().results.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
