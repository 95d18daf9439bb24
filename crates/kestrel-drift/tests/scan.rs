//! Scan and remediation behaviour against in-memory collaborators.

use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

use kestrel_core::{
    BoxFuture, ClusterState, CoreError, DeclaredResource, KindInfo, ManifestSource,
    ResourceIdentifier, RollbackOutcome, RollbackTrigger, ValidationReport,
};
use kestrel_drift::{
    ChangeAction, DriftConfig, DriftEngine, DriftError, DriftType, RemediationMode, Severity,
};

struct StaticManifests {
    docs: Vec<Value>,
    fail: bool,
}

impl ManifestSource for StaticManifests {
    fn declared_resources(&self) -> BoxFuture<'_, Result<Vec<DeclaredResource>, CoreError>> {
        Box::pin(async move {
            if self.fail {
                return Err(CoreError::Manifest("repository unreadable".into()));
            }
            Ok(self
                .docs
                .iter()
                .map(|doc| DeclaredResource {
                    id: ResourceIdentifier::from_document(doc)
                        .unwrap()
                        .with_source("clusters/edge01/ran.yaml"),
                    content: doc.clone(),
                })
                .collect())
        })
    }
}

#[derive(Default)]
struct FakeCluster {
    live: Mutex<Vec<Value>>,
    broken_kind: Option<String>,
    reject_writes_for: Option<String>,
}

impl FakeCluster {
    fn with(live: Vec<Value>) -> Self {
        Self {
            live: Mutex::new(live),
            ..Self::default()
        }
    }

    fn find(&self, id: &ResourceIdentifier) -> Option<Value> {
        self.live
            .lock()
            .unwrap()
            .iter()
            .find(|doc| ResourceIdentifier::from_document(doc).is_some_and(|d| d.matches(id)))
            .cloned()
    }

    fn check_writable(&self, doc_name: &str) -> Result<(), CoreError> {
        match &self.reject_writes_for {
            Some(name) if name == doc_name => {
                Err(CoreError::Cluster(format!("admission webhook denied {doc_name}")))
            }
            _ => Ok(()),
        }
    }
}

impl ClusterState for FakeCluster {
    fn list_kinds(&self) -> BoxFuture<'_, Result<Vec<KindInfo>, CoreError>> {
        Box::pin(async move {
            Ok([
                ("apps/v1", "Deployment"),
                ("v1", "ConfigMap"),
                ("v1", "Service"),
                ("batch/v1", "Job"),
            ]
            .into_iter()
            .map(|(api_version, kind)| KindInfo {
                api_version: api_version.into(),
                kind: kind.into(),
                namespaced: true,
            })
            .collect())
        })
    }

    fn list<'a>(
        &'a self,
        kind: &'a KindInfo,
        _namespace: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Vec<Value>, CoreError>> {
        Box::pin(async move {
            if self.broken_kind.as_deref() == Some(kind.kind.as_str()) {
                return Err(CoreError::Cluster("the server is currently unavailable".into()));
            }
            Ok(self
                .live
                .lock()
                .unwrap()
                .iter()
                .filter(|doc| doc["kind"] == kind.kind.as_str())
                .cloned()
                .collect())
        })
    }

    fn get<'a>(
        &'a self,
        id: &'a ResourceIdentifier,
    ) -> BoxFuture<'a, Result<Option<Value>, CoreError>> {
        Box::pin(async move { Ok(self.find(id)) })
    }

    fn create<'a>(&'a self, resource: &'a Value) -> BoxFuture<'a, Result<(), CoreError>> {
        Box::pin(async move {
            let id = ResourceIdentifier::from_document(resource).unwrap();
            self.check_writable(&id.name)?;
            self.live.lock().unwrap().push(resource.clone());
            Ok(())
        })
    }

    fn update<'a>(&'a self, resource: &'a Value) -> BoxFuture<'a, Result<(), CoreError>> {
        Box::pin(async move {
            let id = ResourceIdentifier::from_document(resource).unwrap();
            self.check_writable(&id.name)?;
            let mut live = self.live.lock().unwrap();
            let slot = live
                .iter_mut()
                .find(|doc| ResourceIdentifier::from_document(doc).is_some_and(|d| d.matches(&id)))
                .ok_or_else(|| CoreError::NotFound(id.to_string()))?;
            *slot = resource.clone();
            Ok(())
        })
    }

    fn delete<'a>(&'a self, id: &'a ResourceIdentifier) -> BoxFuture<'a, Result<(), CoreError>> {
        Box::pin(async move {
            self.check_writable(&id.name)?;
            self.live
                .lock()
                .unwrap()
                .retain(|doc| !ResourceIdentifier::from_document(doc).is_some_and(|d| d.matches(id)));
            Ok(())
        })
    }
}

#[derive(Default)]
struct RecordingTrigger {
    reasons: Mutex<Vec<String>>,
}

impl RollbackTrigger for RecordingTrigger {
    fn roll_back<'a>(
        &'a self,
        reason: &'a str,
    ) -> BoxFuture<'a, Result<RollbackOutcome, CoreError>> {
        Box::pin(async move {
            self.reasons.lock().unwrap().push(reason.to_string());
            Ok(RollbackOutcome {
                rollback_id: "rollback-1-abcd0123".into(),
                status: "completed".into(),
                target_commit: "a1b2c3d".into(),
                errors: Vec::new(),
            })
        })
    }

    fn on_validation_failure<'a>(
        &'a self,
        _report: &'a ValidationReport,
    ) -> BoxFuture<'a, Result<Option<RollbackOutcome>, CoreError>> {
        Box::pin(async move { Ok(None) })
    }
}

fn ran_du(replicas: u64) -> Value {
    json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": {"name": "ran-du", "namespace": "ran", "labels": {"app": "ran-du"}},
        "spec": {
            "replicas": replicas,
            "template": {"spec": {"containers": [{"name": "du", "image": "oran/du:1.4"}]}}
        }
    })
}

fn live(mut doc: Value) -> Value {
    let meta = doc["metadata"].as_object_mut().unwrap();
    meta.insert("uid".into(), json!("3f9e"));
    meta.insert("resourceVersion".into(), json!("88121"));
    meta.insert("generation".into(), json!(4));
    doc["status"] = json!({"observedGeneration": 4});
    doc
}

fn cfg_a() -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "ConfigMap",
        "metadata": {"name": "cfg-a", "namespace": "ran"},
        "data": {"mode": "standalone"}
    })
}

fn engine(config: DriftConfig, declared: Vec<Value>, cluster: Arc<FakeCluster>) -> DriftEngine {
    DriftEngine::new(
        config,
        Arc::new(StaticManifests {
            docs: declared,
            fail: false,
        }),
        cluster,
    )
}

#[tokio::test]
async fn replica_drift_on_deployment() {
    let cluster = Arc::new(FakeCluster::with(vec![live(ran_du(2))]));
    let engine = engine(DriftConfig::default(), vec![ran_du(3)], cluster);

    let scan = engine.scan().await.unwrap();
    assert_eq!(scan.total_resources, 1);
    assert_eq!(scan.drifted_resources, 1);

    let result = &scan.results[0];
    assert_eq!(result.drift_type, DriftType::Modified);
    assert_eq!(result.changes.len(), 1);
    let change = &result.changes[0];
    assert_eq!(change.path, "spec.replicas");
    assert_eq!(change.desired_value, Some(json!(3)));
    assert_eq!(change.actual_value, Some(json!(2)));
    assert_eq!(change.action, ChangeAction::Modified);

    // Deployment and the `ran-` prefix both mark it critical; the change
    // itself is a high-impact replica change.
    assert_eq!(result.impact, Severity::High);
    assert_eq!(result.severity, Severity::Critical);
    assert_eq!(result.resource.source_file.as_deref(), Some("clusters/edge01/ran.yaml"));
}

#[tokio::test]
async fn missing_configmap_is_deleted_high() {
    let cluster = Arc::new(FakeCluster::default());
    let engine = engine(DriftConfig::default(), vec![cfg_a()], cluster);

    let scan = engine.scan().await.unwrap();
    let result = &scan.results[0];
    assert_eq!(result.drift_type, DriftType::Deleted);
    assert_eq!(result.severity, Severity::High);
    assert!(result.actual_state.is_none());
    assert_eq!(scan.summary.by_type.get(&DriftType::Deleted), Some(&1));
    assert_eq!(scan.summary.by_kind.get("ConfigMap"), Some(&1));
}

#[tokio::test]
async fn declared_job_missing_from_cluster_is_deleted() {
    let job = json!({
        "apiVersion": "batch/v1",
        "kind": "Job",
        "metadata": {"name": "migrate", "namespace": "ran"},
        "spec": {"backoffLimit": 2}
    });
    let engine = engine(DriftConfig::default(), vec![job], Arc::new(FakeCluster::default()));

    let scan = engine.scan().await.unwrap();
    assert_eq!(scan.total_resources, 1);
    assert_eq!(scan.drifted_resources, 1);
    assert_eq!(scan.results[0].drift_type, DriftType::Deleted);
    assert_eq!(scan.results[0].severity, Severity::High);
}

#[tokio::test]
async fn identical_state_has_no_drift() {
    let cluster = Arc::new(FakeCluster::with(vec![live(ran_du(3)), live(cfg_a())]));
    let engine = engine(DriftConfig::default(), vec![ran_du(3), cfg_a()], cluster);

    let scan = engine.scan().await.unwrap();
    assert_eq!(scan.total_resources, 2);
    assert_eq!(scan.drifted_resources, 0);
    assert!(scan.results.iter().all(|r| !r.has_drift && r.changes.is_empty()));
    assert!(scan.remediation.is_none());
}

#[tokio::test]
async fn ignore_fields_suppress_drift() {
    let cluster = Arc::new(FakeCluster::with(vec![live(ran_du(2))]));
    let config = DriftConfig {
        ignore_fields: vec!["spec.replicas".into()],
        ..DriftConfig::default()
    };
    let scan = engine(config, vec![ran_du(3)], cluster).scan().await.unwrap();
    assert_eq!(scan.drifted_resources, 0);
}

#[tokio::test]
async fn checksum_ignores_change_content() {
    let a = engine(
        DriftConfig::default(),
        vec![ran_du(3)],
        Arc::new(FakeCluster::with(vec![live(ran_du(2))])),
    )
    .scan()
    .await
    .unwrap();
    let b = engine(
        DriftConfig::default(),
        vec![ran_du(5)],
        Arc::new(FakeCluster::with(vec![live(ran_du(1))])),
    )
    .scan()
    .await
    .unwrap();

    assert_ne!(a.results[0].changes, b.results[0].changes);
    assert_eq!(a.results[0].checksum, b.results[0].checksum);
}

#[tokio::test]
async fn repeated_scans_produce_identical_summaries() {
    let cluster = Arc::new(FakeCluster::with(vec![live(ran_du(2))]));
    let engine = engine(DriftConfig::default(), vec![ran_du(3), cfg_a()], cluster);

    let first = engine.scan().await.unwrap();
    let second = engine.scan().await.unwrap();
    assert_ne!(first.scan_id, second.scan_id);
    assert_eq!(first.summary, second.summary);
    assert_eq!(first.drifted_resources, second.drifted_resources);
    assert_eq!(first.total_resources, second.total_resources);
}

#[tokio::test]
async fn unmanaged_live_resources_are_ignored() {
    let debug_pod_config = json!({
        "apiVersion": "v1",
        "kind": "ConfigMap",
        "metadata": {"name": "debug", "namespace": "ran"}
    });
    let tracked = json!({
        "apiVersion": "v1",
        "kind": "ConfigMap",
        "metadata": {
            "name": "stale",
            "namespace": "ran",
            "annotations": {"gitops.oran.io/managed": "true"}
        }
    });
    let cluster = Arc::new(FakeCluster::with(vec![debug_pod_config, tracked]));
    let scan = engine(DriftConfig::default(), Vec::new(), cluster)
        .scan()
        .await
        .unwrap();

    assert_eq!(scan.results.len(), 1);
    assert_eq!(scan.results[0].resource.name, "stale");
    assert_eq!(scan.results[0].drift_type, DriftType::Added);
}

#[tokio::test]
async fn failing_kind_is_skipped() {
    let cluster = Arc::new(FakeCluster {
        live: Mutex::new(vec![live(ran_du(3))]),
        broken_kind: Some("ConfigMap".into()),
        reject_writes_for: None,
    });
    let scan = engine(DriftConfig::default(), vec![ran_du(3)], cluster)
        .scan()
        .await
        .unwrap();
    assert_eq!(scan.drifted_resources, 0);
}

#[tokio::test]
async fn unreadable_manifests_abort_scan() {
    let engine = DriftEngine::new(
        DriftConfig::default(),
        Arc::new(StaticManifests {
            docs: Vec::new(),
            fail: true,
        }),
        Arc::new(FakeCluster::default()),
    );
    let err = engine.scan().await.unwrap_err();
    assert!(matches!(err, DriftError::DesiredState(_)));
    assert!(engine.last_scan().is_none());
}

#[tokio::test]
async fn disabled_engine_refuses_to_scan() {
    let config = DriftConfig {
        enabled: false,
        ..DriftConfig::default()
    };
    let err = engine(config, Vec::new(), Arc::new(FakeCluster::default()))
        .scan()
        .await
        .unwrap_err();
    assert!(matches!(err, DriftError::Disabled));
}

#[tokio::test]
async fn cache_tracks_latest_scan() {
    let cluster = Arc::new(FakeCluster::with(vec![live(ran_du(2))]));
    let engine = engine(DriftConfig::default(), vec![ran_du(3)], cluster.clone());

    engine.scan().await.unwrap();
    let key = ResourceIdentifier::new("apps/v1", "Deployment", "ran", "ran-du").key();
    assert!(engine.cached(&key).unwrap().has_drift);

    *cluster.live.lock().unwrap() = vec![live(ran_du(3))];
    engine.scan().await.unwrap();
    assert!(!engine.cached(&key).unwrap().has_drift);
    assert_eq!(engine.drift_status().len(), 1);
    assert!(engine.last_scan().is_some());
}

#[tokio::test]
async fn correct_mode_restores_declared_state() {
    let cluster = Arc::new(FakeCluster::with(vec![live(ran_du(2))]));
    let config = DriftConfig {
        remediation: RemediationMode::Correct,
        ..DriftConfig::default()
    };
    let engine = engine(config, vec![ran_du(3), cfg_a()], cluster.clone());

    let scan = engine.scan().await.unwrap();
    let report = scan.remediation.unwrap();
    assert_eq!(report.attempted, 2);
    assert_eq!(report.succeeded, 2);

    let deployment = cluster
        .find(&ResourceIdentifier::new("apps/v1", "Deployment", "ran", "ran-du"))
        .unwrap();
    assert_eq!(deployment["spec"]["replicas"], 3);
    assert!(
        cluster
            .find(&ResourceIdentifier::new("v1", "ConfigMap", "ran", "cfg-a"))
            .is_some()
    );

    let rescan = engine.scan().await.unwrap();
    assert_eq!(rescan.drifted_resources, 0);
}

#[tokio::test]
async fn remediation_attempts_all_and_aggregates_failures() {
    let cluster = Arc::new(FakeCluster {
        live: Mutex::new(vec![live(ran_du(2))]),
        broken_kind: None,
        reject_writes_for: Some("ran-du".into()),
    });
    let config = DriftConfig {
        remediation: RemediationMode::Correct,
        ..DriftConfig::default()
    };
    let engine = engine(config, vec![ran_du(3), cfg_a()], cluster.clone());

    let scan = engine.scan().await.unwrap();
    let report = scan.remediation.clone().unwrap();
    assert_eq!(report.attempted, 2);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].contains("admission webhook denied"));

    let err = engine.remediate(&scan.results).await.unwrap_err();
    match err {
        DriftError::Remediation { failures } => assert_eq!(failures.len(), 1),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn rollback_mode_without_trigger_reports_failure() {
    let config = DriftConfig {
        remediation: RemediationMode::Rollback,
        ..DriftConfig::default()
    };
    let scan = engine(config, vec![cfg_a()], Arc::new(FakeCluster::default()))
        .scan()
        .await
        .unwrap();
    let report = scan.remediation.unwrap();
    assert_eq!(report.failures, vec!["rollback remediation not configured".to_string()]);
}

#[tokio::test]
async fn rollback_mode_hands_off_to_trigger() {
    let trigger = Arc::new(RecordingTrigger::default());
    let config = DriftConfig {
        remediation: RemediationMode::Rollback,
        ..DriftConfig::default()
    };
    let engine = engine(config, vec![cfg_a()], Arc::new(FakeCluster::default()))
        .with_rollback(trigger.clone());

    let scan = engine.scan().await.unwrap();
    let report = scan.remediation.unwrap();
    assert!(report.is_success());
    assert_eq!(report.rollback_id.as_deref(), Some("rollback-1-abcd0123"));
    assert_eq!(
        trigger.reasons.lock().unwrap().as_slice(),
        ["drift detected in 1 resources (0 critical)".to_string()]
    );
}
