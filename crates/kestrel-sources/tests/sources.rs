//! Filesystem manifests and the in-memory cluster against real files.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde_json::json;

use kestrel_core::{
    ClusterState, CoreError, KindInfo, ManifestSource, ResourceIdentifier, Validator,
};
use kestrel_drift::{DriftConfig, DriftEngine, DriftType};
use kestrel_sources::{
    FsManifestSource, MemoryCluster, PackageValidator, ReadinessValidator, SyncValidator,
};

const DU_MANIFEST: &str = "\
apiVersion: apps/v1
kind: Deployment
metadata:
  name: ran-du
  namespace: ran
spec:
  replicas: 3
---
apiVersion: v1
kind: ConfigMap
metadata:
  name: cfg-a
  namespace: ran
data:
  mode: sa
";

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[tokio::test]
async fn manifests_are_read_recursively_with_relative_sources() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "ran/du.yaml", DU_MANIFEST);
    write(
        dir.path(),
        "core/amf.yml",
        "this: is: broken\n---\napiVersion: v1\nkind: Service\nmetadata:\n  name: amf\n",
    );
    write(dir.path(), "docs/example.yaml", "apiVersion: v1\nkind: ConfigMap\n");
    write(dir.path(), "README.md", "# manifests\n");

    let declared = FsManifestSource::new(dir.path())
        .declared_resources()
        .await
        .unwrap();

    let found: Vec<(String, String, Option<String>)> = declared
        .iter()
        .map(|d| (d.id.kind.clone(), d.id.name.clone(), d.id.source_file.clone()))
        .collect();
    assert_eq!(
        found,
        vec![
            ("Service".into(), "amf".into(), Some("core/amf.yml".into())),
            ("Deployment".into(), "ran-du".into(), Some("ran/du.yaml".into())),
            ("ConfigMap".into(), "cfg-a".into(), Some("ran/du.yaml".into())),
        ]
    );
}

#[tokio::test]
async fn missing_manifest_root_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let source = FsManifestSource::new(dir.path().join("absent"));
    assert!(matches!(
        source.declared_resources().await,
        Err(CoreError::Manifest(_))
    ));
}

#[tokio::test]
async fn memory_cluster_crud() {
    let cluster = MemoryCluster::new().with_kind(KindInfo {
        api_version: "v1".into(),
        kind: "Secret".into(),
        namespaced: true,
    });
    let cfg = json!({
        "apiVersion": "v1",
        "kind": "ConfigMap",
        "metadata": {"name": "cfg-a", "namespace": "ran"},
        "data": {"mode": "sa"}
    });
    let id = ResourceIdentifier::new("v1", "ConfigMap", "ran", "cfg-a");

    cluster.create(&cfg).await.unwrap();
    assert!(matches!(
        cluster.create(&cfg).await,
        Err(CoreError::AlreadyExists(_))
    ));

    let mut changed = cfg.clone();
    changed["data"]["mode"] = json!("nsa");
    cluster.update(&changed).await.unwrap();
    assert_eq!(cluster.get(&id).await.unwrap(), Some(changed));

    let kinds: Vec<String> = cluster
        .list_kinds()
        .await
        .unwrap()
        .into_iter()
        .map(|k| k.kind)
        .collect();
    assert_eq!(kinds, vec!["ConfigMap", "Secret"]);

    let config_maps = KindInfo {
        api_version: "v1".into(),
        kind: "ConfigMap".into(),
        namespaced: true,
    };
    assert_eq!(cluster.list(&config_maps, Some("core")).await.unwrap().len(), 0);
    assert_eq!(cluster.list(&config_maps, None).await.unwrap().len(), 1);

    cluster.delete(&id).await.unwrap();
    assert!(matches!(
        cluster.delete(&id).await,
        Err(CoreError::NotFound(_))
    ));
    assert!(cluster.is_empty());
}

#[tokio::test]
async fn snapshot_directory_drives_a_drift_scan() {
    let manifests = tempfile::tempdir().unwrap();
    write(manifests.path(), "ran/du.yaml", DU_MANIFEST);

    let live = tempfile::tempdir().unwrap();
    write(
        live.path(),
        "export.yaml",
        &DU_MANIFEST.replace("replicas: 3", "replicas: 2"),
    );
    let cluster = MemoryCluster::load_dir(live.path()).unwrap();
    assert_eq!(cluster.len(), 2);

    let engine = DriftEngine::new(
        DriftConfig::default(),
        Arc::new(FsManifestSource::new(manifests.path())),
        Arc::new(cluster),
    );
    let scan = engine.scan().await.unwrap();

    assert_eq!(scan.total_resources, 2);
    assert_eq!(scan.drifted_resources, 1);
    let drifted: Vec<_> = scan.drifted().collect();
    assert_eq!(drifted[0].resource.name, "ran-du");
    assert_eq!(drifted[0].drift_type, DriftType::Modified);
    assert_eq!(drifted[0].changes[0].path, "spec.replicas");
}

#[tokio::test]
async fn readiness_compares_ready_and_desired_replicas() {
    let cluster = MemoryCluster::from_documents([
        json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {"name": "ran-du", "namespace": "ran"},
            "spec": {"replicas": 3},
            "status": {"readyReplicas": 3}
        }),
        json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {"name": "ran-cu", "namespace": "ran"},
            "spec": {"replicas": 2},
            "status": {"readyReplicas": 1}
        }),
    ]);
    let validator = ReadinessValidator::new(Arc::new(cluster));

    let report = validator.validate("edge01").await.unwrap();
    assert!(!report.success);
    assert_eq!(report.target, "edge01");
    assert_eq!(report.errors, vec!["deployment ran-cu: 1/2 replicas ready".to_string()]);
    assert_eq!(report.details, json!({ "deployments": 2 }));
}

#[tokio::test]
async fn package_validation_renders_the_package_directory() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "ran/du/deployment.yaml", DU_MANIFEST);
    write(dir.path(), "ran/cu/unnamed.yaml", "apiVersion: v1\nkind: Service\n");
    let validator = PackageValidator::new(dir.path());

    let du = validator.validate("ran/du").await.unwrap();
    assert!(du.success);
    assert_eq!(du.details, json!({ "resources": 2 }));

    let cu = validator.validate("ran/cu").await.unwrap();
    assert_eq!(
        cu.errors,
        vec!["Service in unnamed.yaml has no metadata.name".to_string()]
    );

    let missing = validator.validate("ran/ghost").await.unwrap();
    assert!(!missing.success);
}

#[tokio::test]
async fn sync_reports_resources_missing_from_the_cluster() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "ran/du/deployment.yaml", DU_MANIFEST);
    let cluster = MemoryCluster::from_documents([json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": {"name": "ran-du", "namespace": "ran"},
        "spec": {"replicas": 3}
    })]);
    let validator = SyncValidator::new(dir.path(), Arc::new(cluster));

    let report = validator.validate("ran/du").await.unwrap();
    assert!(!report.success);
    assert_eq!(report.errors, vec!["ConfigMap/ran/cfg-a not synced".to_string()]);
}
