//! Rollback execution against in-memory version control and cluster.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use jiff::Timestamp;
use serde_json::Value;

use kestrel_core::{
    BoxFuture, ClusterState, Commit, CoreError, KindInfo, RepoStatus, ResourceIdentifier,
    RollbackTrigger, ValidationReport, Validator, VersionControl,
};
use kestrel_rollback::{
    HistoryPersistence, ResourceStatus, RollbackAction, RollbackConfig, RollbackEngine,
    RollbackStatus,
};

fn hash(seed: char) -> String {
    std::iter::repeat_n(seed, 40).collect()
}

struct FakeRepo {
    commits: Vec<Commit>,
    changed: Vec<String>,
    files: HashMap<(String, String), String>,
    calls: Mutex<Vec<String>>,
}

impl FakeRepo {
    /// head = c, previous = b, oldest = a.
    fn new() -> Self {
        let commits = ['c', 'b', 'a']
            .into_iter()
            .map(|seed| Commit {
                hash: hash(seed),
                author: "ops".into(),
                email: "ops@example.org".into(),
                date: Timestamp::UNIX_EPOCH,
                message: format!("commit {seed}"),
                files: Vec::new(),
            })
            .collect();
        Self {
            commits,
            changed: Vec::new(),
            files: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn file(mut self, path: &str, seed: char, content: &str) -> Self {
        if !self.changed.iter().any(|p| p == path) {
            self.changed.push(path.to_string());
        }
        self.files
            .insert((path.to_string(), hash(seed)), content.to_string());
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl VersionControl for FakeRepo {
    fn current_revision(&self) -> BoxFuture<'_, Result<String, CoreError>> {
        Box::pin(async move { Ok(self.commits[0].hash.clone()) })
    }

    fn history(&self, limit: usize) -> BoxFuture<'_, Result<Vec<Commit>, CoreError>> {
        Box::pin(async move { Ok(self.commits.iter().take(limit).cloned().collect()) })
    }

    fn changed_files<'a>(
        &'a self,
        _from_rev: &'a str,
        _to_rev: &'a str,
    ) -> BoxFuture<'a, Result<Vec<String>, CoreError>> {
        Box::pin(async move { Ok(self.changed.clone()) })
    }

    fn file_at<'a>(
        &'a self,
        path: &'a str,
        rev: &'a str,
    ) -> BoxFuture<'a, Result<Option<String>, CoreError>> {
        Box::pin(async move {
            Ok(self
                .files
                .get(&(path.to_string(), rev.to_string()))
                .cloned())
        })
    }

    fn checkout<'a>(&'a self, rev: &'a str) -> BoxFuture<'a, Result<(), CoreError>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(format!("checkout {rev}"));
            Ok(())
        })
    }

    fn reset<'a>(&'a self, rev: &'a str, hard: bool) -> BoxFuture<'a, Result<(), CoreError>> {
        Box::pin(async move {
            self.calls
                .lock()
                .unwrap()
                .push(format!("reset {rev} hard={hard}"));
            Ok(())
        })
    }

    fn create_branch<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<(), CoreError>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(format!("branch {name}"));
            Ok(())
        })
    }

    fn pull(&self) -> BoxFuture<'_, Result<(), CoreError>> {
        Box::pin(async move { Ok(()) })
    }

    fn status(&self) -> BoxFuture<'_, Result<RepoStatus, CoreError>> {
        Box::pin(async move {
            Ok(RepoStatus {
                branch: "main".into(),
                last_commit: self.commits[0].hash.clone(),
                clean: true,
            })
        })
    }
}

#[derive(Default)]
struct RecordingCluster {
    ops: Mutex<Vec<String>>,
    reject: Option<String>,
}

impl RecordingCluster {
    fn rejecting(name: &str) -> Self {
        Self {
            reject: Some(name.to_string()),
            ..Self::default()
        }
    }

    fn record(&self, op: &str, name: &str) -> Result<(), CoreError> {
        if self.reject.as_deref() == Some(name) {
            return Err(CoreError::Cluster(format!("{op} {name} forbidden")));
        }
        self.ops.lock().unwrap().push(format!("{op} {name}"));
        Ok(())
    }

    fn ops(&self) -> Vec<String> {
        self.ops.lock().unwrap().clone()
    }
}

fn doc_name(doc: &Value) -> String {
    doc["metadata"]["name"].as_str().unwrap_or_default().to_string()
}

impl ClusterState for RecordingCluster {
    fn list_kinds(&self) -> BoxFuture<'_, Result<Vec<KindInfo>, CoreError>> {
        Box::pin(async move { Ok(Vec::new()) })
    }

    fn list<'a>(
        &'a self,
        _kind: &'a KindInfo,
        _namespace: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Vec<Value>, CoreError>> {
        Box::pin(async move { Ok(Vec::new()) })
    }

    fn get<'a>(
        &'a self,
        _id: &'a ResourceIdentifier,
    ) -> BoxFuture<'a, Result<Option<Value>, CoreError>> {
        Box::pin(async move { Ok(None) })
    }

    fn create<'a>(&'a self, resource: &'a Value) -> BoxFuture<'a, Result<(), CoreError>> {
        Box::pin(async move { self.record("create", &doc_name(resource)) })
    }

    fn update<'a>(&'a self, resource: &'a Value) -> BoxFuture<'a, Result<(), CoreError>> {
        Box::pin(async move {
            let replicas = &resource["spec"]["replicas"];
            let name = doc_name(resource);
            if replicas.is_null() {
                self.record("update", &name)
            } else {
                self.record("update", &format!("{name} replicas={replicas}"))
            }
        })
    }

    fn delete<'a>(&'a self, id: &'a ResourceIdentifier) -> BoxFuture<'a, Result<(), CoreError>> {
        Box::pin(async move { self.record("delete", &id.name) })
    }
}

struct FixedValidator(ValidationReport);

impl Validator for FixedValidator {
    fn validate<'a>(
        &'a self,
        _target: &'a str,
    ) -> BoxFuture<'a, Result<ValidationReport, CoreError>> {
        Box::pin(async move { Ok(self.0.clone()) })
    }
}

const RAN_DU_HEAD: &str = "\
apiVersion: apps/v1
kind: Deployment
metadata:
  name: ran-du
  namespace: ran
spec:
  replicas: 5
";

const RAN_DU_TARGET: &str = "\
apiVersion: apps/v1
kind: Deployment
metadata:
  name: ran-du
  namespace: ran
spec:
  replicas: 3
";

const CONFIG_HEAD: &str = "\
apiVersion: v1
kind: ConfigMap
metadata:
  name: cfg-new
  namespace: ran
";

const CONFIG_TARGET: &str = "\
apiVersion: v1
kind: ConfigMap
metadata:
  name: cfg-old
  namespace: ran
";

fn repo() -> FakeRepo {
    FakeRepo::new()
        .file("apps/ran-du.yaml", 'c', RAN_DU_HEAD)
        .file("apps/ran-du.yaml", 'a', RAN_DU_TARGET)
        .file("apps/config.yaml", 'c', CONFIG_HEAD)
        .file("apps/config.yaml", 'a', CONFIG_TARGET)
        .file("docs/example.yaml", 'c', CONFIG_HEAD)
}

fn config() -> RollbackConfig {
    RollbackConfig {
        settle_delay: Duration::ZERO,
        ..RollbackConfig::default()
    }
}

#[tokio::test]
async fn executes_plan_in_priority_order() {
    let repo = Arc::new(repo());
    let cluster = Arc::new(RecordingCluster::default());
    let engine = RollbackEngine::new(config(), repo.clone(), cluster.clone());

    let state = engine.execute("deployment failed on edge01", &hash('a')).await;

    assert_eq!(state.status, RollbackStatus::Completed, "{:?}", state.errors);
    assert_eq!(state.source_commit, hash('c'));
    assert_eq!(state.target_commit, hash('a'));
    assert_eq!(
        cluster.ops(),
        vec![
            "delete cfg-new".to_string(),
            "update ran-du replicas=3".to_string(),
            "create cfg-old".to_string(),
        ]
    );
    assert!(state.resources.iter().all(|r| r.status == ResourceStatus::Success));

    let reverts: Vec<_> = state
        .resources
        .iter()
        .filter(|r| r.kind == "Deployment")
        .collect();
    assert_eq!(reverts.len(), 1);
    assert_eq!(reverts[0].action, RollbackAction::Revert);

    let calls = repo.calls();
    assert!(calls[0].starts_with("branch backup-"));
    assert_eq!(calls[1], format!("reset {} hard=true", hash('a')));
}

#[tokio::test]
async fn short_hash_resolves_to_full_commit() {
    let engine = RollbackEngine::new(
        config(),
        Arc::new(repo()),
        Arc::new(RecordingCluster::default()),
    );
    let state = engine.execute("manual", "aaaaaaa").await;
    assert_eq!(state.status, RollbackStatus::Completed);
    assert_eq!(state.target_commit, hash('a'));
}

#[tokio::test]
async fn unknown_target_is_cancelled_without_side_effects() {
    let repo = Arc::new(repo());
    let cluster = Arc::new(RecordingCluster::default());
    let engine = RollbackEngine::new(config(), repo.clone(), cluster.clone());

    let state = engine.execute("manual", "deadbeef").await;
    assert_eq!(state.status, RollbackStatus::Cancelled);
    assert!(state.errors[0].contains("not found"));
    assert!(repo.calls().is_empty());
    assert!(cluster.ops().is_empty());
}

#[tokio::test]
async fn disabled_engine_cancels() {
    let engine = RollbackEngine::new(
        RollbackConfig {
            enabled: false,
            ..config()
        },
        Arc::new(repo()),
        Arc::new(RecordingCluster::default()),
    );
    let state = engine.execute("manual", &hash('a')).await;
    assert_eq!(state.status, RollbackStatus::Cancelled);
    assert_eq!(state.errors, vec!["rollback is disabled".to_string()]);
}

#[tokio::test]
async fn quota_limits_rollbacks() {
    let engine = RollbackEngine::new(
        RollbackConfig {
            max_rollbacks: 1,
            ..config()
        },
        Arc::new(repo()),
        Arc::new(RecordingCluster::default()),
    );

    let first = engine.execute("manual", &hash('a')).await;
    assert_eq!(first.status, RollbackStatus::Completed);

    let second = engine.execute("manual", &hash('a')).await;
    assert_eq!(second.status, RollbackStatus::Cancelled);
    assert!(second.errors[0].contains("maximum rollback limit reached"));
    assert_eq!(engine.history().operations.len(), 2);
}

#[tokio::test]
async fn first_failure_aborts_without_preserve_data() {
    let cluster = Arc::new(RecordingCluster::rejecting("cfg-new"));
    let engine = RollbackEngine::new(config(), Arc::new(repo()), cluster.clone());

    let state = engine.execute("manual", &hash('a')).await;
    assert_eq!(state.status, RollbackStatus::Failed);
    assert!(state.errors[0].contains("cfg-new forbidden"));
    assert!(cluster.ops().is_empty());
    assert_eq!(state.resources[0].status, ResourceStatus::Failed);
    assert!(
        state.resources[1..]
            .iter()
            .all(|r| r.status == ResourceStatus::Pending)
    );
}

#[tokio::test]
async fn preserve_data_continues_past_failures() {
    let cluster = Arc::new(RecordingCluster::rejecting("cfg-new"));
    let engine = RollbackEngine::new(
        RollbackConfig {
            preserve_data: true,
            ..config()
        },
        Arc::new(repo()),
        cluster.clone(),
    );

    let state = engine.execute("manual", &hash('a')).await;
    assert_eq!(state.status, RollbackStatus::Completed);
    assert_eq!(cluster.ops().len(), 2);
    assert_eq!(state.errors.len(), 1);
    assert!(state.errors[0].starts_with("resource rollback failed for some resources"));
    assert_eq!(
        state
            .resources
            .iter()
            .filter(|r| r.status == ResourceStatus::Failed)
            .count(),
        1
    );
}

#[tokio::test]
async fn failed_revalidation_fails_rollback() {
    let engine = RollbackEngine::new(
        config(),
        Arc::new(repo()),
        Arc::new(RecordingCluster::default()),
    )
    .with_validator(Arc::new(FixedValidator(ValidationReport::failed(
        "rollback-validation",
        vec!["ran-du not ready".into()],
    ))));

    let state = engine.execute("manual", &hash('a')).await;
    assert_eq!(state.status, RollbackStatus::Failed);
    assert!(state.validation_result.is_some_and(|r| !r.success));
    assert!(state.errors[0].contains("ran-du not ready"));
}

#[tokio::test]
async fn concurrent_requests_are_single_flight() {
    let engine = RollbackEngine::new(
        RollbackConfig {
            settle_delay: Duration::from_millis(50),
            ..RollbackConfig::default()
        },
        Arc::new(repo()),
        Arc::new(RecordingCluster::default()),
    );

    let target = hash('a');
    let (first, second) = tokio::join!(
        engine.execute("first", &target),
        engine.execute("second", &target)
    );
    assert_eq!(first.status, RollbackStatus::Completed);
    assert_eq!(second.status, RollbackStatus::Cancelled);
    assert!(second.errors[0].contains("already in progress"));
}

#[tokio::test]
async fn trigger_policy_targets_previous_commit() {
    let engine = RollbackEngine::new(
        config(),
        Arc::new(repo()),
        Arc::new(RecordingCluster::default()),
    );

    let routine = ValidationReport::failed("edge01", vec!["sync pending".into()]);
    assert!(engine.trigger_rollback(&routine).await.unwrap().is_none());

    let critical = ValidationReport::failed("edge01", vec!["Service unavailable: amf".into()]);
    let state = engine.trigger_rollback(&critical).await.unwrap().unwrap();
    assert_eq!(state.target_commit, hash('b'));
    assert_eq!(state.reason, "validation failed: Service unavailable: amf");
}

#[tokio::test]
async fn trigger_interface_reports_outcome() {
    let engine = RollbackEngine::new(
        config(),
        Arc::new(repo()),
        Arc::new(RecordingCluster::default()),
    );
    let trigger: &dyn RollbackTrigger = &engine;

    let outcome = trigger.roll_back("drift detected").await.unwrap();
    assert_eq!(outcome.status, "completed");
    assert_eq!(outcome.target_commit, hash('b'));
    assert!(outcome.rollback_id.starts_with("rollback-"));
}

#[tokio::test]
async fn history_is_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rollbacks.json");
    let engine = RollbackEngine::new(
        RollbackConfig {
            history_path: Some(path.clone()),
            ..config()
        },
        Arc::new(repo()),
        Arc::new(RecordingCluster::default()),
    );

    engine.execute("manual", &hash('a')).await;

    let saved = HistoryPersistence::new(&path).load().unwrap();
    assert_eq!(saved.operations.len(), 1);
    assert_eq!(saved.operations[0].status, RollbackStatus::Completed);

    let restored = RollbackEngine::new(
        RollbackConfig {
            history_path: Some(path),
            max_rollbacks: 1,
            ..config()
        },
        Arc::new(repo()),
        Arc::new(RecordingCluster::default()),
    )
    .restore_history()
    .unwrap();
    let state = restored.execute("manual", &hash('a')).await;
    assert_eq!(state.status, RollbackStatus::Cancelled);
}
