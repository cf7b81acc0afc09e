use std::fs;

use preflight_lib::CancelToken;
use preflight_lib::lifecycle::{LifecycleError, LifecycleManager};
use preflight_lib::snapshot::SnapshotError;

use super::common::TestEnv;

#[test]
fn end_to_end_modify_and_tamper() {
  let env = TestEnv::new();
  let manager = LifecycleManager::new(&env.state_root());
  let config = env.temp.path().join("config.txt");
  fs::write(&config, "original config").unwrap();

  manager.before_modify(&config).unwrap();
  fs::write(&config, "new config from preflight").unwrap();
  manager.after_apply(&config, "work-layer").unwrap();

  assert!(!manager.check_drift(&config).unwrap().has_drift());
  assert_eq!(manager.list_sets().unwrap().len(), 1);
  assert_eq!(manager.list_tracked_files().unwrap().len(), 1);

  fs::write(&config, "manually edited").unwrap();
  assert!(manager.check_drift(&config).unwrap().has_drift());
  assert_eq!(manager.list_sets().unwrap().len(), 1);
  assert_eq!(manager.list_tracked_files().unwrap().len(), 1);
}

#[test]
fn snapshot_fidelity_skips_missing_paths() {
  let env = TestEnv::new();
  let manager = LifecycleManager::new(&env.state_root());
  let paths: Vec<_> = (0..3).map(|i| env.temp.path().join(format!("file{i}"))).collect();
  for (i, path) in paths.iter().enumerate() {
    fs::write(path, format!("content {i}")).unwrap();
  }

  let mut requested = paths.clone();
  requested.push(env.temp.path().join("does-not-exist"));
  let set = manager.before_apply(&requested).unwrap();
  assert_eq!(set.len(), 3);

  for path in &paths {
    fs::write(path, "clobbered").unwrap();
  }
  manager.restore(set.id()).unwrap();

  for (i, path) in paths.iter().enumerate() {
    assert_eq!(fs::read_to_string(path).unwrap(), format!("content {i}"));
  }
}

#[test]
fn empty_before_apply_is_not_an_error() {
  let env = TestEnv::new();
  let manager = LifecycleManager::new(&env.state_root());

  assert!(manager.before_apply(&[]).unwrap().is_empty());
}

#[test]
fn unknown_ids_are_not_found() {
  let env = TestEnv::new();
  let manager = LifecycleManager::new(&env.state_root());

  assert!(matches!(
    manager.restore("nonexistent-id"),
    Err(LifecycleError::Snapshot(SnapshotError::NotFound(_)))
  ));
  assert!(matches!(
    manager.get_set("nonexistent-id"),
    Err(LifecycleError::Snapshot(SnapshotError::NotFound(_)))
  ));
}

#[test]
fn drift_state_survives_restart() {
  let env = TestEnv::new();
  let file = env.temp.path().join(".bashrc");
  fs::write(&file, "alias ll='ls -l'").unwrap();
  LifecycleManager::new(&env.state_root())
    .after_apply(&file, "shell")
    .unwrap();

  fs::write(&file, "alias ll='ls -la'").unwrap();

  let reopened = LifecycleManager::new(&env.state_root());
  let drifted = reopened.check_all(&CancelToken::new()).unwrap();
  assert_eq!(drifted.len(), 1);
  assert_eq!(drifted[0].source_layer.as_deref(), Some("shell"));
}

#[test]
fn untracked_paths_are_never_reported() {
  let env = TestEnv::new();
  let manager = LifecycleManager::new(&env.state_root());
  let file = env.temp.path().join("notes.md");
  fs::write(&file, "hello").unwrap();

  assert!(!manager.check_drift(&file).unwrap().has_drift());
  assert!(manager.check_all(&CancelToken::new()).unwrap().is_empty());
}
