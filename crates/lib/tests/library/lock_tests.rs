use preflight_lib::CancelToken;
use preflight_lib::lock::{Lockfile, Mode, ResolutionSource, Resolver, lockfile_path};
use preflight_lib::step::Status;

use super::common::{Package, TestEnv};

#[tokio::test]
async fn update_writes_sibling_lockfile() {
  let env = TestEnv::new();
  let engine = env.engine(vec![Package::new("git", "2.43.0")]);

  engine
    .lock_update(&env.config_path, None, &CancelToken::new())
    .await
    .unwrap();

  let path = lockfile_path(&env.config_path);
  assert_eq!(path, env.temp.path().join("preflight.lock"));

  let lockfile = Lockfile::load(&path).unwrap().unwrap();
  assert_eq!(lockfile.mode(), Mode::Intent);
  assert_eq!(lockfile.machine().hostname, "ci");
  assert_eq!(lockfile.get("brew", "git").unwrap().version(), "2.43.0");
}

#[tokio::test]
async fn pin_without_digest_records_no_integrity() {
  let env = TestEnv::new();
  let engine = env.engine(vec![Package::new("git", "2.43.0")]);

  let lockfile = engine
    .lock_update(&env.config_path, None, &CancelToken::new())
    .await
    .unwrap();
  assert!(lockfile.get("brew", "git").unwrap().integrity().is_none());

  let raw = std::fs::read_to_string(lockfile_path(&env.config_path)).unwrap();
  assert!(!raw.contains("integrity"));
}

#[tokio::test]
async fn update_is_stable() {
  let env = TestEnv::new();
  let engine = env.engine(vec![Package::new("git", "2.43.0")]);
  let cancel = CancelToken::new();

  let first = engine.lock_update(&env.config_path, None, &cancel).await.unwrap();
  let second = engine.lock_update(&env.config_path, None, &cancel).await.unwrap();

  assert_eq!(first.len(), second.len());
  assert_eq!(
    first.get("brew", "git").unwrap().recorded_at(),
    second.get("brew", "git").unwrap().recorded_at()
  );
}

#[tokio::test]
async fn frozen_resolves_exact_pins_only() {
  let env = TestEnv::new();
  let engine = env.engine(vec![Package::new("git", "2.43.0")]);
  engine
    .lock_update(&env.config_path, None, &CancelToken::new())
    .await
    .unwrap();
  let lockfile = engine.lock_freeze(&env.config_path).unwrap();

  let resolver = Resolver::new(&lockfile);
  let pinned = resolver.resolve("brew", "git", Some("2.44.0")).unwrap();
  assert_eq!(pinned.version, "2.43.0");
  assert!(pinned.locked);
  assert_eq!(pinned.source, ResolutionSource::Lockfile);

  assert!(resolver.resolve("brew", "ripgrep", None).is_err());
}

#[tokio::test]
async fn intent_never_locks() {
  let env = TestEnv::new();
  let engine = env.engine(vec![Package::new("git", "2.43.0")]);
  let lockfile = engine
    .lock_update(&env.config_path, None, &CancelToken::new())
    .await
    .unwrap();

  let resolver = Resolver::new(&lockfile);
  for (name, requested) in [("git", None), ("git", Some("2.43.0")), ("fd", Some("latest"))] {
    assert!(!resolver.resolve("brew", name, requested).unwrap().locked);
  }
}

#[tokio::test]
async fn locked_unpinned_package_is_unknown_in_plan() {
  let env = TestEnv::new();
  let cancel = CancelToken::new();
  env
    .engine(vec![Package::new("git", "2.43.0")])
    .lock_update(&env.config_path, Some(Mode::Locked), &cancel)
    .await
    .unwrap();

  let engine = env.engine(vec![Package::new("git", "2.43.0"), Package::new("ripgrep", "14.1.0")]);
  let plan = engine.plan(&env.config_path, "default", &cancel).await.unwrap();

  assert_eq!(plan.entries()[0].status, Status::NeedsApply);
  assert_eq!(plan.entries()[1].status, Status::Unknown);
  assert!(plan.entries()[1].error.as_deref().unwrap().contains("not pinned"));
}
