use std::fs;

use preflight_lib::CancelToken;
use preflight_lib::EngineError;
use preflight_lib::compile::CompileError;
use preflight_lib::execute::{ApplyError, PlanError};
use preflight_lib::step::{Status, StepRef};

use super::common::{Dotfile, Package, TestEnv};

#[tokio::test]
async fn check_apply_check_converges() {
  let env = TestEnv::new();
  let zshrc = env.home(".zshrc");
  let engine = env.engine(vec![Dotfile::new(&zshrc, "export PATH=$HOME/bin:$PATH\n", "base")]);
  let cancel = CancelToken::new();

  let plan = engine.plan(&env.config_path, "default", &cancel).await.unwrap();
  assert_eq!(plan.count(Status::NeedsApply), 1);

  let results = engine.apply(&plan, false, &cancel).await.unwrap();
  assert_eq!(results.len(), 1);
  assert_eq!(results[0].status, Status::Satisfied);

  let replan = engine.plan(&env.config_path, "default", &cancel).await.unwrap();
  assert!(replan.is_noop());
  assert!(engine.apply(&replan, false, &cancel).await.unwrap().is_empty());
}

#[tokio::test]
async fn one_failure_does_not_block_others() {
  let env = TestEnv::new();
  let broken = Package::broken("broken-tool");
  let gitconfig = env.home(".gitconfig");
  let engine = env.engine(vec![
    broken.clone() as StepRef,
    Dotfile::new(&gitconfig, "[core]\n  editor = vim\n", "base"),
  ]);
  let cancel = CancelToken::new();

  let plan = engine.plan(&env.config_path, "default", &cancel).await.unwrap();
  let results = engine.apply(&plan, false, &cancel).await.unwrap();

  assert_eq!(results[0].status, Status::Failed);
  assert!(results[0].error.as_deref().unwrap().contains("brew install broken-tool"));
  assert_eq!(results[1].status, Status::Satisfied);
  assert!(gitconfig.exists());
}

#[tokio::test]
async fn cancellation_keeps_completed_results() {
  let env = TestEnv::new();
  let engine = env.engine(vec![Package::new("git", "2.43.0"), Package::new("jq", "1.7.1")]);
  let cancel = CancelToken::new();

  let plan = engine.plan(&env.config_path, "default", &cancel).await.unwrap();
  cancel.cancel();

  match engine.apply(&plan, false, &cancel).await {
    Err(EngineError::Apply(ApplyError::Cancelled { results })) => assert!(results.is_empty()),
    other => panic!("expected cancellation, got {other:?}"),
  }
}

#[tokio::test]
async fn cancelled_plan_is_an_error() {
  let env = TestEnv::new();
  let engine = env.engine(vec![Package::new("git", "2.43.0")]);
  let cancel = CancelToken::new();
  cancel.cancel();

  let err = engine.plan(&env.config_path, "default", &cancel).await.unwrap_err();
  assert!(matches!(err, EngineError::Plan(PlanError::Cancelled)));
}

#[tokio::test]
async fn missing_config_is_fatal() {
  let env = TestEnv::new();
  let engine = env.engine(vec![]);

  let err = engine
    .plan(&env.temp.path().join("nope.yaml"), "default", &CancelToken::new())
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    EngineError::Plan(PlanError::Compile(CompileError::ConfigNotFound(_)))
  ));
}

#[tokio::test]
async fn unknown_target_is_fatal() {
  let env = TestEnv::new();
  let engine = env.engine(vec![]);

  let err = engine
    .plan(&env.config_path, "laptop", &CancelToken::new())
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    EngineError::Plan(PlanError::Compile(CompileError::UnknownTarget { .. }))
  ));
}

#[tokio::test]
async fn empty_plan_applies_to_nothing() {
  let env = TestEnv::new();
  let engine = env.engine(vec![]);
  let cancel = CancelToken::new();

  let plan = engine.plan(&env.config_path, "default", &cancel).await.unwrap();
  assert!(plan.is_empty());
  assert!(engine.apply(&plan, false, &cancel).await.unwrap().is_empty());
}

#[tokio::test]
async fn apply_result_links_snapshot_for_rollback() {
  let env = TestEnv::new();
  let vimrc = env.home(".vimrc");
  fs::create_dir_all(vimrc.parent().unwrap()).unwrap();
  fs::write(&vimrc, "set nocompatible\n").unwrap();
  let engine = env.engine(vec![Dotfile::new(&vimrc, "set number\n", "editor")]);
  let cancel = CancelToken::new();

  let plan = engine.plan(&env.config_path, "default", &cancel).await.unwrap();
  let results = engine.apply(&plan, false, &cancel).await.unwrap();
  let snapshot_id = results[0].snapshot_id.as_deref().unwrap();

  let lifecycle = engine.lifecycle().unwrap();
  lifecycle.restore(snapshot_id).unwrap();
  assert_eq!(fs::read_to_string(&vimrc).unwrap(), "set nocompatible\n");
  assert!(lifecycle.check_drift(&vimrc).unwrap().has_drift());
}

#[tokio::test]
async fn doctor_fix_diff_roundtrip() {
  let env = TestEnv::new();
  let ssh = env.home(".ssh/config");
  let engine = env.engine(vec![Dotfile::new(&ssh, "Host *\n  AddKeysToAgent yes\n", "ssh")]);
  let cancel = CancelToken::new();

  let diff = engine.diff(&env.config_path, "default", &cancel).await.unwrap();
  assert_eq!(diff.entries.len(), 1);
  assert!(diff.entries[0].summary().starts_with("+ "));

  let report = engine.doctor(&env.config_path, "default", &cancel).await.unwrap();
  let outcome = engine.fix(&report, &cancel).await.unwrap();
  assert_eq!(outcome.fixed.len(), 1);

  assert!(engine.diff(&env.config_path, "default", &cancel).await.unwrap().is_empty());
  assert!(
    engine
      .doctor(&env.config_path, "default", &cancel)
      .await
      .unwrap()
      .is_healthy()
  );
}
