//! Snapshot command integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

/// Apply over an existing file so one snapshot is taken; returns its id.
fn apply_over_existing(env: &TestEnv) -> String {
  env.write(".bashrc", "original\n");
  let output = env.json(&["apply"]);
  output["results"][0]["snapshotId"].as_str().unwrap().to_string()
}

#[test]
fn list_is_empty_before_any_apply() {
  let env = TestEnv::with_files(&[]);

  env
    .cmd()
    .args(["snapshot", "list"])
    .assert()
    .success()
    .stdout(predicate::str::contains("No snapshots found"));
}

#[test]
fn new_files_are_not_snapshotted() {
  let env = TestEnv::with_files(&[(".bashrc", "managed\n")]);
  env.cmd().arg("apply").assert().success();

  let list = env.json(&["snapshot", "list"]);
  assert!(list.as_array().unwrap().is_empty());
}

#[test]
fn restore_brings_back_original_content() {
  let env = TestEnv::with_files(&[(".bashrc", "managed\n")]);
  let id = apply_over_existing(&env);
  assert_eq!(env.read(".bashrc"), "managed\n");

  let list = env.json(&["snapshot", "list"]);
  assert_eq!(list.as_array().unwrap().len(), 1);
  assert_eq!(list[0]["id"], id.as_str());

  env
    .cmd()
    .args(["snapshot", "restore", &id, "--force"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Restored 1 file(s)"));
  assert_eq!(env.read(".bashrc"), "original\n");

  // The restored content differs from what preflight last applied.
  env.cmd().args(["drift", "check"]).assert().failure();
}

#[test]
fn restore_latest() {
  let env = TestEnv::with_files(&[(".bashrc", "managed\n")]);
  apply_over_existing(&env);

  env
    .cmd()
    .args(["snapshot", "restore", "latest", "--force"])
    .assert()
    .success();
  assert_eq!(env.read(".bashrc"), "original\n");
}

#[test]
fn restore_requires_confirmation_when_not_interactive() {
  let env = TestEnv::with_files(&[(".bashrc", "managed\n")]);
  let id = apply_over_existing(&env);

  env
    .cmd()
    .args(["snapshot", "restore", &id])
    .assert()
    .failure()
    .stderr(predicate::str::contains("--force"));
  assert_eq!(env.read(".bashrc"), "managed\n");
}

#[test]
fn show_lists_captured_files() {
  let env = TestEnv::with_files(&[(".bashrc", "managed\n")]);
  let id = apply_over_existing(&env);

  let show = env.json(&["snapshot", "show", &id]);
  let entries = show["entries"].as_array().unwrap();
  assert_eq!(entries.len(), 1);
  assert_eq!(entries[0]["size"], 9);
  assert_eq!(entries[0]["intact"], true);
}

#[test]
fn unknown_snapshot_fails() {
  let env = TestEnv::with_files(&[]);

  env
    .cmd()
    .args(["snapshot", "show", "0000000000000000"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("not found"));

  env
    .cmd()
    .args(["snapshot", "restore", "latest", "--force"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("No snapshots to restore"));
}

#[test]
fn delete_removes_snapshots() {
  let env = TestEnv::with_files(&[(".bashrc", "managed\n")]);
  let id = apply_over_existing(&env);

  let preview = env.json(&["snapshot", "delete", &id, "--dry-run"]);
  assert_eq!(preview["deleted"][0], id.as_str());
  assert_eq!(env.json(&["snapshot", "list"]).as_array().unwrap().len(), 1);

  env
    .cmd()
    .args(["snapshot", "delete", &id, "--force"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Deleted 1 snapshot(s)"));
  assert!(env.json(&["snapshot", "list"]).as_array().unwrap().is_empty());
}
