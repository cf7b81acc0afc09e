//! Apply and plan command integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn apply_writes_files_then_plan_is_noop() {
  let env = TestEnv::with_files(&[(".zshrc", "export EDITOR=vim\n"), (".config/git/config", "[core]\n")]);

  env
    .cmd()
    .arg("plan")
    .assert()
    .success()
    .stdout(predicate::str::contains("2 step(s) would change"));

  env
    .cmd()
    .arg("apply")
    .assert()
    .success()
    .stdout(predicate::str::contains("Applied 2 step(s)"));

  assert_eq!(env.read(".zshrc"), "export EDITOR=vim\n");
  assert_eq!(env.read(".config/git/config"), "[core]\n");

  env
    .cmd()
    .arg("plan")
    .assert()
    .success()
    .stdout(predicate::str::contains("Nothing to do"));

  env
    .cmd()
    .arg("apply")
    .assert()
    .success()
    .stdout(predicate::str::contains("Nothing to apply"));
}

#[test]
fn dry_run_changes_nothing() {
  let env = TestEnv::with_files(&[(".vimrc", "set number\n")]);

  env
    .cmd()
    .args(["apply", "--dry-run"])
    .assert()
    .success()
    .stdout(predicate::str::contains("1 step(s) would be applied"));

  assert!(!env.home(".vimrc").exists());
}

#[test]
fn apply_json_reports_results() {
  let env = TestEnv::with_files(&[(".tmux.conf", "set -g mouse on\n")]);

  let output = env.json(&["apply"]);
  let results = output["results"].as_array().unwrap();
  assert_eq!(results.len(), 1);
  assert_eq!(results[0]["status"], "satisfied");
  assert_eq!(output["cancelled"], false);
  assert!(output["notApplied"].as_array().unwrap().is_empty());
}

#[test]
fn plan_json_lists_entries_in_order() {
  let env = TestEnv::with_files(&[("b.conf", "b"), ("a.conf", "a")]);

  let output = env.json(&["plan"]);
  let entries = output["entries"].as_array().unwrap();
  assert_eq!(entries.len(), 2);
  assert!(entries[0]["id"].as_str().unwrap().ends_with("b.conf"));
  assert_eq!(entries[0]["status"], "needs_apply");
  assert_eq!(entries[0]["diff"]["kind"], "added");
  assert_eq!(output["needsApply"], 2);
}

#[test]
fn layered_target_merges_files() {
  let env = TestEnv::empty();
  let mut yaml = String::from("targets:\n  default: [base]\n  work: [base, work]\nlayers:\n  base:\n    files:\n");
  env.push_file(&mut yaml, ".gitconfig", "[user]\n  name = me\n", Some("base"));
  yaml.push_str("  work:\n    files:\n");
  env.push_file(&mut yaml, ".npmrc", "registry=https://npm.example.com\n", Some("work"));
  env.write_config(&yaml);

  env.cmd().args(["--target", "default", "apply"]).assert().success();
  assert!(env.home(".gitconfig").exists());
  assert!(!env.home(".npmrc").exists());

  env
    .cmd()
    .args(["--target", "work", "apply"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Applied 1 step(s)"));
  assert!(env.home(".npmrc").exists());
}

#[test]
fn later_layer_overrides_same_file() {
  let env = TestEnv::empty();
  let mut yaml = String::from("targets:\n  default: [base]\n  work: [base, work]\nlayers:\n  base:\n    files:\n");
  env.push_file(&mut yaml, ".gitconfig", "[user]\n  email = me@home\n", None);
  yaml.push_str("  work:\n    files:\n");
  env.push_file(&mut yaml, ".gitconfig", "[user]\n  email = me@work\n", None);
  env.write_config(&yaml);

  env.cmd().args(["--target", "default", "apply"]).assert().success();
  assert_eq!(env.read(".gitconfig"), "[user]\n  email = me@home\n");

  env
    .cmd()
    .args(["--target", "work", "apply"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Applied 1 step(s)"));
  assert_eq!(env.read(".gitconfig"), "[user]\n  email = me@work\n");

  let tracked = env.json(&["--target", "work", "drift", "list"]);
  assert_eq!(tracked.as_array().unwrap().len(), 1);
  assert_eq!(tracked[0]["sourceLayer"], "work");
}

#[test]
fn unreadable_step_does_not_block_others() {
  let env = TestEnv::with_files(&[("blocker/child.conf", "x"), ("ok.conf", "fine")]);
  env.write("blocker", "i am a file, not a directory");

  env
    .cmd()
    .arg("apply")
    .assert()
    .failure()
    .stderr(predicate::str::contains("1 step(s) did not converge"));

  assert_eq!(env.read("ok.conf"), "fine");
}

#[test]
fn missing_config_fails() {
  let env = TestEnv::empty();

  env
    .cmd()
    .arg("plan")
    .assert()
    .failure()
    .stderr(predicate::str::contains("config file not found"));
}

#[test]
fn unknown_target_fails() {
  let env = TestEnv::with_files(&[]);

  env
    .cmd()
    .args(["--target", "laptop", "plan"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("unknown target 'laptop'"));
}

#[test]
fn diff_shows_pending_changes_only() {
  let env = TestEnv::with_files(&[("a.conf", "a"), ("b.conf", "b")]);
  env.write("a.conf", "a");
  env.write("b.conf", "old");

  let output = env.json(&["diff"]);
  let entries = output["entries"].as_array().unwrap();
  assert_eq!(entries.len(), 1);
  assert_eq!(entries[0]["kind"], "modified");

  env
    .cmd()
    .arg("diff")
    .assert()
    .success()
    .stdout(predicate::str::contains("0 to add, 1 to change, 0 to remove"));
}
