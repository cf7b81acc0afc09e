//! Doctor command integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn healthy_system_passes() {
  let env = TestEnv::with_files(&[(".inputrc", "set editing-mode vi\n")]);
  env.cmd().arg("apply").assert().success();

  env
    .cmd()
    .arg("doctor")
    .assert()
    .success()
    .stdout(predicate::str::contains("No issues found"));
}

#[test]
fn pending_changes_are_fixable() {
  let env = TestEnv::with_files(&[(".inputrc", "set editing-mode vi\n")]);

  env
    .cmd()
    .arg("doctor")
    .assert()
    .failure()
    .stdout(predicate::str::contains("(fixable)"))
    .stderr(predicate::str::contains("1 issue(s) need attention"));

  env
    .cmd()
    .args(["doctor", "--fix"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Fixed 1 issue(s)"));
  assert_eq!(env.read(".inputrc"), "set editing-mode vi\n");
}

#[test]
fn drift_appears_in_report_and_fix_reapplies() {
  let env = TestEnv::with_files(&[(".inputrc", "set editing-mode vi\n")]);
  env.cmd().arg("apply").assert().success();
  env.write(".inputrc", "set editing-mode emacs\n");

  let output = env
    .cmd()
    .args(["doctor", "-o", "json"])
    .output()
    .unwrap();
  assert!(!output.status.success());
  let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  let issues = report["report"]["issues"].as_array().unwrap();
  assert_eq!(issues.len(), 2);
  assert!(issues.iter().any(|i| i["message"].as_str().unwrap().starts_with("drift:")));

  env.cmd().args(["doctor", "--fix"]).assert().success();
  assert_eq!(env.read(".inputrc"), "set editing-mode vi\n");
}
