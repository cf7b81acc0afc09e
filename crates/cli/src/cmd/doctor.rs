//! Implementation of the `preflight doctor` command.
//!
//! Reports every step that is not satisfied plus every tracked file that
//! drifted since it was last applied. With `--fix`, the fixable issues are
//! repaired by applying the affected steps.

use anyhow::{Context, Result, bail};
use preflight_lib::doctor::{DoctorIssue, DoctorReport, FixOutcome, Severity};
use serde::Serialize;

use super::{Session, runtime};
use crate::output::{OutputFormat, print_info, print_issue, print_json, print_success};

#[derive(Debug, Serialize)]
struct DoctorOutput<'a> {
  report: &'a DoctorReport,
  #[serde(skip_serializing_if = "Option::is_none")]
  fix: Option<&'a FixOutcome>,
  remaining: usize,
}

pub fn cmd_doctor(session: &Session, fix: bool, output: OutputFormat) -> Result<()> {
  let engine = session.engine();
  let rt = runtime()?;

  let report = rt
    .block_on(engine.doctor(&session.config_path, &session.target, &session.cancel))
    .with_context(|| format!("Failed to examine {}", session.config_path.display()))?;

  let outcome = if fix && !report.is_healthy() {
    Some(rt.block_on(engine.fix(&report, &session.cancel)).context("Fix failed")?)
  } else {
    None
  };

  // Re-examine after fixing: applying also re-tracks drifted files.
  let after = match &outcome {
    Some(_) => Some(
      rt.block_on(engine.doctor(&session.config_path, &session.target, &session.cancel))
        .context("Failed to re-examine after fix")?,
    ),
    None => None,
  };
  let remaining = after.as_ref().unwrap_or(&report).issues.len();

  if output.is_json() {
    print_json(&DoctorOutput {
      report: &report,
      fix: outcome.as_ref(),
      remaining,
    })?;
  } else {
    print_report(&report);
    if let (Some(outcome), Some(after)) = (&outcome, &after) {
      println!();
      print_info(&format!("Fixed {} issue(s)", outcome.fixed.len()));
      for issue in &after.issues {
        print_issue(issue.severity, &issue_subject(issue), &issue.message);
      }
    }
  }

  if remaining > 0 {
    bail!("{} issue(s) need attention", remaining);
  }
  Ok(())
}

fn issue_subject(issue: &DoctorIssue) -> String {
  match (&issue.step_id, &issue.path) {
    (Some(id), _) => id.to_string(),
    (None, Some(path)) => path.display().to_string(),
    (None, None) => "(general)".to_string(),
  }
}

fn print_report(report: &DoctorReport) {
  println!(
    "Checked {} step(s) of target '{}' ({})",
    report.checked,
    report.target,
    report.config_path.display()
  );

  if report.is_healthy() {
    print_success("No issues found");
    return;
  }

  for issue in &report.issues {
    let message = if issue.fixable {
      format!("{} (fixable)", issue.message)
    } else {
      issue.message.clone()
    };
    print_issue(issue.severity, &issue_subject(issue), &message);
  }

  println!();
  println!(
    "{} error(s), {} warning(s), {} info, {} fixable with --fix",
    report.count(Severity::Error),
    report.count(Severity::Warning),
    report.count(Severity::Info),
    report.fixable().count()
  );
}
