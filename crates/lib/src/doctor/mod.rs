//! Read-only projections of a plan: doctor reports and diffs.
//!
//! | Plan status            | Issue                      |
//! |------------------------|----------------------------|
//! | `NeedsApply`           | `Warning`, fixable         |
//! | `Failed`               | `Error`, not fixable       |
//! | `Unknown`              | `Info`, not fixable        |
//! | `Satisfied`/`Skipped`  | none                       |

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::drift::Drift;
use crate::execute::{Plan, PlanEntry, StepResult};
use crate::step::{Diff, DiffKind, Status, StepId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
  Error,
  Warning,
  Info,
}

impl fmt::Display for Severity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Severity::Error => "error",
      Severity::Warning => "warning",
      Severity::Info => "info",
    })
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorIssue {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub step_id: Option<StepId>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub path: Option<PathBuf>,
  pub severity: Severity,
  pub message: String,
  pub fixable: bool,
}

/// Classify one plan entry. Healthy entries produce no issue.
pub fn classify(entry: &PlanEntry) -> Option<DoctorIssue> {
  let (severity, message, fixable) = match entry.status {
    Status::Satisfied | Status::Skipped => return None,
    Status::NeedsApply => (Severity::Warning, entry.diff.summary(), true),
    Status::Failed => (
      Severity::Error,
      format!("check failed: {}", entry.error.as_deref().unwrap_or("no details")),
      false,
    ),
    Status::Unknown => (
      Severity::Info,
      format!("status unknown: {}", entry.error.as_deref().unwrap_or("no details")),
      false,
    ),
  };

  Some(DoctorIssue {
    step_id: Some(entry.id().clone()),
    path: None,
    severity,
    message,
    fixable,
  })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorReport {
  pub config_path: PathBuf,
  pub target: String,
  pub issues: Vec<DoctorIssue>,
  /// Number of steps examined.
  pub checked: usize,
}

impl DoctorReport {
  pub fn from_plan(plan: &Plan) -> Self {
    Self {
      config_path: plan.config_path().to_path_buf(),
      target: plan.target().to_string(),
      issues: plan.entries().iter().filter_map(classify).collect(),
      checked: plan.len(),
    }
  }

  /// Append one not-fixable warning per drifted file.
  pub fn add_drift(&mut self, drifted: &[Drift]) {
    self.issues.extend(drifted.iter().filter(|d| d.has_drift()).map(|d| DoctorIssue {
      step_id: None,
      path: Some(d.path.clone()),
      severity: Severity::Warning,
      message: format!("drift: {}", d.details()),
      fixable: false,
    }));
  }

  pub fn is_healthy(&self) -> bool {
    self.issues.is_empty()
  }

  pub fn fixable(&self) -> impl Iterator<Item = &DoctorIssue> {
    self.issues.iter().filter(|i| i.fixable)
  }

  pub fn count(&self, severity: Severity) -> usize {
    self.issues.iter().filter(|i| i.severity == severity).count()
  }
}

/// What `fix` repaired.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixOutcome {
  pub fixed: Vec<DoctorIssue>,
  pub results: Vec<StepResult>,
}

impl FixOutcome {
  /// Keep the fixable issues whose step now applied successfully.
  pub fn from_results(report: &DoctorReport, results: Vec<StepResult>) -> Self {
    let fixed = report
      .fixable()
      .filter(|issue| {
        results
          .iter()
          .any(|r| r.is_success() && issue.step_id.as_ref() == Some(&r.step_id))
      })
      .cloned()
      .collect();
    Self { fixed, results }
  }
}

/// One pending change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffEntry {
  pub step_id: StepId,
  #[serde(flatten)]
  pub diff: Diff,
}

impl DiffEntry {
  pub fn summary(&self) -> String {
    self.diff.summary()
  }
}

/// The `NeedsApply` part of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResult {
  pub config_path: PathBuf,
  pub target: String,
  pub entries: Vec<DiffEntry>,
}

impl DiffResult {
  pub fn from_plan(plan: &Plan) -> Self {
    Self {
      config_path: plan.config_path().to_path_buf(),
      target: plan.target().to_string(),
      entries: plan
        .needs_apply()
        .map(|e| DiffEntry {
          step_id: e.id().clone(),
          diff: e.diff.clone(),
        })
        .collect(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn count(&self, kind: DiffKind) -> usize {
    self.entries.iter().filter(|e| e.diff.kind == kind).count()
  }
}
