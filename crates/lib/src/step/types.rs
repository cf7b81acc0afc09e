//! Status, diff and error types shared by every step.

use std::fmt;
use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lock::ResolveError;

/// A step's relationship to desired state, computed fresh on every plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
  /// Live state already matches; nothing to do.
  Satisfied,
  /// Live state differs and the step can converge it.
  NeedsApply,
  /// The check itself reported failure.
  Failed,
  /// Intentionally not evaluated.
  Skipped,
  /// The check errored and the status could not be determined.
  Unknown,
}

impl Status {
  pub fn as_str(self) -> &'static str {
    match self {
      Status::Satisfied => "satisfied",
      Status::NeedsApply => "needs_apply",
      Status::Failed => "failed",
      Status::Skipped => "skipped",
      Status::Unknown => "unknown",
    }
  }

  /// Only `NeedsApply` entries are handed to the executor.
  pub fn is_actionable(self) -> bool {
    matches!(self, Status::NeedsApply)
  }

  /// True for statuses that end evaluation for the current run.
  pub fn is_terminal(self) -> bool {
    matches!(self, Status::Satisfied | Status::Failed | Status::Skipped)
  }
}

impl fmt::Display for Status {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// What kind of change a [`Diff`] describes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffKind {
  #[default]
  Unchanged,
  Added,
  Removed,
  Modified,
}

/// A human-oriented description of what applying a step would change.
///
/// Diffs are descriptive only; the executor never interprets them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diff {
  pub kind: DiffKind,
  pub subject: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub current: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub desired: Option<String>,
}

impl Diff {
  pub fn unchanged() -> Self {
    Self::default()
  }

  pub fn added(subject: impl Into<String>) -> Self {
    Self {
      kind: DiffKind::Added,
      subject: subject.into(),
      ..Self::default()
    }
  }

  pub fn removed(subject: impl Into<String>) -> Self {
    Self {
      kind: DiffKind::Removed,
      subject: subject.into(),
      ..Self::default()
    }
  }

  pub fn modified(subject: impl Into<String>, current: impl Into<String>, desired: impl Into<String>) -> Self {
    Self {
      kind: DiffKind::Modified,
      subject: subject.into(),
      current: Some(current.into()),
      desired: Some(desired.into()),
    }
  }

  pub fn with_desired(mut self, desired: impl Into<String>) -> Self {
    self.desired = Some(desired.into());
    self
  }

  pub fn is_empty(&self) -> bool {
    self.kind == DiffKind::Unchanged
  }

  /// One-line rendering: `+ subject`, `- subject` or `~ subject: a -> b`.
  pub fn summary(&self) -> String {
    match self.kind {
      DiffKind::Unchanged => "no changes".to_string(),
      DiffKind::Added => match &self.desired {
        Some(desired) => format!("+ {} ({})", self.subject, desired),
        None => format!("+ {}", self.subject),
      },
      DiffKind::Removed => format!("- {}", self.subject),
      DiffKind::Modified => match (&self.current, &self.desired) {
        (Some(current), Some(desired)) => format!("~ {}: {} -> {}", self.subject, current, desired),
        (None, Some(desired)) => format!("~ {}: -> {}", self.subject, desired),
        _ => format!("~ {}", self.subject),
      },
    }
  }
}

/// Result of a successful `check`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
  pub status: Status,
  pub diff: Diff,
}

impl CheckResult {
  pub fn satisfied() -> Self {
    Self {
      status: Status::Satisfied,
      diff: Diff::unchanged(),
    }
  }

  pub fn needs_apply(diff: Diff) -> Self {
    Self {
      status: Status::NeedsApply,
      diff,
    }
  }

  pub fn skipped() -> Self {
    Self {
      status: Status::Skipped,
      diff: Diff::unchanged(),
    }
  }
}

/// Errors a step may return from `check` or `apply`.
#[derive(Debug, Error)]
pub enum StepError {
  /// The check ran and positively determined failure. Planned as `Failed`.
  #[error("check failed: {0}")]
  CheckFailed(String),

  #[error("io error: {0}")]
  Io(#[from] io::Error),

  #[error("version resolution failed: {0}")]
  Resolve(#[from] ResolveError),

  #[error("{0}")]
  Other(String),
}
