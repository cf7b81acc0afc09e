//! Plans and step results.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::compile::CompileError;
use crate::step::{Diff, Status, StepContext, StepId, StepRef};

/// One checked step.
#[derive(Debug, Clone)]
pub struct PlanEntry {
  pub step: StepRef,
  pub status: Status,
  pub diff: Diff,
  /// Why the check did not produce a status, for `Failed`/`Unknown`.
  pub error: Option<String>,
}

impl PlanEntry {
  pub fn id(&self) -> &StepId {
    self.step.id()
  }
}

/// All checked steps of one (config, target) pair, in compiler order.
#[derive(Debug, Clone)]
pub struct Plan {
  context: StepContext,
  entries: Vec<PlanEntry>,
}

impl Plan {
  pub fn new(context: StepContext, entries: Vec<PlanEntry>) -> Self {
    Self { context, entries }
  }

  pub fn context(&self) -> &StepContext {
    &self.context
  }

  pub fn config_path(&self) -> &Path {
    self.context.config_path()
  }

  pub fn target(&self) -> &str {
    self.context.target()
  }

  pub fn entries(&self) -> &[PlanEntry] {
    &self.entries
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Entries that apply would act on.
  pub fn needs_apply(&self) -> impl Iterator<Item = &PlanEntry> {
    self.entries.iter().filter(|e| e.status.is_actionable())
  }

  pub fn has_changes(&self) -> bool {
    self.needs_apply().next().is_some()
  }

  pub fn count(&self, status: Status) -> usize {
    self.entries.iter().filter(|e| e.status == status).count()
  }

  /// Only `Satisfied`/`Skipped` entries: nothing to do.
  pub fn is_noop(&self) -> bool {
    self
      .entries
      .iter()
      .all(|e| matches!(e.status, Status::Satisfied | Status::Skipped))
  }
}

/// Outcome of applying (or previewing) one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
  pub step_id: StepId,
  pub status: Status,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  /// Snapshot set taken right before this step ran.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub snapshot_id: Option<String>,
  #[serde(default)]
  pub dry_run: bool,
}

impl StepResult {
  pub fn satisfied(step_id: StepId) -> Self {
    Self {
      step_id,
      status: Status::Satisfied,
      error: None,
      snapshot_id: None,
      dry_run: false,
    }
  }

  pub fn failed(step_id: StepId, error: impl Into<String>) -> Self {
    Self {
      step_id,
      status: Status::Failed,
      error: Some(error.into()),
      snapshot_id: None,
      dry_run: false,
    }
  }

  /// A previewed step: still needs apply, nothing was changed.
  pub fn dry_run(step_id: StepId) -> Self {
    Self {
      step_id,
      status: Status::NeedsApply,
      error: None,
      snapshot_id: None,
      dry_run: true,
    }
  }

  pub fn with_snapshot(mut self, snapshot_id: Option<String>) -> Self {
    self.snapshot_id = snapshot_id;
    self
  }

  pub fn is_success(&self) -> bool {
    self.status == Status::Satisfied
  }
}

#[derive(Debug, Error)]
pub enum PlanError {
  #[error(transparent)]
  Compile(#[from] CompileError),

  #[error("planning cancelled")]
  Cancelled,
}

#[derive(Debug, Error)]
pub enum ApplyError {
  /// Stopped between steps. Steps already applied stay applied.
  #[error("apply cancelled after {} step(s)", .results.len())]
  Cancelled { results: Vec<StepResult> },
}

impl ApplyError {
  /// Results gathered before the run stopped.
  pub fn into_results(self) -> Vec<StepResult> {
    match self {
      ApplyError::Cancelled { results } => results,
    }
  }
}

/// Default worker count for concurrent checks.
pub fn default_parallelism() -> usize {
  std::thread::available_parallelism().map(|p| p.get()).unwrap_or(4)
}
