//! Apply orchestration.
//!
//! Walks a [`Plan`] in order and applies every `NeedsApply` entry, one at a
//! time. For each step:
//!
//! 1. Snapshot the files it manages (if a lifecycle manager is configured)
//! 2. Run `Step::apply` on the blocking pool
//! 3. Record the new hash of every managed file for drift detection
//!
//! A failing step is reported `Failed` and the run continues. Cancellation
//! is honored between steps only; nothing already applied is rolled back.

use std::path::PathBuf;

use tracing::{debug, error, info, warn};

use crate::cancel::CancelToken;
use crate::lifecycle::LifecycleManager;
use crate::step::{Status, StepContext, StepRef};

use super::types::{ApplyError, Plan, StepResult};

/// Applies plans, optionally wrapping file writes in the snapshot/drift
/// lifecycle.
#[derive(Debug, Clone, Default)]
pub struct Executor {
  lifecycle: Option<LifecycleManager>,
}

impl Executor {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_lifecycle(mut self, lifecycle: LifecycleManager) -> Self {
    self.lifecycle = Some(lifecycle);
    self
  }

  /// Apply every `NeedsApply` entry of `plan` in order.
  ///
  /// In dry-run mode nothing is changed and each actionable entry is
  /// reported as a preview.
  pub async fn apply(&self, plan: &Plan, dry_run: bool, cancel: &CancelToken) -> Result<Vec<StepResult>, ApplyError> {
    info!(
      target = plan.target(),
      steps = plan.count(Status::NeedsApply),
      dry_run,
      "applying plan"
    );

    let mut results = Vec::new();

    for entry in plan.entries() {
      if cancel.is_cancelled() {
        warn!(completed = results.len(), "apply cancelled");
        return Err(ApplyError::Cancelled { results });
      }

      match entry.status {
        Status::NeedsApply => {}
        Status::Satisfied | Status::Skipped => {
          debug!(step = %entry.id(), status = %entry.status, "nothing to do");
          continue;
        }
        Status::Failed | Status::Unknown => {
          warn!(step = %entry.id(), status = %entry.status, "not applying unchecked step");
          continue;
        }
      }

      if dry_run {
        debug!(step = %entry.id(), diff = %entry.diff.summary(), "would apply");
        results.push(StepResult::dry_run(entry.id().clone()));
        continue;
      }

      let step = entry.step.clone();
      let ctx = plan.context().clone();
      let lifecycle = self.lifecycle.clone();
      let result = match tokio::task::spawn_blocking(move || apply_step(&step, &ctx, lifecycle.as_ref())).await {
        Ok(result) => result,
        Err(e) => {
          error!(step = %entry.id(), error = %e, "apply task panicked");
          StepResult::failed(entry.id().clone(), format!("apply panicked: {e}"))
        }
      };
      results.push(result);
    }

    let failed = results.iter().filter(|r| r.status == Status::Failed).count();
    info!(applied = results.len() - failed, failed, "apply complete");
    Ok(results)
  }
}

fn apply_step(step: &StepRef, ctx: &StepContext, lifecycle: Option<&LifecycleManager>) -> StepResult {
  let id = step.id().clone();
  let files = step.managed_files();
  let mut snapshot_id = None;

  if let Some(lifecycle) = lifecycle
    && !files.is_empty()
  {
    let paths: Vec<PathBuf> = files.iter().map(|f| f.path.clone()).collect();
    match lifecycle.before_apply(&paths) {
      Ok(set) if !set.is_empty() => snapshot_id = Some(set.id().to_string()),
      Ok(_) => {}
      Err(e) => {
        error!(step = %id, error = %e, "snapshot failed, step not applied");
        return StepResult::failed(id, format!("snapshot failed: {e}"));
      }
    }
  }

  if let Err(e) = step.apply(ctx) {
    error!(step = %id, error = %e, "apply failed");
    return StepResult::failed(id, e.to_string()).with_snapshot(snapshot_id);
  }

  if let Some(lifecycle) = lifecycle {
    for file in &files {
      if let Err(e) = lifecycle.after_apply(&file.path, &file.source_layer) {
        error!(step = %id, path = %file.path.display(), error = %e, "drift tracking failed");
        return StepResult::failed(id, format!("applied, but tracking {} failed: {e}", file.path.display()))
          .with_snapshot(snapshot_id);
      }
    }
  }

  info!(step = %id, "applied");
  StepResult::satisfied(id).with_snapshot(snapshot_id)
}
