//! Planning: check every compiled step against the live system.
//!
//! Checks only read system state, so they run concurrently on the blocking
//! pool, bounded by a semaphore. Results are slotted back by index, so the
//! plan keeps compiler order no matter how the checks were scheduled.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::cancel::CancelToken;
use crate::compile::{Compiler, ConfigLoader};
use crate::step::{CheckResult, Diff, Status, StepContext, StepError, StepRef};

use super::types::{Plan, PlanEntry, PlanError};

/// Builds plans from configuration.
pub struct Planner<'a> {
  compiler: &'a Compiler,
  loader: &'a dyn ConfigLoader,
  parallelism: usize,
}

impl<'a> Planner<'a> {
  pub fn new(compiler: &'a Compiler, loader: &'a dyn ConfigLoader, parallelism: usize) -> Self {
    Self {
      compiler,
      loader,
      parallelism,
    }
  }

  /// Compile the context's target and check every step.
  ///
  /// Configuration and target problems are fatal. A failing check is not:
  /// it marks that entry `Failed` or `Unknown` and planning continues.
  pub async fn plan(&self, ctx: StepContext, cancel: &CancelToken) -> Result<Plan, PlanError> {
    info!(config = %ctx.config_path().display(), target = ctx.target(), "planning");

    let steps = self.compiler.compile(self.loader, ctx.config_path(), ctx.target())?;
    let entries = check_steps(steps, &ctx, self.parallelism, cancel).await?;
    let plan = Plan::new(ctx, entries);

    info!(
      steps = plan.len(),
      needs_apply = plan.count(Status::NeedsApply),
      failed = plan.count(Status::Failed),
      unknown = plan.count(Status::Unknown),
      "plan complete"
    );
    Ok(plan)
  }
}

/// Check `steps` with at most `parallelism` checks in flight.
pub async fn check_steps(
  steps: Vec<StepRef>,
  ctx: &StepContext,
  parallelism: usize,
  cancel: &CancelToken,
) -> Result<Vec<PlanEntry>, PlanError> {
  let semaphore = Arc::new(Semaphore::new(parallelism.max(1)));
  let mut join_set = JoinSet::new();

  for (index, step) in steps.iter().enumerate() {
    let step = step.clone();
    let ctx = ctx.clone();
    let cancel = cancel.clone();
    let semaphore = semaphore.clone();

    join_set.spawn(async move {
      let _permit = semaphore.acquire_owned().await;
      if cancel.is_cancelled() {
        return (index, None);
      }

      let task_step = step.clone();
      let entry = match tokio::task::spawn_blocking(move || check_step(task_step, &ctx)).await {
        Ok(entry) => entry,
        Err(e) => {
          error!(step = %step.id(), error = %e, "check task panicked");
          unknown(step, format!("check panicked: {e}"))
        }
      };
      (index, Some(entry))
    });
  }

  let mut slots: Vec<Option<PlanEntry>> = vec![None; steps.len()];
  while let Some(joined) = join_set.join_next().await {
    match joined {
      Ok((index, entry)) => slots[index] = entry,
      Err(e) => error!(error = %e, "check task failed"),
    }
  }

  if cancel.is_cancelled() {
    warn!("planning cancelled");
    return Err(PlanError::Cancelled);
  }

  Ok(
    slots
      .into_iter()
      .zip(steps)
      .map(|(slot, step)| slot.unwrap_or_else(|| unknown(step, "check did not complete")))
      .collect(),
  )
}

fn check_step(step: StepRef, ctx: &StepContext) -> PlanEntry {
  match step.check(ctx) {
    Ok(CheckResult { status, diff }) => {
      debug!(step = %step.id(), status = %status, "checked");
      PlanEntry {
        step,
        status,
        diff,
        error: None,
      }
    }
    Err(StepError::CheckFailed(message)) => {
      warn!(step = %step.id(), error = %message, "check reported failure");
      PlanEntry {
        step,
        status: Status::Failed,
        diff: Diff::unchanged(),
        error: Some(message),
      }
    }
    Err(e) => {
      warn!(step = %step.id(), error = %e, "check errored, status unknown");
      unknown(step, e.to_string())
    }
  }
}

fn unknown(step: StepRef, message: impl Into<String>) -> PlanEntry {
  PlanEntry {
    step,
    status: Status::Unknown,
    diff: Diff::unchanged(),
    error: Some(message.into()),
  }
}
