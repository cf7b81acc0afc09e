//! Implementation of the `preflight apply` command.
//!
//! Plans the target, then applies every step that needs it, one at a time.
//! Files a step writes are snapshotted first and tracked afterwards, so a
//! failed or unwanted change can be rolled back with `preflight snapshot
//! restore`.

use std::time::Instant;

use anyhow::{Context, Result, bail};
use preflight_lib::EngineError;
use preflight_lib::execute::{ApplyError, StepResult};
use preflight_lib::step::Status;
use serde::Serialize;
use tracing::info;

use super::plan::print_plan;
use super::{Session, runtime};
use crate::output::{
  OutputFormat, format_duration, print_error, print_info, print_json, print_step, print_success, print_warning,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApplyOutput {
  dry_run: bool,
  cancelled: bool,
  results: Vec<StepResult>,
  not_applied: Vec<NotApplied>,
  duration_ms: u128,
}

/// A planned step whose check did not produce an actionable status.
#[derive(Debug, Serialize)]
struct NotApplied {
  id: String,
  status: Status,
  #[serde(skip_serializing_if = "Option::is_none")]
  error: Option<String>,
}

pub fn cmd_apply(session: &Session, dry_run: bool, output: OutputFormat) -> Result<()> {
  let engine = session.engine();
  let rt = runtime()?;
  let started = Instant::now();

  let plan = rt
    .block_on(engine.plan(&session.config_path, &session.target, &session.cancel))
    .with_context(|| format!("Failed to plan {}", session.config_path.display()))?;

  let (results, cancelled) = match rt.block_on(engine.apply(&plan, dry_run, &session.cancel)) {
    Ok(results) => (results, false),
    Err(EngineError::Apply(ApplyError::Cancelled { results })) => (results, true),
    Err(e) => return Err(e).context("Apply failed"),
  };

  let not_applied: Vec<NotApplied> = plan
    .entries()
    .iter()
    .filter(|e| matches!(e.status, Status::Failed | Status::Unknown))
    .map(|e| NotApplied {
      id: e.id().to_string(),
      status: e.status,
      error: e.error.clone(),
    })
    .collect();
  let failed = results.iter().filter(|r| r.status == Status::Failed).count();
  let not_converged = failed + not_applied.len();
  let elapsed = started.elapsed();

  info!(
    applied = results.iter().filter(|r| r.is_success()).count(),
    failed,
    not_applied = not_applied.len(),
    dry_run,
    "apply finished"
  );

  if output.is_json() {
    print_json(&ApplyOutput {
      dry_run,
      cancelled,
      results,
      not_applied,
      duration_ms: elapsed.as_millis(),
    })?;
  } else if dry_run {
    print_plan(&plan);
    println!();
    if results.is_empty() {
      print_success("Nothing to apply, the system matches the configuration");
    } else {
      print_info(&format!("Dry run: {} step(s) would be applied", results.len()));
    }
  } else {
    println!("Applying target '{}' ({})", plan.target(), plan.config_path().display());
    print_results(&results, &not_applied);
    println!();
    if results.is_empty() && not_applied.is_empty() && !cancelled {
      print_success("Nothing to apply, the system matches the configuration");
    } else {
      print_info(&format!(
        "Applied {} step(s) in {}",
        results.len() - failed,
        format_duration(elapsed)
      ));
    }
  }

  if cancelled {
    bail!("apply cancelled; steps already applied stay applied");
  }
  if not_converged > 0 {
    bail!("{} step(s) did not converge", not_converged);
  }
  Ok(())
}

fn print_results(results: &[StepResult], not_applied: &[NotApplied]) {
  for result in results {
    let detail = match (&result.error, &result.snapshot_id) {
      (Some(error), _) => error.clone(),
      (None, Some(snapshot)) => format!("snapshot {snapshot}"),
      (None, None) => String::new(),
    };
    print_step(result.status, result.step_id.as_str(), &detail);
  }
  for entry in not_applied {
    print_step(entry.status, &entry.id, entry.error.as_deref().unwrap_or("not applied"));
  }

  for result in results.iter().filter(|r| r.status == Status::Failed) {
    match &result.snapshot_id {
      Some(snapshot) => print_error(&format!(
        "{} failed; restore with `preflight snapshot restore {}`",
        result.step_id, snapshot
      )),
      None => print_error(&format!("{} failed", result.step_id)),
    }
  }
  if !not_applied.is_empty() {
    print_warning(&format!(
      "{} step(s) were not applied because their check did not complete",
      not_applied.len()
    ));
  }
}
