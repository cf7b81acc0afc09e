//! Implementation of the `preflight plan` command.
//!
//! Checks every step of the target against the live system and prints what
//! `apply` would change. Nothing is modified.

use std::time::Instant;

use anyhow::{Context, Result};
use preflight_lib::execute::{Plan, PlanEntry};
use preflight_lib::step::{Diff, Status};
use serde::Serialize;

use super::{Session, runtime};
use crate::output::{OutputFormat, format_duration, print_info, print_json, print_stat, print_step, print_success};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlanOutput {
  config_path: String,
  target: String,
  entries: Vec<PlanEntryOutput>,
  needs_apply: usize,
  satisfied: usize,
  failed: usize,
  unknown: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlanEntryOutput {
  id: String,
  status: Status,
  #[serde(skip_serializing_if = "Option::is_none")]
  diff: Option<Diff>,
  #[serde(skip_serializing_if = "Option::is_none")]
  error: Option<String>,
}

impl From<&Plan> for PlanOutput {
  fn from(plan: &Plan) -> Self {
    Self {
      config_path: plan.config_path().display().to_string(),
      target: plan.target().to_string(),
      entries: plan
        .entries()
        .iter()
        .map(|entry| PlanEntryOutput {
          id: entry.id().to_string(),
          status: entry.status,
          diff: (!entry.diff.is_empty()).then(|| entry.diff.clone()),
          error: entry.error.clone(),
        })
        .collect(),
      needs_apply: plan.count(Status::NeedsApply),
      satisfied: plan.count(Status::Satisfied),
      failed: plan.count(Status::Failed),
      unknown: plan.count(Status::Unknown),
    }
  }
}

pub fn cmd_plan(session: &Session, output: OutputFormat) -> Result<()> {
  let engine = session.engine();
  let started = Instant::now();

  let plan = runtime()?
    .block_on(engine.plan(&session.config_path, &session.target, &session.cancel))
    .with_context(|| format!("Failed to plan {}", session.config_path.display()))?;

  if output.is_json() {
    return print_json(&PlanOutput::from(&plan));
  }

  print_plan(&plan);
  println!();
  if plan.is_noop() {
    print_success("Nothing to do, the system matches the configuration");
  } else {
    print_info(&format!(
      "{} step(s) would change",
      plan.count(Status::NeedsApply)
    ));
  }
  print_stat("checked", &format!("{} in {}", plan.len(), format_duration(started.elapsed())));

  Ok(())
}

/// One line per entry, in plan order.
pub(crate) fn print_plan(plan: &Plan) {
  println!("Plan for target '{}' ({})", plan.target(), plan.config_path().display());
  if plan.is_empty() {
    println!("  (no steps)");
  }
  for entry in plan.entries() {
    print_step(entry.status, entry.id().as_str(), &entry_detail(entry));
  }
}

fn entry_detail(entry: &PlanEntry) -> String {
  match entry.status {
    Status::NeedsApply => entry.diff.summary(),
    Status::Failed | Status::Unknown => entry.error.clone().unwrap_or_default(),
    Status::Satisfied | Status::Skipped => String::new(),
  }
}
