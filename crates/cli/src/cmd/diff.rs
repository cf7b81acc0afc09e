//! Diff command implementation.
//!
//! Shows only the pending changes of a target, one line per step.

use anyhow::{Context, Result};
use owo_colors::{OwoColorize, Stream};
use preflight_lib::step::DiffKind;

use super::{Session, runtime};
use crate::output::{OutputFormat, diff_symbol, print_json, print_success};

pub fn cmd_diff(session: &Session, output: OutputFormat) -> Result<()> {
  let engine = session.engine();

  let diff = runtime()?
    .block_on(engine.diff(&session.config_path, &session.target, &session.cancel))
    .with_context(|| format!("Failed to diff {}", session.config_path.display()))?;

  if output.is_json() {
    return print_json(&diff);
  }

  if diff.is_empty() {
    print_success("No pending changes");
    return Ok(());
  }

  for entry in &diff.entries {
    let symbol = diff_symbol(entry.diff.kind);
    let symbol = match entry.diff.kind {
      DiffKind::Added => symbol.if_supports_color(Stream::Stdout, |s| s.green()).to_string(),
      DiffKind::Removed => symbol.if_supports_color(Stream::Stdout, |s| s.red()).to_string(),
      DiffKind::Modified | DiffKind::Unchanged => symbol.if_supports_color(Stream::Stdout, |s| s.yellow()).to_string(),
    };
    println!("{} {}", symbol, entry.step_id);
    println!(
      "    {}",
      entry.summary().if_supports_color(Stream::Stdout, |s| s.dimmed())
    );
  }

  println!();
  println!(
    "{} to add, {} to change, {} to remove",
    diff.count(DiffKind::Added),
    diff.count(DiffKind::Modified),
    diff.count(DiffKind::Removed)
  );

  Ok(())
}
