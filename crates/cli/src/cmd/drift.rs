//! Drift commands: what preflight wrote, and whether it is still there.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use owo_colors::{OwoColorize, Stream};
use preflight_lib::drift::{Drift, DriftKind};

use super::Session;
use crate::output::{
  OutputFormat, format_timestamp, print_info, print_json, print_success, print_warning, symbols, truncate_hash,
};

#[derive(Subcommand, Debug)]
pub enum DriftCommand {
  /// List tracked files
  List {
    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Compare tracked files with their last applied content
  Check {
    /// Check only this file (default: every tracked file)
    path: Option<PathBuf>,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Stop tracking a file
  Untrack {
    /// File to forget
    path: PathBuf,
  },
}

pub fn cmd_drift(session: &Session, command: DriftCommand) -> Result<()> {
  match command {
    DriftCommand::List { output } => cmd_list(session, output),
    DriftCommand::Check { path, output } => cmd_check(session, path, output),
    DriftCommand::Untrack { path } => cmd_untrack(session, &path),
  }
}

fn cmd_list(session: &Session, output: OutputFormat) -> Result<()> {
  let tracked = session
    .lifecycle()
    .list_tracked_files()
    .context("Failed to read drift state")?;

  if output.is_json() {
    return print_json(&tracked);
  }

  if tracked.is_empty() {
    print_info("No tracked files");
    return Ok(());
  }

  for file in &tracked {
    println!(
      "{} {} [{}] {}",
      truncate_hash(&file.content_hash.0),
      file.path.display(),
      file.source_layer,
      format_timestamp(file.applied_at)
    );
  }
  print_info(&format!("{} tracked file(s)", tracked.len()));
  Ok(())
}

fn cmd_check(session: &Session, path: Option<PathBuf>, output: OutputFormat) -> Result<()> {
  let lifecycle = session.lifecycle();

  let drifts: Vec<Drift> = match &path {
    Some(path) => vec![
      lifecycle
        .check_drift(path)
        .with_context(|| format!("Failed to check {}", path.display()))?,
    ],
    None => lifecycle
      .check_all(&session.cancel)
      .context("Failed to check tracked files")?,
  };
  let drifted = drifts.iter().filter(|d| d.has_drift()).count();

  if output.is_json() {
    print_json(&drifts)?;
  } else {
    print_drifts(&drifts, path.is_some());
  }

  if drifted > 0 {
    bail!("{} file(s) drifted", drifted);
  }
  Ok(())
}

fn print_drifts(drifts: &[Drift], single: bool) {
  if drifts.is_empty() {
    print_success("No drift detected");
    return;
  }

  for drift in drifts {
    match &drift.kind {
      DriftKind::Untracked => print_info(&format!("{} is not tracked", drift.path.display())),
      DriftKind::Clean => print_success(&format!("{} is unchanged", drift.path.display())),
      DriftKind::Modified { .. } | DriftKind::Missing | DriftKind::Unreadable { .. } => {
        let layer = drift.source_layer.as_deref().unwrap_or("unknown");
        println!(
          "{} {} [{}]: {}",
          symbols::WARNING.if_supports_color(Stream::Stdout, |s| s.yellow()),
          drift.path.display(),
          layer,
          drift.details()
        );
      }
    }
  }

  // `check_all` only returns drifted files; a single path reports any state.
  if !single {
    print_warning(&format!("{} file(s) drifted", drifts.len()));
  }
}

fn cmd_untrack(session: &Session, path: &Path) -> Result<()> {
  let removed = session
    .lifecycle()
    .remove_tracking(path)
    .with_context(|| format!("Failed to untrack {}", path.display()))?;

  if removed {
    print_success(&format!("Stopped tracking {}", path.display()));
  } else {
    print_info(&format!("{} was not tracked", path.display()));
  }
  Ok(())
}
