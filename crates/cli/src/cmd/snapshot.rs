use std::time::Duration;

use anyhow::{Context, Result};
use clap::Subcommand;
use preflight_lib::snapshot::{SnapshotMetadata, SnapshotSet};
use preflight_lib::util::fs::unix_now;
use serde::Serialize;
use tracing::{debug, info};

use super::Session;
use crate::output::{
  OutputFormat, format_bytes, format_timestamp, print_error, print_info, print_json, print_success, truncate_hash,
};
use crate::prompts::confirm;

#[derive(Subcommand, Debug)]
pub enum SnapshotCommand {
  /// List all snapshots, newest first
  List {
    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Show the files captured by a snapshot
  Show {
    /// Snapshot ID to show
    id: String,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Write the captured files back to their original paths
  Restore {
    /// Snapshot ID to restore, or `latest`
    id: String,

    /// Skip confirmation prompt
    #[arg(long)]
    force: bool,
  },

  /// Delete snapshots
  Delete {
    /// Snapshot IDs to delete
    ids: Vec<String>,

    /// Delete snapshots older than this duration (e.g., "7d", "24h", "2w")
    #[arg(long, value_parser = humantime::parse_duration)]
    older_than: Option<Duration>,

    /// Preview what would be deleted without actually deleting
    #[arg(long)]
    dry_run: bool,

    /// Skip confirmation prompt
    #[arg(long)]
    force: bool,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },
}

#[derive(Debug, Serialize)]
struct DeleteResult {
  deleted: Vec<String>,
  failed: Vec<DeleteFailure>,
  dry_run: bool,
}

#[derive(Debug, Serialize)]
struct DeleteFailure {
  id: String,
  error: String,
}

pub fn cmd_snapshot(session: &Session, command: SnapshotCommand) -> Result<()> {
  match command {
    SnapshotCommand::List { output } => cmd_list(session, output),
    SnapshotCommand::Show { id, output } => cmd_show(session, &id, output),
    SnapshotCommand::Restore { id, force } => cmd_restore(session, &id, force),
    SnapshotCommand::Delete {
      ids,
      older_than,
      dry_run,
      force,
      output,
    } => cmd_delete(session, ids, older_than, dry_run, force, output),
  }
}

fn cmd_list(session: &Session, output: OutputFormat) -> Result<()> {
  let mut snapshots: Vec<SnapshotMetadata> = session
    .lifecycle()
    .list_sets()
    .context("Failed to list snapshots")?;
  snapshots.reverse();

  if output.is_json() {
    return print_json(&snapshots);
  }

  if snapshots.is_empty() {
    print_info("No snapshots found");
    return Ok(());
  }

  for snapshot in &snapshots {
    println!(
      "{} - {} ({} file(s))",
      snapshot.id,
      format_timestamp(snapshot.created_at),
      snapshot.entry_count()
    );
  }
  print_info(&format!("{} snapshot(s) total", snapshots.len()));

  Ok(())
}

fn cmd_show(session: &Session, id: &str, output: OutputFormat) -> Result<()> {
  let set = session
    .lifecycle()
    .get_set(id)
    .with_context(|| format!("Failed to load snapshot {}", id))?;

  if output.is_json() {
    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct ShowOutput {
      id: String,
      created_at: u64,
      entries: Vec<EntryInfo>,
    }

    #[derive(Serialize)]
    struct EntryInfo {
      path: String,
      size: u64,
      integrity: String,
      intact: bool,
    }

    return print_json(&ShowOutput {
      id: set.id().to_string(),
      created_at: set.created_at(),
      entries: set
        .entries()
        .iter()
        .map(|e| EntryInfo {
          path: e.path.display().to_string(),
          size: e.content.len() as u64,
          integrity: e.integrity.to_string(),
          intact: e.is_intact(),
        })
        .collect(),
    });
  }

  print_set(&set);
  Ok(())
}

fn print_set(set: &SnapshotSet) {
  println!("Snapshot: {}", set.id());
  println!("Created:  {}", format_timestamp(set.created_at()));
  println!("Files:    {}", set.len());
  for entry in set.entries() {
    let marker = if entry.is_intact() { "" } else { " (corrupt)" };
    println!(
      "  {} {} {}{}",
      truncate_hash(entry.integrity.digest()),
      format_bytes(entry.content.len() as u64),
      entry.path.display(),
      marker
    );
  }
}

fn cmd_restore(session: &Session, id: &str, force: bool) -> Result<()> {
  let lifecycle = session.lifecycle();
  let set = if id == "latest" {
    lifecycle
      .snapshots()
      .latest_set()
      .context("Failed to load latest snapshot")?
      .context("No snapshots to restore")?
  } else {
    lifecycle
      .get_set(id)
      .with_context(|| format!("Failed to load snapshot {}", id))?
  };
  let id = set.id();

  println!("The following files will be overwritten:");
  for entry in set.entries() {
    println!("  {}", entry.path.display());
  }

  if !confirm(&format!("Restore {} file(s) from snapshot {}?", set.len(), id), force)? {
    print_info("Cancelled");
    return Ok(());
  }

  let restored = lifecycle
    .restore(id)
    .with_context(|| format!("Failed to restore snapshot {}", id))?;

  info!(snapshot_id = %id, files = restored.len(), "snapshot restored");
  print_success(&format!("Restored {} file(s) from snapshot {}", restored.len(), id));
  Ok(())
}

fn cmd_delete(
  session: &Session,
  ids: Vec<String>,
  older_than: Option<Duration>,
  dry_run: bool,
  force: bool,
  output: OutputFormat,
) -> Result<()> {
  let lifecycle = session.lifecycle();
  let mut candidates = ids;

  if let Some(duration) = older_than {
    let cutoff = unix_now().saturating_sub(duration.as_secs());
    let old = lifecycle
      .snapshots()
      .sets_older_than(cutoff)
      .context("Failed to list snapshots")?;
    for snapshot in old {
      if !candidates.contains(&snapshot.id) {
        candidates.push(snapshot.id);
      }
    }
  }

  if candidates.is_empty() {
    if output.is_json() {
      print_json(&DeleteResult {
        deleted: vec![],
        failed: vec![],
        dry_run,
      })?;
    } else {
      print_info("No snapshots to delete");
    }
    return Ok(());
  }

  if !output.is_json() {
    if dry_run {
      print_info("Dry run - the following snapshots would be deleted:");
    } else {
      println!("The following snapshots will be deleted:");
    }
    for id in &candidates {
      println!("  {}", id);
    }
  }

  if dry_run {
    if output.is_json() {
      print_json(&DeleteResult {
        deleted: candidates,
        failed: vec![],
        dry_run: true,
      })?;
    }
    return Ok(());
  }

  if !confirm(&format!("Delete {} snapshot(s)?", candidates.len()), force)? {
    if output.is_json() {
      print_json(&DeleteResult {
        deleted: vec![],
        failed: vec![],
        dry_run,
      })?;
    } else {
      print_info("Cancelled");
    }
    return Ok(());
  }

  let mut deleted = Vec::new();
  let mut failed = Vec::new();

  for id in candidates {
    debug!(snapshot_id = %id, "deleting snapshot");
    match lifecycle.snapshots().delete_set(&id) {
      Ok(()) => deleted.push(id),
      Err(e) => {
        debug!(snapshot_id = %id, error = %e, "failed to delete snapshot");
        failed.push(DeleteFailure {
          id,
          error: e.to_string(),
        });
      }
    }
  }

  if output.is_json() {
    print_json(&DeleteResult {
      deleted,
      failed,
      dry_run: false,
    })?;
  } else {
    if !deleted.is_empty() {
      print_success(&format!("Deleted {} snapshot(s)", deleted.len()));
    }
    for f in &failed {
      print_error(&format!("Failed to delete {}: {}", f.id, f.error));
    }
  }

  Ok(())
}
