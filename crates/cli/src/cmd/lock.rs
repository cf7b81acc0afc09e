//! Lockfile commands.

use anyhow::{Context, Result};
use clap::{Subcommand, ValueEnum};
use preflight_lib::lock::{Lockfile, Mode, lockfile_path};
use serde::Serialize;

use super::{Session, runtime};
use crate::output::{OutputFormat, format_timestamp, print_info, print_json, print_stat, print_success, truncate_hash};

#[derive(Subcommand, Debug)]
pub enum LockCommand {
  /// Record the packages of every target in the lockfile
  Update {
    /// Switch the lockfile to this mode (default: keep the current mode)
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,
  },

  /// Freeze the lockfile so pins can no longer change
  Freeze,

  /// Show the lockfile's mode and pins
  Status {
    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
  /// Always resolve the latest version
  Intent,
  /// Resolve pinned versions
  Locked,
  /// Resolve pinned versions and reject new pins
  Frozen,
}

impl From<ModeArg> for Mode {
  fn from(mode: ModeArg) -> Self {
    match mode {
      ModeArg::Intent => Mode::Intent,
      ModeArg::Locked => Mode::Locked,
      ModeArg::Frozen => Mode::Frozen,
    }
  }
}

#[derive(Debug, Serialize)]
struct StatusOutput<'a> {
  path: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  lockfile: Option<&'a Lockfile>,
}

pub fn cmd_lock(session: &Session, command: LockCommand) -> Result<()> {
  match command {
    LockCommand::Update { mode } => cmd_update(session, mode.map(Mode::from)),
    LockCommand::Freeze => cmd_freeze(session),
    LockCommand::Status { output } => cmd_status(session, output),
  }
}

fn cmd_update(session: &Session, mode: Option<Mode>) -> Result<()> {
  let engine = session.engine();
  let lockfile = runtime()?
    .block_on(engine.lock_update(&session.config_path, mode, &session.cancel))
    .context("Failed to update lockfile")?;

  print_success(&format!(
    "Locked {} package(s) in {} mode",
    lockfile.len(),
    lockfile.mode()
  ));
  print_stat("lockfile", &lockfile_path(&session.config_path).display().to_string());
  Ok(())
}

fn cmd_freeze(session: &Session) -> Result<()> {
  let lockfile = session
    .engine()
    .lock_freeze(&session.config_path)
    .context("Failed to freeze lockfile; run `preflight lock update` first")?;

  print_success(&format!("Froze {} package pin(s)", lockfile.len()));
  Ok(())
}

fn cmd_status(session: &Session, output: OutputFormat) -> Result<()> {
  let path = lockfile_path(&session.config_path);
  let lockfile = session
    .engine()
    .lock_status(&session.config_path)
    .context("Failed to read lockfile")?;

  if output.is_json() {
    return print_json(&StatusOutput {
      path: path.display().to_string(),
      lockfile: lockfile.as_ref(),
    });
  }

  let Some(lockfile) = lockfile else {
    print_info(&format!("No lockfile at {}", path.display()));
    return Ok(());
  };

  println!("Lockfile: {}", path.display());
  print_stat("mode", lockfile.mode().as_str());
  let machine = lockfile.machine();
  print_stat("machine", &format!("{} ({}/{})", machine.hostname, machine.os, machine.arch));
  print_stat("packages", &lockfile.len().to_string());

  for package in lockfile.packages() {
    println!(
      "  {}:{} {}  {} ({})",
      package.provider(),
      package.name(),
      package.version(),
      package.integrity().map_or("-", |integrity| truncate_hash(integrity.digest())),
      format_timestamp(package.recorded_at())
    );
  }

  Ok(())
}
