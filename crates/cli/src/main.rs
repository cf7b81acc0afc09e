mod cmd;
mod config;
mod files;
mod output;
mod prompts;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use preflight_lib::CancelToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use cmd::{
  DriftCommand, LockCommand, Session, SnapshotCommand, cmd_apply, cmd_diff, cmd_doctor, cmd_drift, cmd_lock, cmd_plan,
  cmd_snapshot,
};
use output::{OutputFormat, print_error};

/// preflight - check, plan and converge machine configuration
#[derive(Parser, Debug)]
#[command(name = "preflight")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Configuration file
  #[arg(short, long, global = true, default_value = "preflight.yaml")]
  config: PathBuf,

  /// Target to reconcile
  #[arg(short, long, global = true, default_value = "default")]
  target: String,

  /// State directory for snapshots and drift tracking (default: $PREFLIGHT_HOME or ~/.preflight)
  #[arg(long, global = true)]
  state_dir: Option<PathBuf>,

  /// Maximum number of concurrent checks while planning
  #[arg(short = 'j', long, global = true)]
  jobs: Option<usize>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
  /// Check every step and show what apply would change
  Plan {
    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Converge the system to the configuration
  Apply {
    /// Show what would be applied without changing anything
    #[arg(long)]
    dry_run: bool,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Report unsatisfied steps and drifted files
  Doctor {
    /// Apply the steps behind fixable issues
    #[arg(long)]
    fix: bool,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Show pending changes only
  Diff {
    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Manage the lockfile
  #[command(subcommand)]
  Lock(LockCommand),

  /// Manage pre-apply snapshots
  #[command(subcommand)]
  Snapshot(SnapshotCommand),

  /// Inspect tracked files for out-of-band changes
  #[command(subcommand)]
  Drift(DriftCommand),
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "warn" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  match run(cli) {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      print_error(&format!("{:#}", e));
      ExitCode::FAILURE
    }
  }
}

fn run(cli: Cli) -> Result<()> {
  let session = Session::new(cli.config, cli.target, cli.state_dir, cli.jobs, cancel_on_interrupt())?;

  match cli.command {
    Commands::Plan { output } => cmd_plan(&session, output),
    Commands::Apply { dry_run, output } => cmd_apply(&session, dry_run, output),
    Commands::Doctor { fix, output } => cmd_doctor(&session, fix, output),
    Commands::Diff { output } => cmd_diff(&session, output),
    Commands::Lock(command) => cmd_lock(&session, command),
    Commands::Snapshot(command) => cmd_snapshot(&session, command),
    Commands::Drift(command) => cmd_drift(&session, command),
  }
}

fn cancel_on_interrupt() -> CancelToken {
  let cancel = CancelToken::new();
  if let Err(e) = install_interrupt_handler(cancel.clone()) {
    warn!(error = %e, "failed to install Ctrl-C handler, an interrupt will stop mid-step");
  }
  cancel
}

/// First Ctrl-C stops between steps, a second one exits immediately.
fn install_interrupt_handler(cancel: CancelToken) -> Result<(), ctrlc::Error> {
  ctrlc::set_handler(move || {
    if cancel.is_cancelled() {
      std::process::exit(130);
    }
    cancel.cancel();
    eprintln!("\ninterrupt received, stopping after the current step...");
  })
}
