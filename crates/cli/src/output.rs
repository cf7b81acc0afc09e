//! CLI output formatting utilities.
//!
//! Colored status lines, step status markers, and human-readable sizes,
//! durations and timestamps.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};
use preflight_lib::doctor::Severity;
use preflight_lib::step::{DiffKind, Status};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const WARNING: &str = "⚠";
  pub const INFO: &str = "•";
  pub const ADD: &str = "+";
  pub const MODIFY: &str = "~";
  pub const REMOVE: &str = "-";
  pub const SKIP: &str = "○";
  pub const UNKNOWN: &str = "?";
}

pub fn truncate_hash(hash: &str) -> &str {
  let len = hash.len().min(12);
  &hash[..len]
}

pub fn format_bytes(bytes: u64) -> String {
  const KB: u64 = 1024;
  const MB: u64 = KB * 1024;
  const GB: u64 = MB * 1024;

  if bytes >= GB {
    format!("{:.1} GB", bytes as f64 / GB as f64)
  } else if bytes >= MB {
    format!("{:.1} MB", bytes as f64 / MB as f64)
  } else if bytes >= KB {
    format!("{:.1} KB", bytes as f64 / KB as f64)
  } else {
    format!("{} B", bytes)
  }
}

pub fn format_duration(duration: Duration) -> String {
  let secs = duration.as_secs();
  let millis = duration.subsec_millis();

  if secs >= 60 {
    let mins = secs / 60;
    let remaining_secs = secs % 60;
    format!("{}m {}s", mins, remaining_secs)
  } else if secs > 0 {
    format!("{}.{:02}s", secs, millis / 10)
  } else {
    format!("{}ms", millis)
  }
}

/// Relative age of a unix timestamp, e.g. `5 minutes ago`.
pub fn format_timestamp(timestamp: u64) -> String {
  let datetime = UNIX_EPOCH + Duration::from_secs(timestamp);
  match SystemTime::now().duration_since(datetime) {
    Ok(duration) => {
      let secs = duration.as_secs();
      if secs < 60 {
        format!("{} seconds ago", secs)
      } else if secs < 3600 {
        format!("{} minutes ago", secs / 60)
      } else if secs < 86400 {
        format!("{} hours ago", secs / 3600)
      } else {
        format!("{} days ago", secs / 86400)
      }
    }
    Err(_) => format!("timestamp: {}", timestamp),
  }
}

/// Marker printed in front of a step line.
pub fn status_symbol(status: Status) -> &'static str {
  match status {
    Status::Satisfied => symbols::SUCCESS,
    Status::NeedsApply => symbols::MODIFY,
    Status::Failed => symbols::ERROR,
    Status::Skipped => symbols::SKIP,
    Status::Unknown => symbols::UNKNOWN,
  }
}

pub fn diff_symbol(kind: DiffKind) -> &'static str {
  match kind {
    DiffKind::Added => symbols::ADD,
    DiffKind::Removed => symbols::REMOVE,
    DiffKind::Modified | DiffKind::Unchanged => symbols::MODIFY,
  }
}

/// `  <symbol> <id>  <detail>`, colored by status.
pub fn print_step(status: Status, id: &str, detail: &str) {
  let symbol = status_symbol(status);
  let symbol = match status {
    Status::Satisfied => symbol.if_supports_color(Stream::Stdout, |s| s.green()).to_string(),
    Status::NeedsApply => symbol.if_supports_color(Stream::Stdout, |s| s.yellow()).to_string(),
    Status::Failed => symbol.if_supports_color(Stream::Stdout, |s| s.red()).to_string(),
    Status::Skipped | Status::Unknown => symbol.if_supports_color(Stream::Stdout, |s| s.dimmed()).to_string(),
  };

  if detail.is_empty() {
    println!("  {} {}", symbol, id);
  } else {
    println!(
      "  {} {}  {}",
      symbol,
      id,
      detail.if_supports_color(Stream::Stdout, |s| s.dimmed())
    );
  }
}

pub fn print_issue(severity: Severity, subject: &str, message: &str) {
  let symbol = match severity {
    Severity::Error => symbols::ERROR.if_supports_color(Stream::Stdout, |s| s.red()).to_string(),
    Severity::Warning => symbols::WARNING.if_supports_color(Stream::Stdout, |s| s.yellow()).to_string(),
    Severity::Info => symbols::INFO.if_supports_color(Stream::Stdout, |s| s.blue()).to_string(),
  };
  println!("  {} {}: {}", symbol, subject, message);
}

pub fn print_success(message: &str) {
  println!(
    "{} {}",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
    message
  );
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    symbols::ERROR.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_warning(message: &str) {
  eprintln!(
    "{} {}",
    symbols::WARNING.if_supports_color(Stream::Stderr, |s| s.yellow()),
    message.if_supports_color(Stream::Stderr, |s| s.yellow())
  );
}

pub fn print_info(message: &str) {
  println!(
    "{} {}",
    symbols::INFO.if_supports_color(Stream::Stdout, |s| s.blue()),
    message
  );
}

pub fn print_stat(label: &str, value: &str) {
  println!(
    "  {}: {}",
    label.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    value
  );
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}
