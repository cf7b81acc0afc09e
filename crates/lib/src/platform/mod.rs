//! Host information and platform paths.

pub mod paths;

use serde::{Deserialize, Serialize};

/// Identity of the machine a lockfile was written on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineInfo {
  pub os: String,
  pub arch: String,
  pub hostname: String,
}

impl MachineInfo {
  /// Probe the current host.
  pub fn detect() -> Self {
    Self {
      os: std::env::consts::OS.to_string(),
      arch: std::env::consts::ARCH.to_string(),
      hostname: whoami::fallible::hostname().unwrap_or_else(|_| "unknown".to_string()),
    }
  }
}

/// Source of [`MachineInfo`], swappable in tests.
pub trait SystemProbe: Send + Sync {
  fn machine_info(&self) -> MachineInfo;
}

/// Probes the host the process runs on.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalProbe;

impl SystemProbe for LocalProbe {
  fn machine_info(&self) -> MachineInfo {
    MachineInfo::detect()
  }
}
