//! Lockfile document types.
//!
//! The lockfile pins package versions so that every machine applying the
//! same configuration converges on the same versions. It is written beside
//! the configuration file as `<config-stem>.lock`.
//!
//! # Lock File Format
//!
//! ```json
//! {
//!   "version": 1,
//!   "mode": "locked",
//!   "machine": { "os": "macos", "arch": "aarch64", "hostname": "work-mbp" },
//!   "packages": [
//!     {
//!       "provider": "brew",
//!       "name": "git",
//!       "version": "2.43.0",
//!       "integrity": "sha256-9f86d08...",
//!       "recordedAt": 1733667300
//!     }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::platform::MachineInfo;
use crate::util::fs::write_atomic;
use crate::util::hash::Integrity;

/// Current lock file format version.
pub const LOCK_VERSION: u32 = 1;

/// Consistency mode of a lockfile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
  /// Always resolve to the latest version; pins are informational.
  #[default]
  Intent,
  /// Resolve to pinned versions; unpinned packages need a decision.
  Locked,
  /// Like `Locked`, and the set of pins may not grow or change.
  Frozen,
}

impl Mode {
  pub fn as_str(self) -> &'static str {
    match self {
      Mode::Intent => "intent",
      Mode::Locked => "locked",
      Mode::Frozen => "frozen",
    }
  }
}

impl fmt::Display for Mode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Mode {
  type Err = LockError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "intent" => Ok(Mode::Intent),
      "locked" => Ok(Mode::Locked),
      "frozen" => Ok(Mode::Frozen),
      other => Err(LockError::UnknownMode(other.to_string())),
    }
  }
}

/// Errors that can occur when working with lock files.
#[derive(Debug, Error)]
pub enum LockError {
  /// Failed to read the lock file.
  #[error("failed to read lock file: {0}")]
  Read(#[source] io::Error),

  /// Failed to write the lock file.
  #[error("failed to write lock file: {0}")]
  Write(#[source] io::Error),

  /// Failed to parse the lock file JSON.
  #[error("failed to parse lock file: {0}")]
  Parse(#[source] serde_json::Error),

  /// Failed to serialize the lock file.
  #[error("failed to serialize lock file: {0}")]
  Serialize(#[source] serde_json::Error),

  /// Lock file version is not supported.
  #[error("unsupported lock file version {0}, expected {LOCK_VERSION}")]
  UnsupportedVersion(u32),

  /// No lock file exists where one is required.
  #[error("lock file not found: {0}")]
  NotFound(PathBuf),

  #[error("unknown lock mode {0:?}, expected intent, locked or frozen")]
  UnknownMode(String),

  /// A mutation was attempted on a frozen lock file.
  #[error("lock file is frozen: cannot {action} {provider}:{name}")]
  Frozen {
    action: &'static str,
    provider: String,
    name: String,
  },
}

/// One pinned package. Immutable; replace it by recording a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageLock {
  provider: String,
  name: String,
  version: String,
  /// Digest of the installed artifact. Absent when the provider reports none.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  integrity: Option<Integrity>,
  recorded_at: u64,
}

impl PackageLock {
  pub fn new(
    provider: impl Into<String>,
    name: impl Into<String>,
    version: impl Into<String>,
    integrity: Option<Integrity>,
    recorded_at: u64,
  ) -> Self {
    Self {
      provider: provider.into(),
      name: name.into(),
      version: version.into(),
      integrity,
      recorded_at,
    }
  }

  pub fn provider(&self) -> &str {
    &self.provider
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn version(&self) -> &str {
    &self.version
  }

  pub fn integrity(&self) -> Option<&Integrity> {
    self.integrity.as_ref()
  }

  pub fn recorded_at(&self) -> u64 {
    self.recorded_at
  }

  fn key(&self) -> PackageKey {
    (self.provider.clone(), self.name.clone())
  }
}

type PackageKey = (String, String);

/// A lock file: consistency mode, originating machine, and package pins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lockfile {
  /// Lock file format version.
  pub version: u32,
  mode: Mode,
  machine: MachineInfo,
  #[serde(with = "package_list")]
  packages: BTreeMap<PackageKey, PackageLock>,
}

impl Lockfile {
  /// Create a new empty lock file.
  pub fn new(mode: Mode, machine: MachineInfo) -> Self {
    Self {
      version: LOCK_VERSION,
      mode,
      machine,
      packages: BTreeMap::new(),
    }
  }

  pub fn mode(&self) -> Mode {
    self.mode
  }

  /// Return this lock file with a different mode.
  pub fn with_mode(mut self, mode: Mode) -> Self {
    self.mode = mode;
    self
  }

  pub fn set_mode(&mut self, mode: Mode) {
    self.mode = mode;
  }

  pub fn machine(&self) -> &MachineInfo {
    &self.machine
  }

  pub fn set_machine(&mut self, machine: MachineInfo) {
    self.machine = machine;
  }

  /// Get a pin by provider and package name.
  pub fn get(&self, provider: &str, name: &str) -> Option<&PackageLock> {
    self.packages.get(&(provider.to_string(), name.to_string()))
  }

  /// All pins, ordered by provider then name.
  pub fn packages(&self) -> impl Iterator<Item = &PackageLock> {
    self.packages.values()
  }

  pub fn len(&self) -> usize {
    self.packages.len()
  }

  pub fn is_empty(&self) -> bool {
    self.packages.is_empty()
  }

  /// Insert or replace a pin.
  ///
  /// Returns `Ok(true)` if the lock file changed. In frozen mode only a pin
  /// identical in version and integrity to the existing one is accepted.
  pub fn record(&mut self, lock: PackageLock) -> Result<bool, LockError> {
    let key = lock.key();

    if let Some(existing) = self.packages.get(&key)
      && existing.version == lock.version
      && existing.integrity == lock.integrity
    {
      return Ok(false);
    }

    if self.mode == Mode::Frozen {
      let action = if self.packages.contains_key(&key) { "change" } else { "add" };
      return Err(LockError::Frozen {
        action,
        provider: lock.provider,
        name: lock.name,
      });
    }

    debug!(provider = %lock.provider, name = %lock.name, version = %lock.version, "recording pin");
    self.packages.insert(key, lock);
    Ok(true)
  }

  /// Remove a pin. Rejected in frozen mode.
  pub fn remove(&mut self, provider: &str, name: &str) -> Result<Option<PackageLock>, LockError> {
    if self.mode == Mode::Frozen {
      return Err(LockError::Frozen {
        action: "remove",
        provider: provider.to_string(),
        name: name.to_string(),
      });
    }
    Ok(self.packages.remove(&(provider.to_string(), name.to_string())))
  }

  /// Load a lock file from the given path.
  ///
  /// Returns `Ok(None)` if the file doesn't exist.
  /// Returns `Ok(Some(lock))` if the file exists and was parsed successfully.
  /// Returns `Err` if the file exists but couldn't be read or parsed.
  pub fn load(path: &Path) -> Result<Option<Self>, LockError> {
    let content = match fs::read_to_string(path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
      Err(e) => return Err(LockError::Read(e)),
    };

    let lock: Lockfile = serde_json::from_str(&content).map_err(LockError::Parse)?;

    if lock.version != LOCK_VERSION {
      return Err(LockError::UnsupportedVersion(lock.version));
    }

    Ok(Some(lock))
  }

  /// Save the lock file to the given path.
  ///
  /// The file is written atomically with pretty-printed JSON for readability.
  pub fn save(&self, path: &Path) -> Result<(), LockError> {
    let content = serde_json::to_string_pretty(self).map_err(LockError::Serialize)?;
    write_atomic(path, content.as_bytes()).map_err(LockError::Write)
  }
}

/// Pins serialize as a flat list; the map key is derived from each entry.
mod package_list {
  use std::collections::BTreeMap;

  use serde::{Deserialize, Deserializer, Serializer};

  use super::{PackageKey, PackageLock};

  pub fn serialize<S: Serializer>(map: &BTreeMap<PackageKey, PackageLock>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(map.values())
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BTreeMap<PackageKey, PackageLock>, D::Error> {
    let list = Vec::<PackageLock>::deserialize(deserializer)?;
    Ok(list.into_iter().map(|lock| (lock.key(), lock)).collect())
  }
}
