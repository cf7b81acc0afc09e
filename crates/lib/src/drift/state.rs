//! Drift state persistence.
//!
//! Every file written through the lifecycle manager is recorded here with the
//! hash it had right after preflight wrote it. The whole set is one document,
//! loaded and saved as a unit.
//!
//! # Storage Layout
//!
//! ```text
//! {state_root}/state.json
//! ```
//!
//! # Example State File
//!
//! ```json
//! {
//!   "version": 1,
//!   "files": {
//!     "/home/me/.zshrc": {
//!       "path": "/home/me/.zshrc",
//!       "contentHash": "9f86d081884c7d65...",
//!       "sourceLayer": "work",
//!       "appliedAt": 1733667300
//!     }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::util::fs::write_atomic;
use crate::util::hash::{ContentHash, HashError};

/// Current drift state format version.
pub const STATE_VERSION: u32 = 1;

/// Recorded state of one tracked file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileState {
  pub path: PathBuf,
  pub content_hash: ContentHash,
  pub source_layer: String,
  pub applied_at: u64,
}

/// All tracked files, keyed by absolute path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftState {
  pub version: u32,
  pub files: BTreeMap<PathBuf, FileState>,
}

impl Default for DriftState {
  fn default() -> Self {
    Self {
      version: STATE_VERSION,
      files: BTreeMap::new(),
    }
  }
}

impl DriftState {
  pub fn get(&self, path: &Path) -> Option<&FileState> {
    self.files.get(path)
  }

  pub fn len(&self) -> usize {
    self.files.len()
  }

  pub fn is_empty(&self) -> bool {
    self.files.is_empty()
  }
}

/// Errors that can occur while tracking drift.
#[derive(Debug, Error)]
pub enum DriftError {
  /// Failed to read the state file.
  #[error("failed to read drift state: {0}")]
  Read(#[source] io::Error),

  /// Failed to write the state file.
  #[error("failed to write drift state: {0}")]
  Write(#[source] io::Error),

  /// The state file exists but is not a valid document.
  #[error("drift state is corrupted: {0}")]
  Parse(#[source] serde_json::Error),

  #[error("failed to serialize drift state: {0}")]
  Serialize(#[source] serde_json::Error),

  #[error("unsupported drift state version {0}, expected {STATE_VERSION}")]
  UnsupportedVersion(u32),

  /// Hashing a tracked file failed.
  #[error("failed to hash tracked file: {0}")]
  Hash(#[from] HashError),

  #[error("drift check cancelled")]
  Cancelled,
}

/// Reads and writes the drift state document.
#[derive(Debug, Clone)]
pub struct StateStore {
  path: PathBuf,
}

impl StateStore {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Load the state document.
  ///
  /// Returns an empty state if the file doesn't exist. A file that exists but
  /// cannot be parsed is an error: silently starting over would forget every
  /// tracked file.
  pub fn load(&self) -> Result<DriftState, DriftError> {
    let content = match fs::read_to_string(&self.path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(DriftState::default()),
      Err(e) => return Err(DriftError::Read(e)),
    };

    let state: DriftState = serde_json::from_str(&content).map_err(DriftError::Parse)?;
    if state.version != STATE_VERSION {
      return Err(DriftError::UnsupportedVersion(state.version));
    }

    debug!(path = %self.path.display(), files = state.len(), "loaded drift state");
    Ok(state)
  }

  /// Save the state document atomically.
  pub fn save(&self, state: &DriftState) -> Result<(), DriftError> {
    let content = serde_json::to_string_pretty(state).map_err(DriftError::Serialize)?;
    write_atomic(&self.path, content.as_bytes()).map_err(DriftError::Write)
  }
}
