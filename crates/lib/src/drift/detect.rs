//! Drift detection for tracked files.
//!
//! Only files recorded through [`DriftDetector::update_file`] are checked. For
//! every tracked file the current content hash is recomputed and compared
//! byte-exact with the recorded one; a missing or unreadable file counts as
//! drift too.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::util::fs::absolute;
use crate::util::hash::{ContentHash, hash_file};

use super::state::{DriftError, FileState, StateStore};

/// Outcome of checking one path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum DriftKind {
  /// The path has never been recorded, so it is not checked.
  Untracked,
  /// Current content matches the recorded hash.
  Clean,
  /// Current content differs from the recorded hash.
  Modified { expected: ContentHash, actual: ContentHash },
  /// The tracked file no longer exists.
  Missing,
  /// The tracked file exists but could not be read.
  Unreadable { message: String },
}

/// Result of one detection pass over a single path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Drift {
  pub path: PathBuf,
  #[serde(flatten)]
  pub kind: DriftKind,
  /// Layer that last wrote the file, for tracked paths.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub source_layer: Option<String>,
}

impl Drift {
  pub fn has_drift(&self) -> bool {
    !matches!(self.kind, DriftKind::Untracked | DriftKind::Clean)
  }

  /// Human-readable explanation.
  pub fn details(&self) -> String {
    match &self.kind {
      DriftKind::Untracked => "not tracked".to_string(),
      DriftKind::Clean => "unchanged since last apply".to_string(),
      DriftKind::Modified { expected, actual } => format!(
        "content changed since last apply (expected {}, found {})",
        short(&expected.0),
        short(&actual.0)
      ),
      DriftKind::Missing => "file was removed since last apply".to_string(),
      DriftKind::Unreadable { message } => format!("file could not be read: {message}"),
    }
  }
}

impl fmt::Display for Drift {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}", self.path.display(), self.details())
  }
}

fn short(hash: &str) -> &str {
  &hash[..hash.len().min(12)]
}

/// Compares tracked files against their recorded hashes.
#[derive(Debug, Clone)]
pub struct DriftDetector {
  store: StateStore,
}

impl DriftDetector {
  pub fn new(store: StateStore) -> Self {
    Self { store }
  }

  pub fn store(&self) -> &StateStore {
    &self.store
  }

  /// Check a single path. Untracked paths yield [`DriftKind::Untracked`].
  pub fn detect(&self, path: &Path) -> Result<Drift, DriftError> {
    let path = absolute(path);
    let state = self.store.load()?;
    Ok(match state.get(&path) {
      Some(recorded) => check_file(recorded),
      None => Drift {
        path,
        kind: DriftKind::Untracked,
        source_layer: None,
      },
    })
  }

  /// Check every tracked file and return the ones that drifted.
  pub fn detect_all(&self, cancel: &CancelToken) -> Result<Vec<Drift>, DriftError> {
    let state = self.store.load()?;
    let mut drifted = Vec::new();

    for recorded in state.files.values() {
      if cancel.is_cancelled() {
        return Err(DriftError::Cancelled);
      }
      let drift = check_file(recorded);
      if drift.has_drift() {
        drifted.push(drift);
      }
    }

    info!(tracked = state.len(), drifted = drifted.len(), "drift check complete");
    Ok(drifted)
  }

  /// Check the given paths and return the tracked ones that drifted.
  ///
  /// Untracked paths are skipped silently.
  pub fn detect_paths(&self, paths: &[PathBuf], cancel: &CancelToken) -> Result<Vec<Drift>, DriftError> {
    let state = self.store.load()?;
    let mut drifted = Vec::new();

    for path in paths {
      if cancel.is_cancelled() {
        return Err(DriftError::Cancelled);
      }
      let Some(recorded) = state.get(&absolute(path)) else {
        debug!(path = %path.display(), "skipping untracked path");
        continue;
      };
      let drift = check_file(recorded);
      if drift.has_drift() {
        drifted.push(drift);
      }
    }

    Ok(drifted)
  }

  /// Record the hash a file had right after it was written.
  ///
  /// Re-recording the same `(path, hash, layer)` leaves the document
  /// untouched.
  pub fn update_file(
    &self,
    path: &Path,
    hash: ContentHash,
    source_layer: &str,
    applied_at: u64,
  ) -> Result<(), DriftError> {
    let path = absolute(path);
    let mut state = self.store.load()?;

    if let Some(existing) = state.get(&path)
      && existing.content_hash == hash
      && existing.source_layer == source_layer
    {
      debug!(path = %path.display(), "tracked hash unchanged");
      return Ok(());
    }

    debug!(path = %path.display(), hash = %hash, layer = source_layer, "tracking file");
    state.files.insert(
      path.clone(),
      FileState {
        path,
        content_hash: hash,
        source_layer: source_layer.to_string(),
        applied_at,
      },
    );
    self.store.save(&state)
  }

  /// Stop tracking a path. Returns whether it was tracked.
  pub fn remove_tracking(&self, path: &Path) -> Result<bool, DriftError> {
    let path = absolute(path);
    let mut state = self.store.load()?;
    if state.files.remove(&path).is_none() {
      return Ok(false);
    }
    self.store.save(&state)?;
    info!(path = %path.display(), "stopped tracking file");
    Ok(true)
  }

  /// All tracked files, ordered by path.
  pub fn list_tracked(&self) -> Result<Vec<FileState>, DriftError> {
    Ok(self.store.load()?.files.into_values().collect())
  }
}

fn check_file(recorded: &FileState) -> Drift {
  let kind = match hash_file(&recorded.path) {
    Ok(actual) if actual == recorded.content_hash => DriftKind::Clean,
    Ok(actual) => DriftKind::Modified {
      expected: recorded.content_hash.clone(),
      actual,
    },
    Err(e) if e.is_not_found() => DriftKind::Missing,
    Err(e) => DriftKind::Unreadable { message: e.to_string() },
  };

  if !matches!(kind, DriftKind::Clean) {
    warn!(path = %recorded.path.display(), layer = %recorded.source_layer, "drift detected");
  }

  Drift {
    path: recorded.path.clone(),
    kind,
    source_layer: Some(recorded.source_layer.clone()),
  }
}
