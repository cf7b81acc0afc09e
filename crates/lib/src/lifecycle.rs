//! The snapshot/drift pairing around one file mutation.
//!
//! ```text
//! before_modify(path)        snapshot original bytes
//!        |
//!   step writes the file
//!        |
//! after_apply(path, layer)   record new hash for drift detection
//! ```
//!
//! A file that went through both halves is protected by rollback and
//! watched for tampering at the same time.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::cancel::CancelToken;
use crate::consts::{SNAPSHOTS_DIR, STATE_FILENAME};
use crate::drift::{Drift, DriftDetector, DriftError, FileState, StateStore};
use crate::snapshot::{SnapshotError, SnapshotManager, SnapshotMetadata, SnapshotSet, SnapshotStore};
use crate::util::fs::unix_now;
use crate::util::hash::{ContentHash, hash_file};

#[derive(Debug, Error)]
pub enum LifecycleError {
  #[error(transparent)]
  Snapshot(#[from] SnapshotError),

  #[error(transparent)]
  Drift(#[from] DriftError),
}

/// Composes [`SnapshotManager`] and [`DriftDetector`] over one state root.
#[derive(Debug, Clone)]
pub struct LifecycleManager {
  snapshots: SnapshotManager,
  drift: DriftDetector,
}

impl LifecycleManager {
  /// Lay out state under `state_root`: `state.json` and `snapshots/`.
  pub fn new(state_root: &Path) -> Self {
    Self::from_parts(
      SnapshotManager::new(SnapshotStore::new(state_root.join(SNAPSHOTS_DIR))),
      DriftDetector::new(StateStore::new(state_root.join(STATE_FILENAME))),
    )
  }

  pub fn from_parts(snapshots: SnapshotManager, drift: DriftDetector) -> Self {
    Self { snapshots, drift }
  }

  pub fn snapshots(&self) -> &SnapshotManager {
    &self.snapshots
  }

  pub fn drift(&self) -> &DriftDetector {
    &self.drift
  }

  /// Snapshot a single path before it is written.
  ///
  /// Returns `None` when the path does not exist yet.
  pub fn before_modify(&self, path: &Path) -> Result<Option<SnapshotSet>, LifecycleError> {
    let set = self.snapshots.before_apply(&[path.to_path_buf()])?;
    if set.is_empty() {
      debug!(path = %path.display(), "new file, no snapshot taken");
      return Ok(None);
    }
    Ok(Some(set))
  }

  /// Snapshot several paths as one rollback unit.
  pub fn before_apply(&self, paths: &[PathBuf]) -> Result<SnapshotSet, LifecycleError> {
    Ok(self.snapshots.before_apply(paths)?)
  }

  /// Record the hash `path` has now, attributed to `source_layer`.
  pub fn after_apply(&self, path: &Path, source_layer: &str) -> Result<ContentHash, LifecycleError> {
    let hash = hash_file(path).map_err(DriftError::from)?;
    self.drift.update_file(path, hash.clone(), source_layer, unix_now())?;
    Ok(hash)
  }

  pub fn list_sets(&self) -> Result<Vec<SnapshotMetadata>, LifecycleError> {
    Ok(self.snapshots.list_sets()?)
  }

  pub fn get_set(&self, id: &str) -> Result<SnapshotSet, LifecycleError> {
    Ok(self.snapshots.get_set(id)?)
  }

  pub fn restore(&self, id: &str) -> Result<Vec<PathBuf>, LifecycleError> {
    Ok(self.snapshots.restore(id)?)
  }

  pub fn list_tracked_files(&self) -> Result<Vec<FileState>, LifecycleError> {
    Ok(self.drift.list_tracked()?)
  }

  pub fn check_drift(&self, path: &Path) -> Result<Drift, LifecycleError> {
    Ok(self.drift.detect(path)?)
  }

  pub fn check_all(&self, cancel: &CancelToken) -> Result<Vec<Drift>, LifecycleError> {
    Ok(self.drift.detect_all(cancel)?)
  }

  pub fn remove_tracking(&self, path: &Path) -> Result<bool, LifecycleError> {
    Ok(self.drift.remove_tracking(path)?)
  }
}
