//! Capture and restore of file contents around mutations.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::util::fs::{absolute, unix_now, write_atomic};

use super::storage::SnapshotStore;
use super::types::{SnapshotEntry, SnapshotError, SnapshotMetadata, SnapshotSet, generate_snapshot_id};

/// Captures original file bytes before mutation and restores them on demand.
#[derive(Debug, Clone)]
pub struct SnapshotManager {
  store: SnapshotStore,
}

impl SnapshotManager {
  pub fn new(store: SnapshotStore) -> Self {
    Self { store }
  }

  pub fn store(&self) -> &SnapshotStore {
    &self.store
  }

  /// Capture the current content of every existing path as one set.
  ///
  /// Paths that do not exist are skipped. Duplicate paths are captured once.
  /// A set with no entries is returned but not persisted, since there is
  /// nothing it could restore. Its id is therefore not addressable: callers
  /// must check [`SnapshotSet::is_empty`] before recording or looking it up.
  pub fn before_apply(&self, paths: &[PathBuf]) -> Result<SnapshotSet, SnapshotError> {
    let captured_at = unix_now();
    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for path in paths {
      let path = absolute(path);
      if !seen.insert(path.clone()) {
        continue;
      }

      match fs::read(&path) {
        Ok(content) => entries.push(SnapshotEntry::new(path, content, captured_at)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
          debug!(path = %path.display(), "nothing to snapshot, path does not exist");
        }
        Err(source) => return Err(SnapshotError::Capture { path, source }),
      }
    }

    let set = SnapshotSet::new(generate_snapshot_id(), captured_at, entries);
    if set.is_empty() {
      return Ok(set);
    }

    self.store.save_set(&set)?;
    info!(id = set.id(), files = set.len(), "snapshot created");
    Ok(set)
  }

  /// Write every captured entry back to its original path.
  ///
  /// All entries are verified before anything is written, so a corrupt set
  /// never leaves a partial restore behind. Returns the restored paths in
  /// capture order.
  pub fn restore(&self, id: &str) -> Result<Vec<PathBuf>, SnapshotError> {
    let set = self.store.load_set(id)?;

    if let Some(bad) = set.entries().iter().find(|e| !e.is_intact()) {
      return Err(SnapshotError::Corrupt {
        id: id.to_string(),
        path: bad.path.clone(),
      });
    }

    let mut restored = Vec::with_capacity(set.len());
    for entry in set.entries() {
      write_atomic(&entry.path, &entry.content).map_err(|source| SnapshotError::Restore {
        path: entry.path.clone(),
        source,
      })?;
      debug!(path = %entry.path.display(), "restored");
      restored.push(entry.path.clone());
    }

    info!(id, files = restored.len(), "snapshot restored");
    Ok(restored)
  }

  pub fn list_sets(&self) -> Result<Vec<SnapshotMetadata>, SnapshotError> {
    self.store.list()
  }

  pub fn get_set(&self, id: &str) -> Result<SnapshotSet, SnapshotError> {
    self.store.load_set(id)
  }

  pub fn delete_set(&self, id: &str) -> Result<(), SnapshotError> {
    self.store.delete_set(id)?;
    info!(id, "snapshot deleted");
    Ok(())
  }

  /// The most recently created set, if any.
  pub fn latest_set(&self) -> Result<Option<SnapshotSet>, SnapshotError> {
    match self.store.load_index()?.latest() {
      Some(meta) => self.store.load_set(&meta.id).map(Some),
      None => Ok(None),
    }
  }

  /// Sets created strictly before `cutoff` (unix seconds), oldest first.
  pub fn sets_older_than(&self, cutoff: u64) -> Result<Vec<SnapshotMetadata>, SnapshotError> {
    Ok(
      self
        .store
        .list()?
        .into_iter()
        .filter(|m| m.created_at < cutoff)
        .collect(),
    )
  }

  /// Whether `path` appears in the given set.
  pub fn covers(&self, id: &str, path: &Path) -> Result<bool, SnapshotError> {
    Ok(self.store.load_set(id)?.contains(&absolute(path)))
  }
}
