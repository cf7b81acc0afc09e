//! Snapshot storage.
//!
//! Handles reading and writing snapshot sets to disk.
//!
//! # Storage Layout
//!
//! ```text
//! {state_root}/snapshots/
//! ├── index.json          # SnapshotIndex: every set, oldest first
//! └── <id>.json           # Individual SnapshotSet files
//! ```
//!
//! Set files are written once and never rewritten. Only the index changes
//! after creation, so concurrent writers can only race on the index.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::util::fs::write_atomic;

use super::types::{SNAPSHOT_INDEX_VERSION, SnapshotError, SnapshotIndex, SnapshotMetadata, SnapshotSet, is_valid_id};

/// Index file name.
const INDEX_FILENAME: &str = "index.json";

/// Manages snapshot storage on disk.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
  /// Base path for snapshot storage (e.g., `~/.preflight/snapshots`).
  base_path: PathBuf,
}

impl SnapshotStore {
  /// Create a new snapshot store at the given base path.
  pub fn new(base_path: impl Into<PathBuf>) -> Self {
    Self {
      base_path: base_path.into(),
    }
  }

  pub fn base_path(&self) -> &Path {
    &self.base_path
  }

  fn index_path(&self) -> PathBuf {
    self.base_path.join(INDEX_FILENAME)
  }

  fn set_path(&self, id: &str) -> Result<PathBuf, SnapshotError> {
    if !is_valid_id(id) {
      return Err(SnapshotError::InvalidId(id.to_string()));
    }
    Ok(self.base_path.join(format!("{id}.json")))
  }

  fn ensure_dir(&self) -> Result<(), SnapshotError> {
    fs::create_dir_all(&self.base_path).map_err(SnapshotError::CreateDir)
  }

  /// Load the snapshot index.
  ///
  /// Returns an empty index if the file doesn't exist.
  pub fn load_index(&self) -> Result<SnapshotIndex, SnapshotError> {
    let content = match fs::read_to_string(self.index_path()) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(SnapshotIndex::new()),
      Err(e) => return Err(SnapshotError::Read(e)),
    };

    let index: SnapshotIndex = serde_json::from_str(&content).map_err(SnapshotError::Parse)?;

    if index.version != SNAPSHOT_INDEX_VERSION {
      return Err(SnapshotError::UnsupportedVersion(index.version));
    }

    Ok(index)
  }

  fn save_index(&self, index: &SnapshotIndex) -> Result<(), SnapshotError> {
    self.ensure_dir()?;
    let content = serde_json::to_string_pretty(index).map_err(SnapshotError::Serialize)?;
    write_atomic(&self.index_path(), content.as_bytes()).map_err(SnapshotError::Write)
  }

  /// Load a set by id.
  pub fn load_set(&self, id: &str) -> Result<SnapshotSet, SnapshotError> {
    let path = match self.set_path(id) {
      Ok(path) => path,
      // An id that could never have been written cannot exist.
      Err(SnapshotError::InvalidId(_)) => return Err(SnapshotError::NotFound(id.to_string())),
      Err(e) => return Err(e),
    };

    let content = fs::read_to_string(&path).map_err(|e| {
      if e.kind() == io::ErrorKind::NotFound {
        SnapshotError::NotFound(id.to_string())
      } else {
        SnapshotError::Read(e)
      }
    })?;

    serde_json::from_str(&content).map_err(SnapshotError::Parse)
  }

  /// Persist a new set and add it to the index.
  pub fn save_set(&self, set: &SnapshotSet) -> Result<(), SnapshotError> {
    self.ensure_dir()?;

    let path = self.set_path(set.id())?;
    let content = serde_json::to_string_pretty(set).map_err(SnapshotError::Serialize)?;
    write_atomic(&path, content.as_bytes()).map_err(SnapshotError::Write)?;

    let mut index = self.load_index()?;
    index.add(set.to_metadata());
    self.save_index(&index)?;

    debug!(id = set.id(), entries = set.len(), "snapshot set saved");
    Ok(())
  }

  /// List all sets, oldest first.
  pub fn list(&self) -> Result<Vec<SnapshotMetadata>, SnapshotError> {
    Ok(self.load_index()?.snapshots)
  }

  /// Delete a set by id.
  ///
  /// Removes the set file and its index entry; deleting an unknown id is not
  /// an error.
  pub fn delete_set(&self, id: &str) -> Result<(), SnapshotError> {
    let path = self.set_path(id)?;

    match fs::remove_file(&path) {
      Ok(()) => {}
      Err(e) if e.kind() == io::ErrorKind::NotFound => {}
      Err(e) => return Err(SnapshotError::Write(e)),
    }

    let mut index = self.load_index()?;
    if index.remove(id) {
      self.save_index(&index)?;
    }

    Ok(())
  }
}
