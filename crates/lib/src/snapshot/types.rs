use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::hash::Integrity;

/// Current snapshot index format version.
pub const SNAPSHOT_INDEX_VERSION: u32 = 1;

/// One file's content at capture time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotEntry {
  pub path: PathBuf,
  #[serde(with = "base64_bytes")]
  pub content: Vec<u8>,
  pub integrity: Integrity,
  pub captured_at: u64,
}

impl SnapshotEntry {
  pub fn new(path: impl Into<PathBuf>, content: Vec<u8>, captured_at: u64) -> Self {
    let integrity = Integrity::of_bytes(&content);
    Self {
      path: path.into(),
      content,
      integrity,
      captured_at,
    }
  }

  /// True if the stored bytes still match the recorded integrity.
  pub fn is_intact(&self) -> bool {
    self.integrity.matches(&self.content)
  }
}

/// The atomic rollback unit: original contents of every file about to be
/// modified together. Never changed after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSet {
  id: String,
  created_at: u64,
  entries: Vec<SnapshotEntry>,
}

impl SnapshotSet {
  pub fn new(id: impl Into<String>, created_at: u64, entries: Vec<SnapshotEntry>) -> Self {
    Self {
      id: id.into(),
      created_at,
      entries,
    }
  }

  pub fn id(&self) -> &str {
    &self.id
  }

  pub fn created_at(&self) -> u64 {
    self.created_at
  }

  pub fn entries(&self) -> &[SnapshotEntry] {
    &self.entries
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn contains(&self, path: &Path) -> bool {
    self.entries.iter().any(|e| e.path == path)
  }

  pub fn to_metadata(&self) -> SnapshotMetadata {
    SnapshotMetadata {
      id: self.id.clone(),
      created_at: self.created_at,
      paths: self.entries.iter().map(|e| e.path.clone()).collect(),
    }
  }
}

/// Index entry describing a stored set without its file contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
  pub id: String,
  pub created_at: u64,
  pub paths: Vec<PathBuf>,
}

impl SnapshotMetadata {
  pub fn entry_count(&self) -> usize {
    self.paths.len()
  }
}

/// Listing of all stored sets, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotIndex {
  pub version: u32,
  pub snapshots: Vec<SnapshotMetadata>,
}

impl Default for SnapshotIndex {
  fn default() -> Self {
    Self::new()
  }
}

impl SnapshotIndex {
  pub fn new() -> Self {
    Self {
      version: SNAPSHOT_INDEX_VERSION,
      snapshots: Vec::new(),
    }
  }

  /// Add (or replace) an entry, keeping chronological order.
  pub fn add(&mut self, metadata: SnapshotMetadata) {
    self.snapshots.retain(|m| m.id != metadata.id);
    self.snapshots.push(metadata);
    self
      .snapshots
      .sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
  }

  pub fn remove(&mut self, id: &str) -> bool {
    let before = self.snapshots.len();
    self.snapshots.retain(|m| m.id != id);
    self.snapshots.len() != before
  }

  pub fn get(&self, id: &str) -> Option<&SnapshotMetadata> {
    self.snapshots.iter().find(|m| m.id == id)
  }

  pub fn latest(&self) -> Option<&SnapshotMetadata> {
    self.snapshots.last()
  }

  pub fn len(&self) -> usize {
    self.snapshots.len()
  }

  pub fn is_empty(&self) -> bool {
    self.snapshots.is_empty()
  }
}

/// Errors that can occur when capturing, storing or restoring snapshots.
#[derive(Debug, Error)]
pub enum SnapshotError {
  #[error("snapshot set not found: {0}")]
  NotFound(String),

  #[error("failed to create snapshot directory: {0}")]
  CreateDir(#[source] io::Error),

  #[error("failed to read snapshot: {0}")]
  Read(#[source] io::Error),

  #[error("failed to write snapshot: {0}")]
  Write(#[source] io::Error),

  #[error("failed to parse snapshot: {0}")]
  Parse(#[source] serde_json::Error),

  #[error("failed to serialize snapshot: {0}")]
  Serialize(#[source] serde_json::Error),

  #[error("unsupported snapshot index version {0}, expected {SNAPSHOT_INDEX_VERSION}")]
  UnsupportedVersion(u32),

  #[error("invalid snapshot id {0:?}")]
  InvalidId(String),

  /// A file that exists could not be captured.
  #[error("failed to capture {path}: {source}")]
  Capture {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// A captured file could not be written back.
  #[error("failed to restore {path}: {source}")]
  Restore {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// Stored bytes no longer match their recorded integrity.
  #[error("snapshot {id} is corrupt: content for {path} does not match its integrity record")]
  Corrupt { id: String, path: PathBuf },
}

static ID_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Generate a new snapshot id.
///
/// Ids are 16 lowercase hex characters: 12 of millisecond timestamp followed
/// by 4 of a process-wide sequence, so ids sort by creation time.
pub fn generate_snapshot_id() -> String {
  let millis = SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .unwrap_or_default()
    .as_millis() as u64;
  let seq = ID_SEQUENCE.fetch_add(1, Ordering::Relaxed);
  format!("{:012x}{:04x}", millis & 0xffff_ffff_ffff, seq & 0xffff)
}

/// Accepts only ids that are safe to use as file names.
pub fn is_valid_id(id: &str) -> bool {
  !id.is_empty() && id.len() <= 64 && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

mod base64_bytes {
  use base64::Engine;
  use base64::engine::general_purpose::STANDARD;
  use serde::{Deserialize, Deserializer, Serializer};

  pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(bytes))
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let encoded = String::deserialize(deserializer)?;
    STANDARD.decode(encoded).map_err(serde::de::Error::custom)
  }
}
