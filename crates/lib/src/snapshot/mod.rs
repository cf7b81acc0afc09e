//! Snapshot-based rollback.
//!
//! A [`SnapshotSet`] holds the original bytes of every file about to be
//! modified together. Sets are append-only: they are written once, listed
//! through an index, and only ever read back by `restore`.

mod manager;
mod storage;
mod types;

pub use manager::SnapshotManager;
pub use storage::SnapshotStore;
pub use types::{
  SNAPSHOT_INDEX_VERSION, SnapshotEntry, SnapshotError, SnapshotIndex, SnapshotMetadata, SnapshotSet,
  generate_snapshot_id, is_valid_id,
};
