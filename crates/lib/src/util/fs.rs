//! Small filesystem helpers shared by the persisted stores.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Write `contents` to `path` atomically.
///
/// The bytes are written to a `.tmp` sibling first and then renamed over the
/// destination, so readers never observe a half-written document. Parent
/// directories are created as needed.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
  if let Some(parent) = path.parent()
    && !parent.as_os_str().is_empty()
  {
    fs::create_dir_all(parent)?;
  }

  let temp_path = tmp_sibling(path);
  fs::write(&temp_path, contents)?;
  if let Err(e) = fs::rename(&temp_path, path) {
    let _ = fs::remove_file(&temp_path);
    return Err(e);
  }
  Ok(())
}

fn tmp_sibling(path: &Path) -> PathBuf {
  let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
  name.push(".tmp");
  path.with_file_name(name)
}

/// Current time as seconds since the Unix epoch.
pub fn unix_now() -> u64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .unwrap_or_default()
    .as_secs()
}

/// Make `path` absolute against the current directory without touching the
/// filesystem. Symlinks are deliberately left unresolved.
pub fn absolute(path: &Path) -> PathBuf {
  std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
