//! Persistence of lockfiles keyed by configuration path.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::consts::LOCK_EXTENSION;

use super::types::{LockError, Lockfile};

/// Loads and saves the lockfile that belongs to a configuration file.
pub trait LockStore: Send + Sync {
  /// Where the lockfile for `config_path` lives.
  fn location(&self, config_path: &Path) -> PathBuf;

  /// Returns `Ok(None)` if no lockfile has been written yet.
  fn load(&self, config_path: &Path) -> Result<Option<Lockfile>, LockError>;

  fn save(&self, config_path: &Path, lockfile: &Lockfile) -> Result<(), LockError>;
}

/// Stores `<config-stem>.lock` beside the configuration file.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLockStore;

impl LockStore for FileLockStore {
  fn location(&self, config_path: &Path) -> PathBuf {
    lockfile_path(config_path)
  }

  fn load(&self, config_path: &Path) -> Result<Option<Lockfile>, LockError> {
    Lockfile::load(&self.location(config_path))
  }

  fn save(&self, config_path: &Path, lockfile: &Lockfile) -> Result<(), LockError> {
    let path = self.location(config_path);
    lockfile.save(&path)?;
    info!(
      path = %path.display(),
      mode = %lockfile.mode(),
      packages = lockfile.len(),
      "lockfile saved"
    );
    Ok(())
  }
}

/// `~/dotfiles/preflight.yaml` -> `~/dotfiles/preflight.lock`.
pub fn lockfile_path(config_path: &Path) -> PathBuf {
  config_path.with_extension(LOCK_EXTENSION)
}
