//! Resolution of the per-user state root.
//!
//! The library never consults these on its own: callers resolve the root
//! once and hand it to [`CoreConfig`](crate::engine::CoreConfig).

use std::path::PathBuf;

use crate::consts::{STATE_DIR_NAME, STATE_ROOT_ENV};

/// Returns the user's home directory, if one is configured.
#[cfg(windows)]
pub fn home_dir() -> Option<PathBuf> {
  std::env::var_os("USERPROFILE").filter(|v| !v.is_empty()).map(PathBuf::from)
}

/// Returns the user's home directory, if one is configured.
#[cfg(not(windows))]
pub fn home_dir() -> Option<PathBuf> {
  std::env::var_os("HOME").filter(|v| !v.is_empty()).map(PathBuf::from)
}

/// Default state root: `$PREFLIGHT_HOME`, else `~/.preflight`.
pub fn default_state_root() -> Option<PathBuf> {
  if let Some(root) = std::env::var_os(STATE_ROOT_ENV).filter(|v| !v.is_empty()) {
    return Some(PathBuf::from(root));
  }
  home_dir().map(|home| home.join(STATE_DIR_NAME))
}
