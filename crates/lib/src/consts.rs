//! Names shared across the crate.

pub const APP_NAME: &str = "preflight";

/// Directory under `$HOME` used when no state root is configured.
pub const STATE_DIR_NAME: &str = ".preflight";

/// Environment variable overriding the state root.
pub const STATE_ROOT_ENV: &str = "PREFLIGHT_HOME";

/// Drift state document within the state root.
pub const STATE_FILENAME: &str = "state.json";

/// Snapshot directory within the state root.
pub const SNAPSHOTS_DIR: &str = "snapshots";

/// Extension of the lockfile written beside a configuration file.
pub const LOCK_EXTENSION: &str = "lock";
