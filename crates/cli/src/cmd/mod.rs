mod apply;
mod diff;
mod doctor;
mod drift;
mod lock;
mod plan;
mod snapshot;

use std::path::PathBuf;

use anyhow::{Context, Result};
use preflight_lib::compile::Compiler;
use preflight_lib::lifecycle::LifecycleManager;
use preflight_lib::platform::paths::default_state_root;
use preflight_lib::{CancelToken, CoreConfig, Preflight};
use tokio::runtime::Runtime;

use crate::config::YamlLoader;
use crate::files::FilesCompiler;

pub use apply::cmd_apply;
pub use diff::cmd_diff;
pub use doctor::cmd_doctor;
pub use drift::{DriftCommand, cmd_drift};
pub use lock::{LockCommand, cmd_lock};
pub use plan::cmd_plan;
pub use snapshot::{SnapshotCommand, cmd_snapshot};

/// Everything a command needs from the global flags.
#[derive(Debug, Clone)]
pub struct Session {
  pub config_path: PathBuf,
  pub target: String,
  pub state_root: PathBuf,
  pub parallelism: Option<usize>,
  pub cancel: CancelToken,
}

impl Session {
  pub fn new(
    config_path: PathBuf,
    target: String,
    state_dir: Option<PathBuf>,
    parallelism: Option<usize>,
    cancel: CancelToken,
  ) -> Result<Self> {
    let state_root = match state_dir {
      Some(dir) => dir,
      None => default_state_root().context("Cannot determine state directory; set PREFLIGHT_HOME or --state-dir")?,
    };
    Ok(Self {
      config_path,
      target,
      state_root,
      parallelism,
      cancel,
    })
  }

  /// The engine with the YAML loader and the built-in providers.
  pub fn engine(&self) -> Preflight {
    let mut config = CoreConfig::new(&self.state_root);
    if let Some(parallelism) = self.parallelism {
      config = config.with_parallelism(parallelism);
    }
    Preflight::new(config, YamlLoader, Compiler::new().register(FilesCompiler))
  }

  /// Snapshot and drift state only; no configuration is read.
  pub fn lifecycle(&self) -> LifecycleManager {
    LifecycleManager::new(&self.state_root)
  }
}

pub fn runtime() -> Result<Runtime> {
  Runtime::new().context("Failed to create async runtime")
}
