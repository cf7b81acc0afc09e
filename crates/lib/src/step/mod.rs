//! The unit of desired state.
//!
//! Provider compilers turn configuration into [`Step`]s. The core only ever
//! sees the capability set `{id, check, apply}` plus two optional
//! declarations: the files a step writes (so the executor can snapshot and
//! track them) and the packages it pins (so a lock update can record them).

mod id;
mod types;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use id::{StepId, StepIdError};
pub use types::{CheckResult, Diff, DiffKind, Status, StepError};

use crate::lock::{Lockfile, Resolution, ResolveError, Resolver, resolve_unlocked};
use crate::util::hash::Integrity;

/// One idempotent unit of desired-state enforcement.
///
/// `check` must only read system state. `apply` must converge it so that a
/// following `check` reports [`Status::Satisfied`].
pub trait Step: Send + Sync {
  fn id(&self) -> &StepId;

  fn check(&self, ctx: &StepContext) -> Result<CheckResult, StepError>;

  fn apply(&self, ctx: &StepContext) -> Result<(), StepError>;

  /// Files this step writes.
  fn managed_files(&self) -> Vec<ManagedFile> {
    Vec::new()
  }

  /// Packages this step installs, as concrete pins.
  fn packages(&self) -> Vec<PackagePin> {
    Vec::new()
  }
}

/// Shared handle to a compiled step.
pub type StepRef = Arc<dyn Step>;

impl fmt::Debug for dyn Step {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Step").field("id", self.id()).finish()
  }
}

/// A file a step writes, together with the configuration layer it comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedFile {
  pub path: PathBuf,
  pub source_layer: String,
}

impl ManagedFile {
  pub fn new(path: impl Into<PathBuf>, source_layer: impl Into<String>) -> Self {
    Self {
      path: path.into(),
      source_layer: source_layer.into(),
    }
  }
}

/// A concrete package version a step manages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagePin {
  pub provider: String,
  pub name: String,
  pub version: String,
  /// Integrity of the installed artifact, when the provider knows it.
  pub integrity: Option<Integrity>,
}

/// Read-only context handed to `check` and `apply`.
#[derive(Debug, Clone)]
pub struct StepContext {
  config_path: PathBuf,
  target: String,
  lockfile: Option<Arc<Lockfile>>,
}

impl StepContext {
  pub fn new(config_path: impl Into<PathBuf>, target: impl Into<String>) -> Self {
    Self {
      config_path: config_path.into(),
      target: target.into(),
      lockfile: None,
    }
  }

  pub fn with_lockfile(mut self, lockfile: Lockfile) -> Self {
    self.lockfile = Some(Arc::new(lockfile));
    self
  }

  pub fn config_path(&self) -> &Path {
    &self.config_path
  }

  pub fn target(&self) -> &str {
    &self.target
  }

  pub fn lockfile(&self) -> Option<&Lockfile> {
    self.lockfile.as_deref()
  }

  /// Resolve a package version against the loaded lockfile.
  ///
  /// Without a lockfile this behaves like intent mode.
  pub fn resolve(&self, provider: &str, name: &str, requested: Option<&str>) -> Result<Resolution, ResolveError> {
    match self.lockfile() {
      Some(lockfile) => Resolver::new(lockfile).resolve(provider, name, requested),
      None => Ok(resolve_unlocked(requested)),
    }
  }
}
