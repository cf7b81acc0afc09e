//! The reconciliation facade.
//!
//! [`Preflight`] wires the collaborators together: a configuration loader,
//! the provider compilers, the lock store, the host probe and the
//! snapshot/drift lifecycle. Every workflow the command line exposes is one
//! method here.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::cancel::CancelToken;
use crate::compile::{CompileError, Compiler, ConfigLoader};
use crate::consts::{SNAPSHOTS_DIR, STATE_FILENAME};
use crate::doctor::{DiffResult, DoctorReport, FixOutcome};
use crate::execute::{ApplyError, Executor, Plan, PlanError, Planner, StepResult, default_parallelism};
use crate::lifecycle::{LifecycleError, LifecycleManager};
use crate::lock::{FileLockStore, LockError, LockStore, Lockfile, Mode, PackageLock};
use crate::platform::{LocalProbe, SystemProbe};
use crate::step::{PackagePin, StepContext};
use crate::util::fs::unix_now;

/// Settings shared by every workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
  /// Root of persisted state (`state.json`, `snapshots/`).
  pub state_root: PathBuf,
  /// Maximum concurrent checks while planning.
  pub parallelism: usize,
}

impl CoreConfig {
  pub fn new(state_root: impl Into<PathBuf>) -> Self {
    Self {
      state_root: state_root.into(),
      parallelism: default_parallelism(),
    }
  }

  pub fn with_parallelism(mut self, parallelism: usize) -> Self {
    self.parallelism = parallelism.max(1);
    self
  }

  pub fn state_file(&self) -> PathBuf {
    self.state_root.join(STATE_FILENAME)
  }

  pub fn snapshots_dir(&self) -> PathBuf {
    self.state_root.join(SNAPSHOTS_DIR)
  }
}

#[derive(Debug, Error)]
pub enum EngineError {
  #[error(transparent)]
  Compile(#[from] CompileError),

  #[error(transparent)]
  Plan(#[from] PlanError),

  #[error(transparent)]
  Apply(#[from] ApplyError),

  #[error(transparent)]
  Lock(#[from] LockError),

  #[error(transparent)]
  Lifecycle(#[from] LifecycleError),

  #[error("no lock store configured")]
  NoLockStore,

  #[error("operation cancelled")]
  Cancelled,
}

/// The reconciliation core behind one set of collaborators.
pub struct Preflight {
  config: CoreConfig,
  loader: Box<dyn ConfigLoader>,
  compiler: Compiler,
  lock_store: Option<Box<dyn LockStore>>,
  probe: Box<dyn SystemProbe>,
  lifecycle: Option<LifecycleManager>,
}

impl Preflight {
  /// Defaults: lockfiles beside the configuration, host probing, and the
  /// snapshot/drift lifecycle under `config.state_root`.
  pub fn new(config: CoreConfig, loader: impl ConfigLoader + 'static, compiler: Compiler) -> Self {
    let lifecycle = LifecycleManager::new(&config.state_root);
    Self {
      config,
      loader: Box::new(loader),
      compiler,
      lock_store: Some(Box::new(FileLockStore)),
      probe: Box::new(LocalProbe),
      lifecycle: Some(lifecycle),
    }
  }

  pub fn with_lock_store(mut self, store: impl LockStore + 'static) -> Self {
    self.lock_store = Some(Box::new(store));
    self
  }

  pub fn without_lock_store(mut self) -> Self {
    self.lock_store = None;
    self
  }

  pub fn with_probe(mut self, probe: impl SystemProbe + 'static) -> Self {
    self.probe = Box::new(probe);
    self
  }

  pub fn with_lifecycle(mut self, lifecycle: LifecycleManager) -> Self {
    self.lifecycle = Some(lifecycle);
    self
  }

  pub fn without_lifecycle(mut self) -> Self {
    self.lifecycle = None;
    self
  }

  pub fn config(&self) -> &CoreConfig {
    &self.config
  }

  pub fn lifecycle(&self) -> Option<&LifecycleManager> {
    self.lifecycle.as_ref()
  }

  /// Step context for `(config_path, target)`, with the lockfile if one
  /// exists.
  pub fn context(&self, config_path: &Path, target: &str) -> Result<StepContext, EngineError> {
    let ctx = StepContext::new(config_path, target);
    let Some(store) = self.lock_store.as_deref() else {
      return Ok(ctx);
    };
    Ok(match store.load(config_path)? {
      Some(lockfile) => {
        debug!(mode = %lockfile.mode(), packages = lockfile.len(), "using lockfile");
        ctx.with_lockfile(lockfile)
      }
      None => ctx,
    })
  }

  pub async fn plan(&self, config_path: &Path, target: &str, cancel: &CancelToken) -> Result<Plan, EngineError> {
    let ctx = self.context(config_path, target)?;
    let planner = Planner::new(&self.compiler, self.loader.as_ref(), self.config.parallelism);
    Ok(planner.plan(ctx, cancel).await?)
  }

  pub async fn apply(&self, plan: &Plan, dry_run: bool, cancel: &CancelToken) -> Result<Vec<StepResult>, EngineError> {
    Ok(self.executor().apply(plan, dry_run, cancel).await?)
  }

  /// Plan and classify. Drifted tracked files are appended as warnings.
  pub async fn doctor(
    &self,
    config_path: &Path,
    target: &str,
    cancel: &CancelToken,
  ) -> Result<DoctorReport, EngineError> {
    let plan = self.plan(config_path, target, cancel).await?;
    let mut report = DoctorReport::from_plan(&plan);

    if let Some(lifecycle) = &self.lifecycle {
      let drifted = lifecycle.check_all(cancel)?;
      report.add_drift(&drifted);
    }

    info!(issues = report.issues.len(), checked = report.checked, "doctor complete");
    Ok(report)
  }

  /// Re-plan and apply to repair the report's fixable issues.
  ///
  /// A report with nothing fixable is a successful no-op.
  pub async fn fix(&self, report: &DoctorReport, cancel: &CancelToken) -> Result<FixOutcome, EngineError> {
    if report.fixable().next().is_none() {
      debug!("nothing to fix");
      return Ok(FixOutcome::default());
    }

    let plan = self.plan(&report.config_path, &report.target, cancel).await?;
    let results = self.apply(&plan, false, cancel).await?;
    let outcome = FixOutcome::from_results(report, results);

    info!(fixed = outcome.fixed.len(), "fix complete");
    Ok(outcome)
  }

  pub async fn diff(&self, config_path: &Path, target: &str, cancel: &CancelToken) -> Result<DiffResult, EngineError> {
    let plan = self.plan(config_path, target, cancel).await?;
    Ok(DiffResult::from_plan(&plan))
  }

  /// Load or create the lockfile and record every package the compiled
  /// steps of all targets declare.
  ///
  /// `mode` replaces the lockfile's mode before recording; without it the
  /// current mode is kept (intent for a new lockfile). A frozen lockfile
  /// only accepts pins it already holds.
  pub async fn lock_update(
    &self,
    config_path: &Path,
    mode: Option<Mode>,
    cancel: &CancelToken,
  ) -> Result<Lockfile, EngineError> {
    let store = self.lock_store.as_deref().ok_or(EngineError::NoLockStore)?;

    let mut lockfile = match store.load(config_path)? {
      Some(lockfile) => lockfile,
      None => Lockfile::new(Mode::Intent, self.probe.machine_info()),
    };
    if let Some(mode) = mode {
      lockfile.set_mode(mode);
    }
    lockfile.set_machine(self.probe.machine_info());

    let pins = self.collect_pins(config_path, cancel)?;
    let recorded_at = unix_now();
    let mut changed = 0;
    for pin in pins.into_values() {
      let lock = PackageLock::new(pin.provider, pin.name, pin.version, pin.integrity, recorded_at);
      if lockfile.record(lock)? {
        changed += 1;
      }
    }

    store.save(config_path, &lockfile)?;
    info!(mode = %lockfile.mode(), packages = lockfile.len(), changed, "lockfile updated");
    Ok(lockfile)
  }

  /// Switch an existing lockfile to frozen mode.
  pub fn lock_freeze(&self, config_path: &Path) -> Result<Lockfile, EngineError> {
    let store = self.lock_store.as_deref().ok_or(EngineError::NoLockStore)?;
    let mut lockfile = store
      .load(config_path)?
      .ok_or_else(|| LockError::NotFound(store.location(config_path)))?;

    lockfile.set_mode(Mode::Frozen);
    store.save(config_path, &lockfile)?;
    info!(packages = lockfile.len(), "lockfile frozen");
    Ok(lockfile)
  }

  /// The current lockfile, if any.
  pub fn lock_status(&self, config_path: &Path) -> Result<Option<Lockfile>, EngineError> {
    let store = self.lock_store.as_deref().ok_or(EngineError::NoLockStore)?;
    Ok(store.load(config_path)?)
  }

  fn executor(&self) -> Executor {
    match &self.lifecycle {
      Some(lifecycle) => Executor::new().with_lifecycle(lifecycle.clone()),
      None => Executor::new(),
    }
  }

  /// Package pins of every target, keyed by (provider, name). Later targets
  /// win when two declare the same package.
  fn collect_pins(
    &self,
    config_path: &Path,
    cancel: &CancelToken,
  ) -> Result<BTreeMap<(String, String), PackagePin>, EngineError> {
    let mut pins = BTreeMap::new();
    for target in self.loader.manifest(config_path)? {
      if cancel.is_cancelled() {
        return Err(EngineError::Cancelled);
      }
      for step in self.compiler.compile(self.loader.as_ref(), config_path, &target)? {
        for pin in step.packages() {
          pins.insert((pin.provider.clone(), pin.name.clone()), pin);
        }
      }
    }
    Ok(pins)
  }
}
