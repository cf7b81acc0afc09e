//! Shared fixtures for library integration tests.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use preflight_lib::compile::{CompileError, Compiler, ConfigLoader, Document, StepCompiler};
use preflight_lib::platform::{MachineInfo, SystemProbe};
use preflight_lib::step::{
  CheckResult, Diff, ManagedFile, PackagePin, Step, StepContext, StepError, StepId, StepRef,
};
use preflight_lib::{CoreConfig, Preflight};
use tempfile::TempDir;

/// A dotfile with fixed desired content.
pub struct Dotfile {
  id: StepId,
  path: PathBuf,
  content: String,
  layer: String,
}

impl Dotfile {
  pub fn new(path: &Path, content: &str, layer: &str) -> StepRef {
    Arc::new(Self {
      id: StepId::from_parts("files", "write", &[&path.display().to_string()]).unwrap(),
      path: path.to_path_buf(),
      content: content.to_string(),
      layer: layer.to_string(),
    })
  }
}

impl Step for Dotfile {
  fn id(&self) -> &StepId {
    &self.id
  }

  fn check(&self, _ctx: &StepContext) -> Result<CheckResult, StepError> {
    let subject = self.path.display().to_string();
    match fs::read_to_string(&self.path) {
      Ok(current) if current == self.content => Ok(CheckResult::satisfied()),
      Ok(_) => Ok(CheckResult::needs_apply(Diff::modified(subject, "changed", "desired"))),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(CheckResult::needs_apply(Diff::added(subject))),
      Err(e) => Err(e.into()),
    }
  }

  fn apply(&self, _ctx: &StepContext) -> Result<(), StepError> {
    if let Some(parent) = self.path.parent() {
      fs::create_dir_all(parent)?;
    }
    fs::write(&self.path, &self.content)?;
    Ok(())
  }

  fn managed_files(&self) -> Vec<ManagedFile> {
    vec![ManagedFile::new(&self.path, &self.layer)]
  }
}

/// A package install that resolves its version through the lockfile.
pub struct Package {
  id: StepId,
  name: String,
  version: String,
  fail_apply: bool,
  installs: AtomicUsize,
}

impl Package {
  pub fn new(name: &str, version: &str) -> Arc<Self> {
    Self::build(name, version, false)
  }

  pub fn broken(name: &str) -> Arc<Self> {
    Self::build(name, "0.0.0", true)
  }

  fn build(name: &str, version: &str, fail_apply: bool) -> Arc<Self> {
    Arc::new(Self {
      id: StepId::from_parts("brew", "install", &[name]).unwrap(),
      name: name.to_string(),
      version: version.to_string(),
      fail_apply,
      installs: AtomicUsize::new(0),
    })
  }

  pub fn installs(&self) -> usize {
    self.installs.load(Ordering::SeqCst)
  }
}

impl Step for Package {
  fn id(&self) -> &StepId {
    &self.id
  }

  fn check(&self, ctx: &StepContext) -> Result<CheckResult, StepError> {
    let resolution = ctx.resolve("brew", &self.name, Some(&self.version))?;
    if self.installs() > 0 {
      return Ok(CheckResult::satisfied());
    }
    Ok(CheckResult::needs_apply(
      Diff::added(&self.name).with_desired(resolution.version),
    ))
  }

  fn apply(&self, _ctx: &StepContext) -> Result<(), StepError> {
    if self.fail_apply {
      return Err(StepError::Other(format!("brew install {} exited with status 1", self.name)));
    }
    self.installs.fetch_add(1, Ordering::SeqCst);
    Ok(())
  }

  fn packages(&self) -> Vec<PackagePin> {
    vec![PackagePin {
      provider: "brew".to_string(),
      name: self.name.clone(),
      version: self.version.clone(),
      integrity: None,
    }]
  }
}

pub struct Loader;

impl ConfigLoader for Loader {
  fn merged_config(&self, _config_path: &Path, _target: &str) -> Result<Document, CompileError> {
    Ok(Document::Null)
  }

  fn manifest(&self, config_path: &Path) -> Result<Vec<String>, CompileError> {
    if !config_path.exists() {
      return Err(CompileError::ConfigNotFound(config_path.to_path_buf()));
    }
    Ok(vec!["default".to_string()])
  }
}

pub struct Steps(pub Vec<StepRef>);

impl StepCompiler for Steps {
  fn provider(&self) -> &str {
    "test"
  }

  fn compile(&self, _document: &Document) -> Result<Vec<StepRef>, CompileError> {
    Ok(self.0.clone())
  }
}

pub struct TestProbe;

impl SystemProbe for TestProbe {
  fn machine_info(&self) -> MachineInfo {
    MachineInfo {
      os: "linux".to_string(),
      arch: "aarch64".to_string(),
      hostname: "ci".to_string(),
    }
  }
}

/// Isolated engine over a temp directory.
pub struct TestEnv {
  pub temp: TempDir,
  pub config_path: PathBuf,
}

impl TestEnv {
  pub fn new() -> Self {
    let temp = TempDir::new().unwrap();
    let config_path = temp.path().join("preflight.yaml");
    fs::write(&config_path, "targets: {default: []}\n").unwrap();
    Self { temp, config_path }
  }

  pub fn home(&self, relative: &str) -> PathBuf {
    self.temp.path().join("home").join(relative)
  }

  pub fn state_root(&self) -> PathBuf {
    self.temp.path().join("state")
  }

  pub fn engine(&self, steps: Vec<StepRef>) -> Preflight {
    Preflight::new(
      CoreConfig::new(self.state_root()).with_parallelism(4),
      Loader,
      Compiler::new().register(Steps(steps)),
    )
    .with_probe(TestProbe)
  }
}
