//! Test utilities for preflight-lib.
//!
//! Scripted in-memory steps and collaborators, so workflow tests never touch
//! a real package manager.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::Value;

use crate::compile::{CompileError, ConfigLoader, Document, StepCompiler};
use crate::step::{CheckResult, Diff, ManagedFile, PackagePin, Step, StepContext, StepError, StepId, StepRef};
use crate::util::hash::Integrity;

/// How a [`FakeStep`] behaves when checked or applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Script {
  /// Needs apply until applied once, then satisfied.
  Converge,
  /// Always satisfied.
  Satisfied,
  /// Always skipped.
  Skipped,
  /// `check` positively reports failure.
  CheckFails(String),
  /// `check` cannot determine status.
  CheckErrors(String),
  /// Needs apply; every apply fails.
  ApplyFails(String),
}

/// A step whose behaviour is scripted and whose applies are counted.
#[derive(Debug)]
pub struct FakeStep {
  id: StepId,
  script: Script,
  applied: AtomicUsize,
  checks: AtomicUsize,
  packages: Vec<PackagePin>,
}

impl FakeStep {
  pub fn new(id: &str, script: Script) -> Arc<Self> {
    Arc::new(Self::build(id, script, Vec::new()))
  }

  /// A converging step that pins one package.
  pub fn package(provider: &str, name: &str, version: &str) -> Arc<Self> {
    let id = format!("{provider}:install:{name}");
    let pin = PackagePin {
      provider: provider.to_string(),
      name: name.to_string(),
      version: version.to_string(),
      integrity: Some(Integrity::of_bytes(format!("{name}-{version}").as_bytes())),
    };
    Arc::new(Self::build(&id, Script::Converge, vec![pin]))
  }

  fn build(id: &str, script: Script, packages: Vec<PackagePin>) -> Self {
    Self {
      id: StepId::parse(id).unwrap(),
      script,
      applied: AtomicUsize::new(0),
      checks: AtomicUsize::new(0),
      packages,
    }
  }

  pub fn apply_count(&self) -> usize {
    self.applied.load(Ordering::SeqCst)
  }

  pub fn check_count(&self) -> usize {
    self.checks.load(Ordering::SeqCst)
  }
}

impl Step for FakeStep {
  fn id(&self) -> &StepId {
    &self.id
  }

  fn check(&self, _ctx: &StepContext) -> Result<CheckResult, StepError> {
    self.checks.fetch_add(1, Ordering::SeqCst);
    match &self.script {
      Script::Converge if self.apply_count() > 0 => Ok(CheckResult::satisfied()),
      Script::Converge | Script::ApplyFails(_) => Ok(CheckResult::needs_apply(Diff::added(self.id.as_str()))),
      Script::Satisfied => Ok(CheckResult::satisfied()),
      Script::Skipped => Ok(CheckResult::skipped()),
      Script::CheckFails(msg) => Err(StepError::CheckFailed(msg.clone())),
      Script::CheckErrors(msg) => Err(StepError::Other(msg.clone())),
    }
  }

  fn apply(&self, _ctx: &StepContext) -> Result<(), StepError> {
    if let Script::ApplyFails(msg) = &self.script {
      return Err(StepError::Other(msg.clone()));
    }
    self.applied.fetch_add(1, Ordering::SeqCst);
    Ok(())
  }

  fn packages(&self) -> Vec<PackagePin> {
    self.packages.clone()
  }
}

/// Writes fixed content to one file.
#[derive(Debug)]
pub struct FileStep {
  id: StepId,
  path: PathBuf,
  content: String,
  layer: String,
}

impl FileStep {
  pub fn new(path: &Path, content: &str, layer: &str) -> Arc<Self> {
    Arc::new(Self {
      id: StepId::from_parts("files", "write", &[&path.display().to_string()]).unwrap(),
      path: path.to_path_buf(),
      content: content.to_string(),
      layer: layer.to_string(),
    })
  }
}

impl Step for FileStep {
  fn id(&self) -> &StepId {
    &self.id
  }

  fn check(&self, _ctx: &StepContext) -> Result<CheckResult, StepError> {
    let subject = self.path.display().to_string();
    match fs::read_to_string(&self.path) {
      Ok(current) if current == self.content => Ok(CheckResult::satisfied()),
      Ok(current) => Ok(CheckResult::needs_apply(Diff::modified(subject, current, &self.content))),
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

/// Loader serving one fixed document for a fixed set of targets.
#[derive(Debug, Clone)]
pub struct StaticLoader {
  targets: Vec<String>,
  document: Document,
  missing: bool,
}

impl StaticLoader {
  pub fn new(targets: &[&str]) -> Self {
    Self {
      targets: targets.iter().map(|t| t.to_string()).collect(),
      document: Value::Null,
      missing: false,
    }
  }

  /// A loader for a configuration file that does not exist.
  pub fn missing() -> Self {
    Self {
      missing: true,
      ..Self::new(&[])
    }
  }

  pub fn with_document(mut self, document: Document) -> Self {
    self.document = document;
    self
  }
}

impl ConfigLoader for StaticLoader {
  fn merged_config(&self, config_path: &Path, _target: &str) -> Result<Document, CompileError> {
    if self.missing {
      return Err(CompileError::ConfigNotFound(config_path.to_path_buf()));
    }
    Ok(self.document.clone())
  }

  fn manifest(&self, config_path: &Path) -> Result<Vec<String>, CompileError> {
    if self.missing {
      return Err(CompileError::ConfigNotFound(config_path.to_path_buf()));
    }
    Ok(self.targets.clone())
  }
}

/// Compiler returning the same steps regardless of the document.
pub struct StaticCompiler {
  provider: String,
  steps: Vec<StepRef>,
}

impl StaticCompiler {
  pub fn new(provider: &str, steps: Vec<StepRef>) -> Self {
    Self {
      provider: provider.to_string(),
      steps,
    }
  }
}

impl StepCompiler for StaticCompiler {
  fn provider(&self) -> &str {
    &self.provider
  }

  fn compile(&self, _document: &Document) -> Result<Vec<StepRef>, CompileError> {
    Ok(self.steps.clone())
  }
}

/// Shorthand for erasing a concrete step.
pub fn step_ref<S: Step + 'static>(step: &Arc<S>) -> StepRef {
  step.clone()
}
