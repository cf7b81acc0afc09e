//! From configuration to an ordered list of steps.
//!
//! Loading and merging configuration layers is the [`ConfigLoader`]'s job;
//! turning a merged document into steps is each provider's
//! [`StepCompiler`]. [`Compiler`] only validates the target, runs the
//! providers in registration order and rejects duplicate step ids.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::step::{StepId, StepRef};

/// A merged configuration document.
pub type Document = serde_json::Value;

#[derive(Debug, Error)]
pub enum CompileError {
  #[error("config file not found: {0}")]
  ConfigNotFound(PathBuf),

  #[error("failed to parse {path}: {message}")]
  Parse { path: PathBuf, message: String },

  #[error("unknown target '{target}' (available: {})", .available.join(", "))]
  UnknownTarget { target: String, available: Vec<String> },

  #[error("invalid target name {0:?}")]
  InvalidTarget(String),

  #[error("{provider}: {message}")]
  Provider { provider: String, message: String },

  #[error("step {0} is declared more than once")]
  DuplicateStep(StepId),
}

impl CompileError {
  pub fn provider(provider: &str, message: impl Into<String>) -> Self {
    Self::Provider {
      provider: provider.to_string(),
      message: message.into(),
    }
  }
}

/// Reads configuration for one target.
pub trait ConfigLoader: Send + Sync {
  /// The target's layers merged into one document.
  fn merged_config(&self, config_path: &Path, target: &str) -> Result<Document, CompileError>;

  /// Every target the configuration declares.
  fn manifest(&self, config_path: &Path) -> Result<Vec<String>, CompileError>;
}

/// Produces the steps of one provider.
pub trait StepCompiler: Send + Sync {
  fn provider(&self) -> &str;

  fn compile(&self, document: &Document) -> Result<Vec<StepRef>, CompileError>;
}

/// Runs the registered providers over a merged document.
#[derive(Default)]
pub struct Compiler {
  providers: Vec<Box<dyn StepCompiler>>,
}

impl Compiler {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a provider. Providers compile in registration order.
  pub fn register(mut self, provider: impl StepCompiler + 'static) -> Self {
    self.providers.push(Box::new(provider));
    self
  }

  pub fn providers(&self) -> impl Iterator<Item = &str> {
    self.providers.iter().map(|p| p.provider())
  }

  /// Load, validate and compile `target` into steps.
  pub fn compile(
    &self,
    loader: &dyn ConfigLoader,
    config_path: &Path,
    target: &str,
  ) -> Result<Vec<StepRef>, CompileError> {
    validate_target(target)?;

    let available = loader.manifest(config_path)?;
    if !available.iter().any(|t| t == target) {
      return Err(CompileError::UnknownTarget {
        target: target.to_string(),
        available,
      });
    }

    let document = loader.merged_config(config_path, target)?;
    self.compile_document(&document)
  }

  /// Compile an already merged document.
  pub fn compile_document(&self, document: &Document) -> Result<Vec<StepRef>, CompileError> {
    let mut seen = HashSet::new();
    let mut steps = Vec::new();

    for provider in &self.providers {
      let compiled = provider.compile(document)?;
      debug!(provider = provider.provider(), count = compiled.len(), "compiled steps");

      for step in compiled {
        if !seen.insert(step.id().clone()) {
          return Err(CompileError::DuplicateStep(step.id().clone()));
        }
        steps.push(step);
      }
    }

    Ok(steps)
  }
}

fn validate_target(target: &str) -> Result<(), CompileError> {
  let valid = !target.is_empty()
    && target
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
  if valid {
    Ok(())
  } else {
    Err(CompileError::InvalidTarget(target.to_string()))
  }
}
