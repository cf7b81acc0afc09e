//! The `files` provider: whole-file content under configuration control.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use preflight_lib::compile::{CompileError, Document, StepCompiler};
use preflight_lib::platform::paths::home_dir;
use preflight_lib::step::{CheckResult, Diff, ManagedFile, Step, StepContext, StepError, StepId, StepRef};
use preflight_lib::util::hash::hash_bytes;
use serde::Deserialize;
use tracing::debug;

use crate::output::truncate_hash;

pub const PROVIDER: &str = "files";

/// Layer reported for entries that do not name one.
const DEFAULT_LAYER: &str = "config";

#[derive(Debug, Deserialize)]
struct FileSpec {
  path: String,
  content: String,
  #[serde(default)]
  layer: Option<String>,
}

/// Writes a file with exactly the configured content.
#[derive(Debug)]
pub struct WriteFile {
  id: StepId,
  path: PathBuf,
  content: String,
  layer: String,
}

impl WriteFile {
  pub fn new(path: PathBuf, content: String, layer: String) -> Result<Self, CompileError> {
    let id = StepId::from_parts(PROVIDER, "write", &[&path.display().to_string()])
      .map_err(|e| CompileError::provider(PROVIDER, e.to_string()))?;
    Ok(Self { id, path, content, layer })
  }
}

impl Step for WriteFile {
  fn id(&self) -> &StepId {
    &self.id
  }

  fn check(&self, _ctx: &StepContext) -> Result<CheckResult, StepError> {
    let subject = self.path.display().to_string();
    let desired = hash_bytes(self.content.as_bytes());

    match fs::read(&self.path) {
      Ok(current) => {
        let current = hash_bytes(&current);
        if current == desired {
          Ok(CheckResult::satisfied())
        } else {
          Ok(CheckResult::needs_apply(Diff::modified(
            subject,
            truncate_hash(&current.0),
            truncate_hash(&desired.0),
          )))
        }
      }
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(CheckResult::needs_apply(Diff::added(subject))),
      Err(e) => Err(e.into()),
    }
  }

  fn apply(&self, _ctx: &StepContext) -> Result<(), StepError> {
    if let Some(parent) = self.path.parent() {
      fs::create_dir_all(parent)?;
    }
    fs::write(&self.path, &self.content)?;
    debug!(path = %self.path.display(), bytes = self.content.len(), "file written");
    Ok(())
  }

  fn managed_files(&self) -> Vec<ManagedFile> {
    vec![ManagedFile::new(&self.path, &self.layer)]
  }
}

/// Compiles the `files:` list of a merged document.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilesCompiler;

impl StepCompiler for FilesCompiler {
  fn provider(&self) -> &str {
    PROVIDER
  }

  fn compile(&self, document: &Document) -> Result<Vec<StepRef>, CompileError> {
    let Some(entries) = document.get("files") else {
      return Ok(Vec::new());
    };
    if entries.is_null() {
      return Ok(Vec::new());
    }

    let specs: Vec<FileSpec> = serde_json::from_value(entries.clone())
      .map_err(|e| CompileError::provider(PROVIDER, format!("invalid `files` entry: {e}")))?;

    // A later entry for the same path overrides the earlier one in place.
    let mut steps: Vec<WriteFile> = Vec::with_capacity(specs.len());
    let mut positions: HashMap<PathBuf, usize> = HashMap::new();
    for spec in specs {
      if spec.path.trim().is_empty() {
        return Err(CompileError::provider(PROVIDER, "file path must not be empty"));
      }
      let step = WriteFile::new(
        expand_home(&spec.path),
        spec.content,
        spec.layer.unwrap_or_else(|| DEFAULT_LAYER.to_string()),
      )?;
      match positions.get(&step.path) {
        Some(&index) => {
          debug!(path = %step.path.display(), from = %steps[index].layer, to = %step.layer, "file overridden");
          steps[index] = step;
        }
        None => {
          positions.insert(step.path.clone(), steps.len());
          steps.push(step);
        }
      }
    }

    Ok(steps.into_iter().map(|step| Arc::new(step) as StepRef).collect())
  }
}

/// Expand a leading `~/` to the home directory.
fn expand_home(raw: &str) -> PathBuf {
  if let Some(rest) = raw.strip_prefix("~/")
    && let Some(home) = home_dir()
  {
    return home.join(rest);
  }
  if raw == "~"
    && let Some(home) = home_dir()
  {
    return home;
  }
  PathBuf::from(raw)
}
