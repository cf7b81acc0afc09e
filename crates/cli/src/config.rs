//! YAML configuration files.
//!
//! A configuration declares named layers and, per target, the ordered list of
//! layers it is built from:
//!
//! ```yaml
//! targets:
//!   default: [base, work]
//! layers:
//!   base:
//!     files:
//!       - path: ~/.gitconfig
//!         content: "[user]\n  name = me\n"
//!   work:
//!     files: []
//! ```
//!
//! Merging walks the target's layers in order: later scalars win, mappings
//! merge key by key and sequences concatenate. Each `files` entry that does
//! not name a `layer` is stamped with the layer that declared it.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use preflight_lib::compile::{CompileError, ConfigLoader, Document};
use serde::Deserialize;
use serde_yaml::Value as YamlValue;
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
  #[serde(default)]
  targets: BTreeMap<String, Vec<String>>,
  #[serde(default)]
  layers: BTreeMap<String, YamlValue>,
}

/// Loads `targets:`/`layers:` YAML configuration from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlLoader;

impl YamlLoader {
  fn load(&self, config_path: &Path) -> Result<ConfigFile, CompileError> {
    let content = match fs::read_to_string(config_path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        return Err(CompileError::ConfigNotFound(config_path.to_path_buf()));
      }
      Err(e) => return Err(parse_error(config_path, e)),
    };

    // An empty file declares nothing.
    if content.trim().is_empty() {
      return Ok(ConfigFile::default());
    }

    serde_yaml::from_str(&content).map_err(|e| parse_error(config_path, e))
  }
}

impl ConfigLoader for YamlLoader {
  fn merged_config(&self, config_path: &Path, target: &str) -> Result<Document, CompileError> {
    let config = self.load(config_path)?;
    let Some(layer_names) = config.targets.get(target) else {
      return Err(CompileError::UnknownTarget {
        target: target.to_string(),
        available: config.targets.keys().cloned().collect(),
      });
    };

    let mut merged = YamlValue::Mapping(serde_yaml::Mapping::new());
    for name in layer_names {
      let layer = config.layers.get(name).ok_or_else(|| CompileError::Parse {
        path: config_path.to_path_buf(),
        message: format!("target '{target}' references unknown layer '{name}'"),
      })?;
      if layer.is_null() {
        continue;
      }
      if !layer.is_mapping() {
        return Err(CompileError::Parse {
          path: config_path.to_path_buf(),
          message: format!("layer '{name}' must be a mapping"),
        });
      }
      debug!(target = %target, layer = %name, "merging layer");
      let mut layer = layer.clone();
      stamp_file_layer(&mut layer, name);
      merge(&mut merged, layer);
    }

    serde_json::to_value(&merged).map_err(|e| parse_error(config_path, e))
  }

  fn manifest(&self, config_path: &Path) -> Result<Vec<String>, CompileError> {
    Ok(self.load(config_path)?.targets.into_keys().collect())
  }
}

/// Record `name` as the origin of every `files` entry that lacks one.
fn stamp_file_layer(layer: &mut YamlValue, name: &str) {
  let Some(YamlValue::Sequence(entries)) = layer.get_mut("files") else {
    return;
  };
  for entry in entries {
    if let YamlValue::Mapping(entry) = entry
      && !entry.contains_key("layer")
    {
      entry.insert("layer".into(), name.into());
    }
  }
}

/// Deep-merge `overlay` into `base`.
fn merge(base: &mut YamlValue, overlay: YamlValue) {
  match (base, overlay) {
    (YamlValue::Mapping(base), YamlValue::Mapping(overlay)) => {
      for (key, value) in overlay {
        match base.get_mut(&key) {
          Some(existing) => merge(existing, value),
          None => {
            base.insert(key, value);
          }
        }
      }
    }
    (YamlValue::Sequence(base), YamlValue::Sequence(overlay)) => base.extend(overlay),
    (base, overlay) => *base = overlay,
  }
}

fn parse_error(path: &Path, error: impl std::fmt::Display) -> CompileError {
  CompileError::Parse {
    path: path.to_path_buf(),
    message: error.to_string(),
  }
}
