//! Validated step identifiers.
//!
//! A step id has the form `<provider>:<action>[:<qualifier>...]`, for example
//! `brew:install:git` or `files:write:/home/me/.zshrc`. The provider and action
//! segments are restricted to `[A-Za-z0-9_.-]`; qualifiers may contain anything
//! (including further `:` characters) but must not be empty.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced when parsing a [`StepId`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepIdError {
  #[error("step id is empty")]
  Empty,

  #[error("step id {0:?} is missing a ':' separator")]
  MissingSeparator(String),

  #[error("step id {0:?} has an empty provider")]
  MissingProvider(String),

  #[error("step id {0:?} has an empty action")]
  MissingAction(String),

  #[error("step id {id:?} has an invalid {segment} segment {value:?}")]
  InvalidSegment {
    id: String,
    segment: &'static str,
    value: String,
  },

  #[error("step id {0:?} has an empty qualifier")]
  EmptyQualifier(String),
}

/// An opaque, validated step identifier.
///
/// Ordering and equality are those of the canonical string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StepId(String);

impl StepId {
  /// Parse and validate a step id.
  pub fn parse(raw: &str) -> Result<Self, StepIdError> {
    if raw.is_empty() {
      return Err(StepIdError::Empty);
    }

    let mut parts = raw.split(':');
    let provider = parts.next().unwrap_or_default();
    let Some(action) = parts.next() else {
      return Err(StepIdError::MissingSeparator(raw.to_string()));
    };

    if provider.is_empty() {
      return Err(StepIdError::MissingProvider(raw.to_string()));
    }
    if action.is_empty() {
      return Err(StepIdError::MissingAction(raw.to_string()));
    }
    check_segment(raw, "provider", provider)?;
    check_segment(raw, "action", action)?;

    // Anything after `provider:action:` is the qualifier tail.
    let head_len = provider.len() + 1 + action.len();
    if raw.len() > head_len && raw[head_len + 1..].is_empty() {
      return Err(StepIdError::EmptyQualifier(raw.to_string()));
    }

    Ok(Self(raw.to_string()))
  }

  /// Build an id from its parts.
  pub fn from_parts(provider: &str, action: &str, qualifiers: &[&str]) -> Result<Self, StepIdError> {
    let mut raw = format!("{provider}:{action}");
    for qualifier in qualifiers {
      raw.push(':');
      raw.push_str(qualifier);
    }
    Self::parse(&raw)
  }

  pub fn provider(&self) -> &str {
    self.0.split(':').next().unwrap_or_default()
  }

  pub fn action(&self) -> &str {
    self.0.split(':').nth(1).unwrap_or_default()
  }

  /// Everything after `provider:action:`, if present.
  pub fn qualifier(&self) -> Option<&str> {
    let head_len = self.provider().len() + 1 + self.action().len();
    self.0.get(head_len + 1..).filter(|q| !q.is_empty())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

fn check_segment(raw: &str, segment: &'static str, value: &str) -> Result<(), StepIdError> {
  let valid = value
    .chars()
    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
  if valid {
    Ok(())
  } else {
    Err(StepIdError::InvalidSegment {
      id: raw.to_string(),
      segment,
      value: value.to_string(),
    })
  }
}

impl fmt::Display for StepId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl FromStr for StepId {
  type Err = StepIdError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::parse(s)
  }
}

impl TryFrom<String> for StepId {
  type Error = StepIdError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    Self::parse(&value)
  }
}

impl From<StepId> for String {
  fn from(value: StepId) -> Self {
    value.0
  }
}
