//! Content hashing and integrity records.
//!
//! This module provides:
//! - `ContentHash`: a full 64-character SHA-256 hex digest of some content
//! - `Integrity`: an `(algorithm, digest)` pair that renders as `sha256-<hex>`
//! - `hash_file()`: streaming single file hashing
//! - `hash_bytes()`: arbitrary byte hashing
//!
//! Both the lockfile (package integrity) and the drift detector (file content
//! hashes) are built on these.

use std::fmt;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Name of the only digest algorithm currently produced.
pub const SHA256: &str = "sha256";

/// A full 64-character SHA256 hash for content verification.
///
/// # Format
///
/// The hash is a lowercase hexadecimal string (64 characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl fmt::Display for ContentHash {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Errors produced while hashing content or parsing integrity strings.
#[derive(Debug, Error)]
pub enum HashError {
  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("malformed integrity string {0:?}, expected <algorithm>-<digest>")]
  MalformedIntegrity(String),
}

impl HashError {
  /// True when the hashed file does not exist.
  pub fn is_not_found(&self) -> bool {
    matches!(self, HashError::Read { source, .. } if source.kind() == io::ErrorKind::NotFound)
  }
}

/// Hash a file's contents.
///
/// Returns the full 64-character SHA256 hash of the file.
pub fn hash_file(path: &Path) -> Result<ContentHash, HashError> {
  let read_err = |source| HashError::Read {
    path: path.to_path_buf(),
    source,
  };

  let mut file = fs::File::open(path).map_err(read_err)?;
  let mut hasher = Sha256::new();
  let mut buffer = [0u8; 8192];

  loop {
    let bytes_read = file.read(&mut buffer).map_err(read_err)?;
    if bytes_read == 0 {
      break;
    }
    hasher.update(&buffer[..bytes_read]);
  }

  Ok(ContentHash(format!("{:x}", hasher.finalize())))
}

/// Hash arbitrary bytes.
///
/// Returns the full 64-character SHA256 hash.
pub fn hash_bytes(data: &[u8]) -> ContentHash {
  let mut hasher = Sha256::new();
  hasher.update(data);
  ContentHash(format!("{:x}", hasher.finalize()))
}

/// An integrity record over arbitrary content.
///
/// Serialized as a single string of the form `sha256-<hex digest>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Integrity {
  algorithm: String,
  digest: String,
}

impl Integrity {
  pub fn new(algorithm: impl Into<String>, digest: impl Into<String>) -> Self {
    Self {
      algorithm: algorithm.into(),
      digest: digest.into(),
    }
  }

  /// Integrity of an in-memory blob.
  pub fn of_bytes(data: &[u8]) -> Self {
    Self::new(SHA256, hash_bytes(data).0)
  }

  pub fn algorithm(&self) -> &str {
    &self.algorithm
  }

  pub fn digest(&self) -> &str {
    &self.digest
  }

  /// Returns true if `data` hashes to this record.
  ///
  /// Records using an algorithm other than sha256 never match.
  pub fn matches(&self, data: &[u8]) -> bool {
    self.algorithm == SHA256 && hash_bytes(data).0 == self.digest
  }
}

impl fmt::Display for Integrity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}-{}", self.algorithm, self.digest)
  }
}

impl FromStr for Integrity {
  type Err = HashError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.split_once('-') {
      Some((algorithm, digest))
        if !algorithm.is_empty() && !digest.is_empty() && digest.chars().all(|c| c.is_ascii_hexdigit()) =>
      {
        Ok(Self::new(algorithm, digest.to_ascii_lowercase()))
      }
      _ => Err(HashError::MalformedIntegrity(s.to_string())),
    }
  }
}

impl TryFrom<String> for Integrity {
  type Error = HashError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    value.parse()
  }
}

impl From<Integrity> for String {
  fn from(value: Integrity) -> Self {
    value.to_string()
  }
}
