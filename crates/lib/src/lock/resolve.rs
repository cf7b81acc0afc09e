//! Version resolution against a lockfile.
//!
//! Resolution is a pure read of the in-memory [`Lockfile`]; callers load and
//! save it around the call.
//!
//! | Mode   | Pinned                  | Unpinned                   |
//! |--------|-------------------------|----------------------------|
//! | Intent | latest (pin ignored)    | latest                     |
//! | Locked | pinned, `locked = true` | `ResolveError::Unpinned`   |
//! | Frozen | pinned, `locked = true` | `ResolveError::Frozen`     |

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::types::{Lockfile, Mode};

/// Version marker meaning "whatever the provider currently ships".
pub const LATEST: &str = "latest";

/// Where a resolved version came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionSource {
  Lockfile,
  Latest,
  Requested,
}

/// The resolver's answer for one package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
  pub version: String,
  pub source: ResolutionSource,
  pub locked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
  /// Locked mode and no pin exists: the caller must decide what to install.
  #[error("{provider}:{name} is not pinned in the lockfile; run `lock update` to pin it")]
  Unpinned { provider: String, name: String },

  /// Frozen mode refuses to introduce a new package.
  #[error("{provider}:{name} is not pinned and the lockfile is frozen")]
  Frozen { provider: String, name: String },
}

/// Resolves package versions honoring a lockfile's mode.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
  lockfile: &'a Lockfile,
}

impl<'a> Resolver<'a> {
  pub fn new(lockfile: &'a Lockfile) -> Self {
    Self { lockfile }
  }

  pub fn resolve(&self, provider: &str, name: &str, requested: Option<&str>) -> Result<Resolution, ResolveError> {
    let mode = self.lockfile.mode();
    if mode == Mode::Intent {
      return Ok(Resolution {
        version: LATEST.to_string(),
        source: ResolutionSource::Latest,
        locked: false,
      });
    }

    match self.lockfile.get(provider, name) {
      Some(pin) => {
        if let Some(requested) = requested.filter(|r| is_concrete(r))
          && requested != pin.version()
        {
          debug!(
            provider,
            name,
            requested,
            pinned = pin.version(),
            "lockfile pin overrides requested version"
          );
        }
        Ok(Resolution {
          version: pin.version().to_string(),
          source: ResolutionSource::Lockfile,
          locked: true,
        })
      }
      None if mode == Mode::Frozen => Err(ResolveError::Frozen {
        provider: provider.to_string(),
        name: name.to_string(),
      }),
      None => Err(ResolveError::Unpinned {
        provider: provider.to_string(),
        name: name.to_string(),
      }),
    }
  }
}

/// Resolution without any lockfile: an explicit version wins, otherwise latest.
pub fn resolve_unlocked(requested: Option<&str>) -> Resolution {
  match requested.filter(|r| is_concrete(r)) {
    Some(version) => Resolution {
      version: version.to_string(),
      source: ResolutionSource::Requested,
      locked: false,
    },
    None => Resolution {
      version: LATEST.to_string(),
      source: ResolutionSource::Latest,
      locked: false,
    },
  }
}

fn is_concrete(version: &str) -> bool {
  !version.is_empty() && version != LATEST
}
