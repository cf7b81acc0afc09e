//! preflight-lib: the reconciliation core of preflight
//!
//! This crate turns declarative machine configuration into checked steps and
//! converges the host towards them:
//! - `Step`: one idempotent unit of desired state with `check`/`apply`
//! - `Plan`: every compiled step with its current status, in order
//! - `Lockfile`: package pins under an intent/locked/frozen mode
//! - `Drift`: tampering with files preflight wrote
//! - `Snapshot`: original file contents for rollback

pub mod cancel;
pub mod compile;
pub mod consts;
pub mod doctor;
pub mod drift;
pub mod engine;
pub mod execute;
pub mod lifecycle;
pub mod lock;
pub mod platform;
pub mod snapshot;
pub mod step;
pub mod util;

pub use cancel::CancelToken;
pub use engine::{CoreConfig, EngineError, Preflight};
