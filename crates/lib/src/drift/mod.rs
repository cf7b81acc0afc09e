//! Drift detection: has anything changed a file since preflight wrote it?

mod detect;
mod state;

pub use detect::{Drift, DriftDetector, DriftKind};
pub use state::{DriftError, DriftState, FileState, STATE_VERSION, StateStore};
