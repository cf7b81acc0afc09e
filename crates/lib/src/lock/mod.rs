//! Package version locking.
//!
//! - [`Lockfile`]: mode, machine info and package pins
//! - [`LockStore`]: persistence keyed by configuration path
//! - [`Resolver`]: version lookups honoring the lockfile's mode

mod resolve;
mod store;
mod types;

pub use resolve::{LATEST, Resolution, ResolutionSource, ResolveError, Resolver, resolve_unlocked};
pub use store::{FileLockStore, LockStore, lockfile_path};
pub use types::{LOCK_VERSION, LockError, Lockfile, Mode, PackageLock};
