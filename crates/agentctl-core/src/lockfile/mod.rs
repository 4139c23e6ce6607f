//! Lockfile for installed servers.

pub mod staleness;
pub mod store;
pub mod types;

pub use store::{LOCKFILE_NAME, LockfileStore};
pub use types::{Integrity, LockedEntry, Lockfile};
