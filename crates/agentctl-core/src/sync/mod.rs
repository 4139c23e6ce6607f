//! Reconciliation engine.
//!
//! Computes, per adapter target, which entries to add, overwrite, keep or
//! remove, and writes the result while honoring the managed ledger.

pub mod diff;
pub mod engine;

pub use diff::{Diff, compute_diff};
pub use engine::{SkippedTool, SyncEngine, SyncOptions, SyncReport, TargetKind, TargetResult};
