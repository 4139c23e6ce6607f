//! agentctl core library
//!
//! Keeps MCP server definitions, commands, rules and skills consistent
//! across AI coding tools, with local and global configuration scopes,
//! a source build pipeline, a lockfile and a background update checker.

pub mod adapter;
pub mod builder;
pub mod config;
pub mod context;
#[cfg(unix)]
pub mod daemon;
pub mod fs;
pub mod lockfile;
pub mod source;
pub mod sync;
pub mod types;
pub mod updates;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{
        AutoUpdate, BuildConfig, Command, Config, ConfigStore, Document, Profile, Rule, Server,
        Settings, Skill, Source,
    };
    pub use crate::types::{ConfigError, ResourceKind, Scope, SourceType, Transport};

    // Adapters
    pub use crate::adapter::{Adapter, AdapterContext, AdapterRegistry};

    // Sync
    pub use crate::sync::{Diff, SyncEngine, SyncOptions, SyncReport};

    // Build and lock
    pub use crate::builder::{BuildState, Builder, ResolvedCommand};
    pub use crate::lockfile::{LockedEntry, LockfileStore};
    pub use crate::source::{AddTarget, parse_add_target};
    pub use crate::updates::UpdateHint;

    pub use crate::context::AppContext;
}
