//! Configuration management for local and global scopes
//!
//! - Global: `<config_dir>/agentctl/config.json` plus commands/rules/skills
//!   directories next to it
//! - Local: `.agentctl.json` at the project root plus `.agentctl/`

pub mod documents;
pub mod ledger;
pub mod merge;
pub mod parser;
pub mod paths;
pub mod schema;
pub mod store;

pub use documents::{Command, Document, Rule, Skill};
pub use ledger::{LedgerStore, ManagedLedger};
pub use merge::{active_servers, apply_profile, merge_configs, merge_servers};
pub use parser::{parse_config, parse_config_str, to_json};
pub use paths::{PROJECT_MARKER, find_project_root};
pub use schema::{AutoUpdate, BuildConfig, Config, Profile, Server, Settings, Source};
pub use store::ConfigStore;
