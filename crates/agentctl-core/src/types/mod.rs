//! Shared core types used across configuration, adapter and lockfile layers.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Configuration scope levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Project scope, resolved from the nearest `.agentctl.json` marker.
    Local,
    /// User scope, stored in the user config directory.
    #[default]
    Global,
    /// Read-only union of local and global. Never a write target.
    All,
}

impl Scope {
    /// Parse a user-supplied scope string.
    ///
    /// Accepts `local`/`project`, `global`/`user` and `all`/empty.
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        match input.trim().to_ascii_lowercase().as_str() {
            "local" | "project" => Ok(Scope::Local),
            "global" | "user" => Ok(Scope::Global),
            "all" | "" => Ok(Scope::All),
            _ => Err(ConfigError::InvalidScope(input.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Local => "local",
            Scope::Global => "global",
            Scope::All => "all",
        }
    }

    /// Whether an item stamped with `item` is visible when filtering by `self`.
    pub fn includes(self, item: Scope) -> bool {
        self == Scope::All || self == item
    }

    /// Reject `All` for operations that need a single concrete file.
    pub fn concrete(self) -> Result<Self, ConfigError> {
        match self {
            Scope::All => Err(ConfigError::AllScopeWrite),
            other => Ok(other),
        }
    }
}

impl FromStr for Scope {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scope::parse(s)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// MCP transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    #[default]
    Stdio,
    Http,
    Sse,
}

impl Transport {
    pub fn as_str(self) -> &'static str {
        match self {
            Transport::Stdio => "stdio",
            Transport::Http => "http",
            Transport::Sse => "sse",
        }
    }

    pub fn is_remote(self) -> bool {
        matches!(self, Transport::Http | Transport::Sse)
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a server's implementation is acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// A path on disk, used in place.
    Local,
    /// A git repository cloned into the install directory.
    Git,
    /// A key resolved through the alias table to a git repository.
    Alias,
    /// A hosted http/sse endpoint.
    Remote,
    /// Command managed entirely by the user.
    #[default]
    Manual,
}

impl SourceType {
    /// Whether this source is acquired through a VCS checkout.
    pub fn is_vcs(self) -> bool {
        matches!(self, SourceType::Git | SourceType::Alias)
    }
}

/// Resource kinds an adapter may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Servers,
    Commands,
    Rules,
    Skills,
}

impl ResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Servers => "servers",
            ResourceKind::Commands => "commands",
            ResourceKind::Rules => "rules",
            ResourceKind::Skills => "skills",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration errors that fail a whole operation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid scope '{0}': expected local, project, global, user or all")]
    InvalidScope(String),

    #[error("no project found: no .agentctl.json in {} or any parent directory", .start.display())]
    NoProject { start: PathBuf },

    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error("unknown profile '{0}'")]
    UnknownProfile(String),

    #[error("scope 'all' is read-only; choose local or global")]
    AllScopeWrite,
}
