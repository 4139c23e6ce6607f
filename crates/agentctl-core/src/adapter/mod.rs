//! Tool adapter layer
//!
//! Each supported AI tool gets a driver that translates the canonical
//! [`Server`] and [`Document`] shapes to and from that tool's native files.
//! Drivers declare the resource kinds they support and expose optional
//! capabilities through typed accessors:
//!
//! ```ignore
//! if let Some(servers) = adapter.as_servers() {
//!     let current = servers.read_servers()?;
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::config::Document;
use crate::config::documents::{
    load_markdown_dir, load_skill_dir, write_markdown_dir, write_skill_dir,
};
use crate::config::Server;
use crate::types::{ResourceKind, Transport};

pub mod claude_code;
pub mod claude_desktop;
pub mod codec;
pub mod codex;
pub mod cursor;
pub mod format;
pub mod gemini_cli;
pub mod managed_file;
pub mod opencode;
pub mod registry;
pub mod vscode;

pub use managed_file::ServersFile;
pub use registry::AdapterRegistry;

/// Directories adapters resolve their files against.
#[derive(Debug, Clone)]
pub struct AdapterContext {
    pub home_dir: PathBuf,
    /// Platform config directory (`~/.config`, `~/Library/Application Support`, ...).
    pub config_dir: PathBuf,
}

impl AdapterContext {
    pub fn new(home_dir: PathBuf, config_dir: PathBuf) -> Self {
        Self {
            home_dir,
            config_dir,
        }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        let home_dir =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
        let config_dir = dirs::config_dir().unwrap_or_else(|| home_dir.join(".config"));
        Ok(Self::new(home_dir, config_dir))
    }

    /// Base for document directories: the project dir when given, else home.
    pub fn doc_root<'a>(&'a self, workspace: Option<&'a Path>) -> &'a Path {
        workspace.unwrap_or(&self.home_dir)
    }
}

/// A per-tool driver.
pub trait Adapter: Send + Sync + std::fmt::Debug {
    /// Stable tool identifier, e.g. `claude-code`.
    fn name(&self) -> &'static str;

    /// Whether the tool appears to be installed for this user.
    fn detect(&self) -> bool;

    /// Global config file the tool reads servers from.
    fn config_path(&self) -> PathBuf;

    fn supported_resources(&self) -> BTreeSet<ResourceKind>;

    fn supports(&self, kind: ResourceKind) -> bool {
        self.supported_resources().contains(&kind)
    }

    fn supports_transport(&self, transport: Transport) -> bool {
        let _ = transport;
        true
    }

    fn as_servers(&self) -> Option<&dyn ServerAdapter> {
        None
    }

    fn as_workspace(&self) -> Option<&dyn WorkspaceAdapter> {
        None
    }

    fn as_commands(&self) -> Option<&dyn CommandsAdapter> {
        None
    }

    fn as_rules(&self) -> Option<&dyn RulesAdapter> {
        None
    }

    fn as_skills(&self) -> Option<&dyn SkillsAdapter> {
        None
    }
}

/// Read and write servers in the tool's global config.
pub trait ServerAdapter {
    fn read_servers(&self) -> anyhow::Result<Vec<Server>>;

    /// Replace the servers subtree with `servers`.
    ///
    /// Existing entries whose key is in `keep` are carried over unchanged;
    /// every other key of the file outside the subtree is preserved.
    fn write_servers(&self, servers: &[Server], keep: &BTreeSet<String>) -> anyhow::Result<()>;
}

/// Servers in a per-project config file.
pub trait WorkspaceAdapter {
    fn workspace_config_path(&self, dir: &Path) -> PathBuf;

    fn read_workspace_servers(&self, dir: &Path) -> anyhow::Result<Vec<Server>>;

    fn write_workspace_servers(
        &self,
        dir: &Path,
        servers: &[Server],
        keep: &BTreeSet<String>,
    ) -> anyhow::Result<()>;
}

/// Markdown slash commands, one file per command.
pub trait CommandsAdapter {
    fn commands_dir(&self, workspace: Option<&Path>) -> PathBuf;

    fn read_commands(&self, workspace: Option<&Path>) -> anyhow::Result<BTreeMap<String, Document>> {
        load_markdown_dir(&self.commands_dir(workspace), "md")
    }

    fn write_commands(
        &self,
        workspace: Option<&Path>,
        docs: &[Document],
        stale: &[String],
    ) -> anyhow::Result<()> {
        write_markdown_dir(&self.commands_dir(workspace), "md", docs, stale)
    }
}

/// Rule files, optionally in a tool-specific dialect.
pub trait RulesAdapter {
    fn rules_dir(&self, workspace: Option<&Path>) -> PathBuf;

    fn rule_extension(&self) -> &'static str {
        "md"
    }

    /// Translate a canonical rule into the tool's file content.
    fn encode_rule(&self, rule: &Document) -> Document {
        rule.clone()
    }

    fn read_rules(&self, workspace: Option<&Path>) -> anyhow::Result<BTreeMap<String, Document>> {
        load_markdown_dir(&self.rules_dir(workspace), self.rule_extension())
    }

    fn write_rules(
        &self,
        workspace: Option<&Path>,
        docs: &[Document],
        stale: &[String],
    ) -> anyhow::Result<()> {
        let encoded: Vec<Document> = docs.iter().map(|d| self.encode_rule(d)).collect();
        write_markdown_dir(
            &self.rules_dir(workspace),
            self.rule_extension(),
            &encoded,
            stale,
        )
    }
}

/// Skill directories containing a `SKILL.md`.
pub trait SkillsAdapter {
    fn skills_dir(&self, workspace: Option<&Path>) -> PathBuf;

    fn read_skills(&self, workspace: Option<&Path>) -> anyhow::Result<BTreeMap<String, Document>> {
        load_skill_dir(&self.skills_dir(workspace))
    }

    fn write_skills(
        &self,
        workspace: Option<&Path>,
        docs: &[Document],
        stale: &[String],
    ) -> anyhow::Result<()> {
        write_skill_dir(&self.skills_dir(workspace), docs, stale)
    }
}

/// Detection rule shared by the built-in drivers.
pub(crate) fn detect_paths(config_path: &Path, tool_home: &Path) -> bool {
    config_path.exists() || tool_home.is_dir()
}
