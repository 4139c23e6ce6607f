//! Claude Code adapter.
//!
//! Servers live in `~/.claude.json` under `mcpServers`, project servers in
//! `<project>/.mcp.json`. Commands and skills are plain directories under
//! `.claude/`.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use super::codec::{decode_typed, encode_typed};
use super::{
    Adapter, AdapterContext, CommandsAdapter, ServerAdapter, ServersFile, SkillsAdapter,
    WorkspaceAdapter, detect_paths,
};
use crate::config::Server;
use crate::types::ResourceKind;

const SERVERS_KEY: &[&str] = &["mcpServers"];

#[derive(Debug, Clone)]
pub struct ClaudeCodeAdapter {
    ctx: AdapterContext,
}

impl ClaudeCodeAdapter {
    pub fn new(ctx: AdapterContext) -> Self {
        Self { ctx }
    }

    fn servers_file(&self, path: PathBuf) -> ServersFile {
        ServersFile::json(path, SERVERS_KEY, encode_typed, decode_typed)
    }
}

impl Adapter for ClaudeCodeAdapter {
    fn name(&self) -> &'static str {
        "claude-code"
    }

    fn detect(&self) -> bool {
        detect_paths(&self.config_path(), &self.ctx.home_dir.join(".claude"))
    }

    fn config_path(&self) -> PathBuf {
        self.ctx.home_dir.join(".claude.json")
    }

    fn supported_resources(&self) -> BTreeSet<ResourceKind> {
        BTreeSet::from([
            ResourceKind::Servers,
            ResourceKind::Commands,
            ResourceKind::Skills,
        ])
    }

    fn as_servers(&self) -> Option<&dyn ServerAdapter> {
        Some(self)
    }

    fn as_workspace(&self) -> Option<&dyn WorkspaceAdapter> {
        Some(self)
    }

    fn as_commands(&self) -> Option<&dyn CommandsAdapter> {
        Some(self)
    }

    fn as_skills(&self) -> Option<&dyn SkillsAdapter> {
        Some(self)
    }
}

impl ServerAdapter for ClaudeCodeAdapter {
    fn read_servers(&self) -> anyhow::Result<Vec<Server>> {
        self.servers_file(self.config_path()).read_servers()
    }

    fn write_servers(&self, servers: &[Server], keep: &BTreeSet<String>) -> anyhow::Result<()> {
        self.servers_file(self.config_path())
            .write_servers(servers, keep)
    }
}

impl WorkspaceAdapter for ClaudeCodeAdapter {
    fn workspace_config_path(&self, dir: &Path) -> PathBuf {
        dir.join(".mcp.json")
    }

    fn read_workspace_servers(&self, dir: &Path) -> anyhow::Result<Vec<Server>> {
        self.servers_file(self.workspace_config_path(dir))
            .read_servers()
    }

    fn write_workspace_servers(
        &self,
        dir: &Path,
        servers: &[Server],
        keep: &BTreeSet<String>,
    ) -> anyhow::Result<()> {
        self.servers_file(self.workspace_config_path(dir))
            .write_servers(servers, keep)
    }
}

impl CommandsAdapter for ClaudeCodeAdapter {
    fn commands_dir(&self, workspace: Option<&Path>) -> PathBuf {
        self.ctx.doc_root(workspace).join(".claude").join("commands")
    }
}

impl SkillsAdapter for ClaudeCodeAdapter {
    fn skills_dir(&self, workspace: Option<&Path>) -> PathBuf {
        self.ctx.doc_root(workspace).join(".claude").join("skills")
    }
}
