//! Claude Desktop adapter. stdio servers only, no workspace config.

use std::collections::BTreeSet;
use std::path::PathBuf;

use super::codec::{decode_plain, encode_plain};
use super::{Adapter, AdapterContext, ServerAdapter, ServersFile, detect_paths};
use crate::config::Server;
use crate::types::{ResourceKind, Transport};

#[derive(Debug, Clone)]
pub struct ClaudeDesktopAdapter {
    ctx: AdapterContext,
}

impl ClaudeDesktopAdapter {
    pub fn new(ctx: AdapterContext) -> Self {
        Self { ctx }
    }

    fn servers_file(&self) -> ServersFile {
        ServersFile::json(self.config_path(), &["mcpServers"], encode_plain, decode_plain)
    }
}

impl Adapter for ClaudeDesktopAdapter {
    fn name(&self) -> &'static str {
        "claude-desktop"
    }

    fn detect(&self) -> bool {
        detect_paths(&self.config_path(), &self.ctx.config_dir.join("Claude"))
    }

    fn config_path(&self) -> PathBuf {
        self.ctx
            .config_dir
            .join("Claude")
            .join("claude_desktop_config.json")
    }

    fn supported_resources(&self) -> BTreeSet<ResourceKind> {
        BTreeSet::from([ResourceKind::Servers])
    }

    fn supports_transport(&self, transport: Transport) -> bool {
        transport == Transport::Stdio
    }

    fn as_servers(&self) -> Option<&dyn ServerAdapter> {
        Some(self)
    }
}

impl ServerAdapter for ClaudeDesktopAdapter {
    fn read_servers(&self) -> anyhow::Result<Vec<Server>> {
        self.servers_file().read_servers()
    }

    fn write_servers(&self, servers: &[Server], keep: &BTreeSet<String>) -> anyhow::Result<()> {
        self.servers_file().write_servers(servers, keep)
    }
}
