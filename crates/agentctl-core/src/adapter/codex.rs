//! Codex adapter.
//!
//! Codex keeps servers in `~/.codex/config.toml` as `[mcp_servers.<name>]`
//! tables and only launches stdio servers.

use std::collections::BTreeSet;
use std::path::PathBuf;

use super::codec::{decode_plain, encode_plain};
use super::format::FileFormat;
use super::{Adapter, AdapterContext, ServerAdapter, ServersFile, detect_paths};
use crate::config::Server;
use crate::types::{ResourceKind, Transport};

#[derive(Debug, Clone)]
pub struct CodexAdapter {
    ctx: AdapterContext,
}

impl CodexAdapter {
    pub fn new(ctx: AdapterContext) -> Self {
        Self { ctx }
    }

    fn servers_file(&self) -> ServersFile {
        ServersFile::json(self.config_path(), &["mcp_servers"], encode_plain, decode_plain)
            .with_format(FileFormat::Toml)
    }
}

impl Adapter for CodexAdapter {
    fn name(&self) -> &'static str {
        "codex"
    }

    fn detect(&self) -> bool {
        detect_paths(&self.config_path(), &self.ctx.home_dir.join(".codex"))
    }

    fn config_path(&self) -> PathBuf {
        self.ctx.home_dir.join(".codex").join("config.toml")
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

impl ServerAdapter for CodexAdapter {
    fn read_servers(&self) -> anyhow::Result<Vec<Server>> {
        self.servers_file().read_servers()
    }

    fn write_servers(&self, servers: &[Server], keep: &BTreeSet<String>) -> anyhow::Result<()> {
        self.servers_file().write_servers(servers, keep)
    }
}
