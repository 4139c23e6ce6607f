//! Gemini CLI adapter.
//!
//! `settings.json` holds servers under `mcpServers`. Streamable http uses
//! `httpUrl`; `url` means sse.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde_json::Value;

use super::codec::{decode_common, remote_entry, stdio_entry, string_field, string_map};
use super::{Adapter, AdapterContext, ServerAdapter, ServersFile, WorkspaceAdapter, detect_paths};
use crate::config::Server;
use crate::types::{ResourceKind, Transport};

#[derive(Debug, Clone)]
pub struct GeminiCliAdapter {
    ctx: AdapterContext,
}

impl GeminiCliAdapter {
    pub fn new(ctx: AdapterContext) -> Self {
        Self { ctx }
    }

    fn servers_file(&self, path: PathBuf) -> ServersFile {
        ServersFile::json(path, &["mcpServers"], encode, decode)
    }
}

fn encode(server: &Server) -> Value {
    Value::Object(match server.transport {
        Transport::Stdio => stdio_entry(server),
        Transport::Http => remote_entry(server, "httpUrl"),
        Transport::Sse => remote_entry(server, "url"),
    })
}

fn decode(name: &str, value: &Value) -> Server {
    match string_field(value, "httpUrl") {
        Some(url) => Server {
            name: name.to_string(),
            transport: Transport::Http,
            url: Some(url),
            headers: string_map(value, "headers"),
            ..Default::default()
        },
        None => {
            let mut server = decode_common(name, value, "url");
            if server.url.is_some() {
                server.transport = Transport::Sse;
            }
            server
        }
    }
}

impl Adapter for GeminiCliAdapter {
    fn name(&self) -> &'static str {
        "gemini-cli"
    }

    fn detect(&self) -> bool {
        detect_paths(&self.config_path(), &self.ctx.home_dir.join(".gemini"))
    }

    fn config_path(&self) -> PathBuf {
        self.ctx.home_dir.join(".gemini").join("settings.json")
    }

    fn supported_resources(&self) -> BTreeSet<ResourceKind> {
        BTreeSet::from([ResourceKind::Servers])
    }

    fn as_servers(&self) -> Option<&dyn ServerAdapter> {
        Some(self)
    }

    fn as_workspace(&self) -> Option<&dyn WorkspaceAdapter> {
        Some(self)
    }
}

impl ServerAdapter for GeminiCliAdapter {
    fn read_servers(&self) -> anyhow::Result<Vec<Server>> {
        self.servers_file(self.config_path()).read_servers()
    }

    fn write_servers(&self, servers: &[Server], keep: &BTreeSet<String>) -> anyhow::Result<()> {
        self.servers_file(self.config_path())
            .write_servers(servers, keep)
    }
}

impl WorkspaceAdapter for GeminiCliAdapter {
    fn workspace_config_path(&self, dir: &Path) -> PathBuf {
        dir.join(".gemini").join("settings.json")
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_http_uses_http_url() {
        let server = Server::http("docs", "https://d.example.com/mcp");
        let value = encode(&server);
        assert_eq!(value, json!({ "httpUrl": "https://d.example.com/mcp" }));
        assert_eq!(decode("docs", &value).transport, Transport::Http);
    }

    #[test]
    fn test_url_means_sse() {
        let value = json!({ "url": "https://d.example.com/events" });
        let server = decode("events", &value);
        assert_eq!(server.transport, Transport::Sse);
    }
}
