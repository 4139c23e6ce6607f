//! OpenCode adapter.
//!
//! Servers live under `mcp` with `type: local|remote`, the command and its
//! arguments in one array, `environment` instead of `env`, and an `enabled`
//! flag.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use super::codec::{
    insert_map, string_field, string_map, transport_for_url,
};
use super::{Adapter, AdapterContext, ServerAdapter, ServersFile, WorkspaceAdapter, detect_paths};
use crate::config::Server;
use crate::types::{ResourceKind, Transport};

const SCHEMA_URL: &str = "https://opencode.ai/config.json";

#[derive(Debug, Clone)]
pub struct OpenCodeAdapter {
    ctx: AdapterContext,
}

impl OpenCodeAdapter {
    pub fn new(ctx: AdapterContext) -> Self {
        Self { ctx }
    }

    fn servers_file(&self, path: PathBuf) -> ServersFile {
        ServersFile::json(path, &["mcp"], encode, decode).with_skeleton(skeleton)
    }
}

fn skeleton() -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("$schema".to_string(), Value::String(SCHEMA_URL.to_string()));
    map
}

fn encode(server: &Server) -> Value {
    let mut entry = Map::new();
    match server.transport {
        Transport::Stdio => {
            entry.insert("type".to_string(), Value::from("local"));
            let command: Vec<String> = server
                .command
                .iter()
                .cloned()
                .chain(server.args.iter().cloned())
                .collect();
            entry.insert("command".to_string(), Value::from(command));
            insert_map(&mut entry, "environment", &server.env);
        }
        Transport::Http | Transport::Sse => {
            entry.insert("type".to_string(), Value::from("remote"));
            entry.insert(
                "url".to_string(),
                Value::String(server.url.clone().unwrap_or_default()),
            );
            insert_map(&mut entry, "headers", &server.headers);
        }
    }
    entry.insert("enabled".to_string(), Value::Bool(server.is_enabled()));
    Value::Object(entry)
}

fn decode(name: &str, value: &Value) -> Server {
    let mut server = Server {
        name: name.to_string(),
        disabled: value.get("enabled").and_then(Value::as_bool) == Some(false),
        ..Default::default()
    };
    let remote = value.get("type").and_then(Value::as_str) == Some("remote");
    match string_field(value, "url") {
        Some(url) if remote || value.get("command").is_none() => {
            server.transport = transport_for_url(&url);
            server.url = Some(url);
            server.headers = string_map(value, "headers");
        }
        _ => {
            let mut parts = match value.get("command") {
                Some(Value::Array(items)) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect::<Vec<_>>()
                    .into_iter(),
                Some(Value::String(cmd)) => vec![cmd.clone()].into_iter(),
                _ => Vec::new().into_iter(),
            };
            server.command = parts.next();
            server.args = parts.collect();
            server.env = string_map(value, "environment");
        }
    }
    server
}

impl Adapter for OpenCodeAdapter {
    fn name(&self) -> &'static str {
        "opencode"
    }

    fn detect(&self) -> bool {
        detect_paths(
            &self.config_path(),
            &self.ctx.home_dir.join(".config").join("opencode"),
        )
    }

    fn config_path(&self) -> PathBuf {
        self.ctx
            .home_dir
            .join(".config")
            .join("opencode")
            .join("opencode.json")
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

impl ServerAdapter for OpenCodeAdapter {
    fn read_servers(&self) -> anyhow::Result<Vec<Server>> {
        self.servers_file(self.config_path()).read_servers()
    }

    fn write_servers(&self, servers: &[Server], keep: &BTreeSet<String>) -> anyhow::Result<()> {
        self.servers_file(self.config_path())
            .write_servers(servers, keep)
    }
}

impl WorkspaceAdapter for OpenCodeAdapter {
    fn workspace_config_path(&self, dir: &Path) -> PathBuf {
        dir.join("opencode.json")
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
