//! VS Code adapter.
//!
//! User servers in `<config_dir>/Code/User/mcp.json`, workspace servers in
//! `<project>/.vscode/mcp.json`, both under `servers` with an explicit
//! `type` on every entry.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use super::codec::{decode_typed, encode_typed};
use super::{Adapter, AdapterContext, ServerAdapter, ServersFile, WorkspaceAdapter, detect_paths};
use crate::config::Server;
use crate::types::ResourceKind;

#[derive(Debug, Clone)]
pub struct VsCodeAdapter {
    ctx: AdapterContext,
}

impl VsCodeAdapter {
    pub fn new(ctx: AdapterContext) -> Self {
        Self { ctx }
    }

    fn servers_file(&self, path: PathBuf) -> ServersFile {
        ServersFile::json(path, &["servers"], encode_typed, decode_typed).with_skeleton(skeleton)
    }
}

fn skeleton() -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("inputs".to_string(), Value::Array(Vec::new()));
    map
}

impl Adapter for VsCodeAdapter {
    fn name(&self) -> &'static str {
        "vscode"
    }

    fn detect(&self) -> bool {
        detect_paths(&self.config_path(), &self.ctx.config_dir.join("Code"))
    }

    fn config_path(&self) -> PathBuf {
        self.ctx
            .config_dir
            .join("Code")
            .join("User")
            .join("mcp.json")
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

impl ServerAdapter for VsCodeAdapter {
    fn read_servers(&self) -> anyhow::Result<Vec<Server>> {
        self.servers_file(self.config_path()).read_servers()
    }

    fn write_servers(&self, servers: &[Server], keep: &BTreeSet<String>) -> anyhow::Result<()> {
        self.servers_file(self.config_path())
            .write_servers(servers, keep)
    }
}

impl WorkspaceAdapter for VsCodeAdapter {
    fn workspace_config_path(&self, dir: &Path) -> PathBuf {
        dir.join(".vscode").join("mcp.json")
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
    use tempfile::TempDir;

    #[test]
    fn test_new_file_gets_skeleton_and_types() {
        let temp = TempDir::new().unwrap();
        let adapter = VsCodeAdapter::new(AdapterContext::new(
            temp.path().to_path_buf(),
            temp.path().join("cfg"),
        ));
        let project = temp.path().join("app");

        adapter
            .write_workspace_servers(
                &project,
                &[Server::stdio("fs", "node", vec!["s.js".to_string()])],
                &BTreeSet::new(),
            )
            .unwrap();

        let written: Value = serde_json::from_str(
            &std::fs::read_to_string(project.join(".vscode/mcp.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(written["inputs"], json!([]));
        assert_eq!(
            written["servers"]["fs"],
            json!({ "type": "stdio", "command": "node", "args": ["s.js"] })
        );
    }
}
