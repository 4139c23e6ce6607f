//! Cursor adapter.
//!
//! Servers in `~/.cursor/mcp.json` and `<project>/.cursor/mcp.json`, rules
//! as `.mdc` files, commands as markdown.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use super::codec::{decode_plain, encode_plain};
use super::{
    Adapter, AdapterContext, CommandsAdapter, RulesAdapter, ServerAdapter, ServersFile,
    WorkspaceAdapter, detect_paths,
};
use crate::config::{Document, Server};
use crate::types::ResourceKind;

#[derive(Debug, Clone)]
pub struct CursorAdapter {
    ctx: AdapterContext,
}

impl CursorAdapter {
    pub fn new(ctx: AdapterContext) -> Self {
        Self { ctx }
    }

    fn servers_file(&self, path: PathBuf) -> ServersFile {
        ServersFile::json(path, &["mcpServers"], encode_plain, decode_plain)
    }
}

impl Adapter for CursorAdapter {
    fn name(&self) -> &'static str {
        "cursor"
    }

    fn detect(&self) -> bool {
        detect_paths(&self.config_path(), &self.ctx.home_dir.join(".cursor"))
    }

    fn config_path(&self) -> PathBuf {
        self.ctx.home_dir.join(".cursor").join("mcp.json")
    }

    fn supported_resources(&self) -> BTreeSet<ResourceKind> {
        BTreeSet::from([
            ResourceKind::Servers,
            ResourceKind::Commands,
            ResourceKind::Rules,
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

    fn as_rules(&self) -> Option<&dyn RulesAdapter> {
        Some(self)
    }
}

impl ServerAdapter for CursorAdapter {
    fn read_servers(&self) -> anyhow::Result<Vec<Server>> {
        self.servers_file(self.config_path()).read_servers()
    }

    fn write_servers(&self, servers: &[Server], keep: &BTreeSet<String>) -> anyhow::Result<()> {
        self.servers_file(self.config_path())
            .write_servers(servers, keep)
    }
}

impl WorkspaceAdapter for CursorAdapter {
    fn workspace_config_path(&self, dir: &Path) -> PathBuf {
        dir.join(".cursor").join("mcp.json")
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

impl CommandsAdapter for CursorAdapter {
    fn commands_dir(&self, workspace: Option<&Path>) -> PathBuf {
        self.ctx.doc_root(workspace).join(".cursor").join("commands")
    }
}

impl RulesAdapter for CursorAdapter {
    fn rules_dir(&self, workspace: Option<&Path>) -> PathBuf {
        self.ctx.doc_root(workspace).join(".cursor").join("rules")
    }

    fn rule_extension(&self) -> &'static str {
        "mdc"
    }

    /// Cursor reads `description`, `globs` and `alwaysApply` from the header.
    fn encode_rule(&self, rule: &Document) -> Document {
        let mut content = String::from("---\n");
        content.push_str(&format!(
            "description: {}\n",
            rule.description.as_deref().unwrap_or_default()
        ));
        content.push_str(&format!("globs: {}\n", rule.globs.join(",")));
        content.push_str(&format!("alwaysApply: {}\n", rule.globs.is_empty()));
        content.push_str("---\n");
        content.push_str(rule.body());

        Document {
            content,
            ..rule.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn adapter(temp: &TempDir) -> CursorAdapter {
        CursorAdapter::new(AdapterContext::new(
            temp.path().to_path_buf(),
            temp.path().join(".config"),
        ))
    }

    #[test]
    fn test_rules_written_as_mdc() {
        let temp = TempDir::new().unwrap();
        let adapter = adapter(&temp);
        let rule = Document::parse(
            "rust",
            "---\ndescription: Rust style\nglobs: [\"*.rs\"]\n---\nUse anyhow.\n",
        )
        .unwrap();

        adapter.write_rules(None, &[rule], &[]).unwrap();

        let path = temp.path().join(".cursor/rules/rust.mdc");
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("globs: *.rs"));
        assert!(content.contains("alwaysApply: false"));
        assert!(content.ends_with("Use anyhow.\n"));

        let read = adapter.read_rules(None).unwrap();
        assert_eq!(read["rust"].description.as_deref(), Some("Rust style"));
        assert_eq!(read["rust"].globs, vec!["*.rs"]);
    }

    #[test]
    fn test_workspace_path() {
        let temp = TempDir::new().unwrap();
        let adapter = adapter(&temp);
        assert_eq!(
            adapter.workspace_config_path(Path::new("/w/app")),
            PathBuf::from("/w/app/.cursor/mcp.json")
        );
    }
}
