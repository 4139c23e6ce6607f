//! Config store for loading and saving scoped configuration.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use super::documents::{
    Document, load_markdown_dir, load_skill_dir, write_markdown_dir, write_skill_dir,
};
use super::merge::{active_servers, merge_configs};
use super::paths::{
    COMMANDS_DIR, PROJECT_MARKER, RULES_DIR, SKILLS_DIR, config_path_for_scope,
    find_project_root, require_project_root, resource_root_for_scope,
};
use super::schema::{Config, Server};
use super::parser;
use crate::fs::write_atomic;
use crate::types::{ConfigError, ResourceKind, Scope};

#[derive(Debug, Clone)]
pub struct ConfigStore {
    global_dir: PathBuf,
    working_dir: PathBuf,
}

impl ConfigStore {
    pub fn from_env() -> anyhow::Result<Self> {
        let global_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
            .join("agentctl");
        let working_dir = std::env::current_dir().context("Failed to read working directory")?;

        Ok(Self::from_paths(global_dir, working_dir))
    }

    pub fn from_paths(global_dir: PathBuf, working_dir: PathBuf) -> Self {
        Self {
            global_dir,
            working_dir,
        }
    }

    pub fn global_dir(&self) -> &Path {
        &self.global_dir
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Nearest project root above the working directory, if any.
    pub fn project_root(&self) -> Option<PathBuf> {
        find_project_root(&self.working_dir)
    }

    /// Config file for a concrete scope. Local scope requires a project.
    pub fn config_path(&self, scope: Scope) -> anyhow::Result<PathBuf> {
        let scope = scope.concrete()?;
        let project_root = self.project_root_for(scope)?;
        Ok(config_path_for_scope(scope, &self.global_dir, &project_root))
    }

    /// Resource root (commands/rules/skills) for a concrete scope.
    pub fn resource_root(&self, scope: Scope) -> anyhow::Result<PathBuf> {
        let scope = scope.concrete()?;
        let project_root = self.project_root_for(scope)?;
        Ok(resource_root_for_scope(scope, &self.global_dir, &project_root))
    }

    fn project_root_for(&self, scope: Scope) -> Result<PathBuf, ConfigError> {
        match scope {
            Scope::Local => require_project_root(&self.working_dir),
            Scope::Global | Scope::All => Ok(self.working_dir.clone()),
        }
    }

    /// Load the global config.
    pub fn load(&self) -> anyhow::Result<Config> {
        self.load_scoped(Scope::Global)
    }

    /// Load one concrete scope. Missing files load as an empty config.
    pub fn load_scoped(&self, scope: Scope) -> anyhow::Result<Config> {
        let config_path = self.config_path(scope)?;
        let mut config = if config_path.exists() {
            parser::parse_config(&config_path)?
        } else {
            Config::new()
        };

        let root = self.resource_root(scope)?;
        config.commands = load_markdown_dir(&root.join(COMMANDS_DIR), "md")?;
        config.rules = load_markdown_dir(&root.join(RULES_DIR), "md")?;
        config.skills = load_skill_dir(&root.join(SKILLS_DIR))?;
        config.stamp(scope);

        debug!(
            scope = %scope,
            path = %config_path.display(),
            servers = config.servers.len(),
            "Loaded config"
        );
        Ok(config)
    }

    /// Effective view: global merged with the project config when one exists.
    pub fn load_with_project(&self) -> anyhow::Result<Config> {
        let global = self.load_scoped(Scope::Global)?;
        if self.project_root().is_none() {
            return Ok(global);
        }
        let local = self.load_scoped(Scope::Local)?;
        Ok(merge_configs(global, local))
    }

    /// Save the global config.
    pub fn save(&self, config: &Config) -> anyhow::Result<()> {
        self.save_scoped(Scope::Global, config)
    }

    pub fn save_scoped(&self, scope: Scope, config: &Config) -> anyhow::Result<()> {
        let config_path = self.config_path(scope)?;
        let content = parser::to_json(config)?;
        write_atomic(&config_path, content.as_bytes()).with_context(|| {
            format!("Failed to write config file: {}", config_path.display())
        })?;
        debug!(scope = %scope, path = %config_path.display(), "Saved config");
        Ok(())
    }

    /// Create an empty project marker in `dir`. Existing markers are kept.
    pub fn init_project(&self, dir: &Path) -> anyhow::Result<PathBuf> {
        let marker = dir.join(PROJECT_MARKER);
        if !marker.exists() {
            let content = parser::to_json(&Config::new())?;
            write_atomic(&marker, content.as_bytes())
                .with_context(|| format!("Failed to create project marker: {}", marker.display()))?;
        }
        Ok(marker)
    }

    /// Add a server to one scope. Duplicates are rejected unless `force`.
    pub fn add_server(&self, scope: Scope, server: Server, force: bool) -> anyhow::Result<()> {
        let scope = scope.concrete()?;
        server
            .validate()
            .with_context(|| format!("Invalid server configuration: '{}'", server.name))?;

        let mut config = self.load_scoped(scope)?;
        if config.servers.contains_key(&server.name) && !force {
            anyhow::bail!(
                "Server '{}' already exists in {} scope (use force to replace)",
                server.name,
                scope
            );
        }
        config.insert_server(server);
        self.save_scoped(scope, &config)
    }

    /// Remove a server from one scope, returning the removed entry.
    pub fn remove_server(&self, scope: Scope, name: &str) -> anyhow::Result<Server> {
        let scope = scope.concrete()?;
        let mut config = self.load_scoped(scope)?;
        let removed = config
            .servers
            .remove(name)
            .ok_or_else(|| anyhow::anyhow!("Server '{}' not found in {} scope", name, scope))?;
        self.save_scoped(scope, &config)?;
        Ok(removed)
    }

    /// Write a markdown document into one scope's resource root.
    pub fn add_document(
        &self,
        scope: Scope,
        kind: ResourceKind,
        doc: &Document,
    ) -> anyhow::Result<()> {
        let root = self.resource_root(scope)?;
        let docs = std::slice::from_ref(doc);
        match kind {
            ResourceKind::Commands => write_markdown_dir(&root.join(COMMANDS_DIR), "md", docs, &[]),
            ResourceKind::Rules => write_markdown_dir(&root.join(RULES_DIR), "md", docs, &[]),
            ResourceKind::Skills => write_skill_dir(&root.join(SKILLS_DIR), docs, &[]),
            ResourceKind::Servers => anyhow::bail!("Servers are not markdown documents"),
        }
    }

    /// Delete a markdown document from one scope's resource root.
    pub fn remove_document(
        &self,
        scope: Scope,
        kind: ResourceKind,
        name: &str,
    ) -> anyhow::Result<()> {
        let root = self.resource_root(scope)?;
        let stale = [name.to_string()];
        match kind {
            ResourceKind::Commands => write_markdown_dir(&root.join(COMMANDS_DIR), "md", &[], &stale),
            ResourceKind::Rules => write_markdown_dir(&root.join(RULES_DIR), "md", &[], &stale),
            ResourceKind::Skills => write_skill_dir(&root.join(SKILLS_DIR), &[], &stale),
            ResourceKind::Servers => anyhow::bail!("Servers are not markdown documents"),
        }
    }

    /// Effective servers visible from `scope`, sorted by name.
    pub fn servers_for_scope(&self, scope: Scope) -> anyhow::Result<Vec<Server>> {
        let config = self.load_with_project()?;
        Ok(config
            .servers
            .into_values()
            .filter(|s| scope.includes(s.scope))
            .collect())
    }

    pub fn commands_for_scope(&self, scope: Scope) -> anyhow::Result<Vec<Document>> {
        let config = self.load_with_project()?;
        Ok(filter_docs(config.commands.into_values(), scope))
    }

    pub fn rules_for_scope(&self, scope: Scope) -> anyhow::Result<Vec<Document>> {
        let config = self.load_with_project()?;
        Ok(filter_docs(config.rules.into_values(), scope))
    }

    pub fn skills_for_scope(&self, scope: Scope) -> anyhow::Result<Vec<Document>> {
        let config = self.load_with_project()?;
        Ok(filter_docs(config.skills.into_values(), scope))
    }

    /// Enabled servers of the effective view with a profile applied.
    ///
    /// Without an explicit profile, `settings.default_profile` is used.
    pub fn active_servers(&self, profile: Option<&str>) -> anyhow::Result<Vec<Server>> {
        let config = self.load_with_project()?;
        Ok(active_servers(&config, profile)?)
    }

    /// Validate the effective view.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.load_with_project()?.validate()
    }
}

fn filter_docs(docs: impl Iterator<Item = Document>, scope: Scope) -> Vec<Document> {
    docs.filter(|d| scope.includes(d.scope)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Source;
    use tempfile::TempDir;

    fn store(temp: &TempDir) -> ConfigStore {
        let work = temp.path().join("work");
        std::fs::create_dir_all(&work).unwrap();
        ConfigStore::from_paths(temp.path().join("global"), work)
    }

    #[test]
    fn test_load_missing_is_empty() {
        let temp = TempDir::new().unwrap();
        let config = store(&temp).load().unwrap();
        assert!(config.servers.is_empty());
    }

    #[test]
    fn test_local_scope_requires_project() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let err = store.load_scoped(Scope::Local).unwrap_err();
        assert!(err.downcast_ref::<ConfigError>().is_some());
        assert!(!store.working_dir().join(PROJECT_MARKER).exists());
    }

    #[test]
    fn test_all_scope_is_not_writable() {
        let temp = TempDir::new().unwrap();
        let err = store(&temp).save_scoped(Scope::All, &Config::new()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::AllScopeWrite)
        ));
    }

    #[test]
    fn test_add_server_rejects_duplicates() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let server = Server::stdio("fs", "node", vec!["index.js".to_string()]);

        store.add_server(Scope::Global, server.clone(), false).unwrap();
        assert!(store.add_server(Scope::Global, server.clone(), false).is_err());
        store.add_server(Scope::Global, server, true).unwrap();

        let removed = store.remove_server(Scope::Global, "fs").unwrap();
        assert_eq!(removed.command.as_deref(), Some("node"));
        assert!(store.remove_server(Scope::Global, "fs").is_err());
    }

    #[test]
    fn test_local_override_and_scope_filter() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        store.init_project(store.working_dir()).unwrap();

        store
            .add_server(Scope::Global, Server::stdio("a", "node", vec![]), false)
            .unwrap();
        store
            .add_server(
                Scope::Local,
                Server::stdio("b", "x", vec![]).with_source(Source::local("./b")),
                false,
            )
            .unwrap();

        let local = store.servers_for_scope(Scope::Local).unwrap();
        assert_eq!(local.len(), 1);
        assert_eq!(local[0].name, "b");
        assert_eq!(store.servers_for_scope(Scope::All).unwrap().len(), 2);
    }

    #[test]
    fn test_active_servers_uses_default_profile() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let mut config = Config::new();
        config.insert_server(Server::stdio("a", "node", vec![]));
        let mut off = Server::stdio("off", "node", vec![]);
        off.disabled = true;
        config.insert_server(off);
        config.profiles.insert(
            "work".to_string(),
            crate::config::Profile {
                servers: [("jira".to_string(), Server::stdio("jira", "npx", vec![]))].into(),
                disabled: vec![],
            },
        );
        config.settings.default_profile = Some("work".to_string());
        store.save(&config).unwrap();

        let names: Vec<String> = store
            .active_servers(None)
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["a", "jira"]);

        assert!(store.active_servers(Some("nope")).is_err());
    }
}
