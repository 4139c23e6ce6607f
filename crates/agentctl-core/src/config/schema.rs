//! Configuration schema for `config.json` and `.agentctl.json`.
//!
//! Global and project files share one schema. Servers are keyed by name;
//! the name and scope are stamped onto each entry at load time.

use std::collections::BTreeMap;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use super::documents::Document;
use crate::types::{Scope, SourceType, Transport};

/// Root configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// MCP server definitions keyed by name.
    #[serde(default)]
    pub servers: BTreeMap<String, Server>,

    /// Tool enablement and policy settings.
    #[serde(default)]
    pub settings: Settings,

    /// Named additive overlays.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub profiles: BTreeMap<String, Profile>,

    /// Alias key to git URL table used by `alias` sources.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub aliases: BTreeMap<String, String>,

    /// Project files only: names of global servers hidden in this project.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disabled: Vec<String>,

    /// Markdown commands loaded from the `commands/` directory.
    #[serde(skip)]
    pub commands: BTreeMap<String, Document>,

    /// Markdown rules loaded from the `rules/` directory.
    #[serde(skip)]
    pub rules: BTreeMap<String, Document>,

    /// Skills loaded from the `skills/` directory.
    #[serde(skip)]
    pub skills: BTreeMap<String, Document>,
}

/// An MCP server definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Server {
    /// Unique key within a scope. Taken from the map key.
    #[serde(skip)]
    pub name: String,

    #[serde(default)]
    pub transport: Transport,

    /// stdio: executable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    /// http/sse: endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    /// Name the server is published under in tool configs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,

    #[serde(default)]
    pub source: Source,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildConfig>,

    /// Which file this server was loaded from.
    #[serde(skip)]
    pub scope: Scope,
}

impl Server {
    pub fn stdio(name: impl Into<String>, command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            transport: Transport::Stdio,
            command: Some(command.into()),
            args,
            ..Default::default()
        }
    }

    pub fn http(name: impl Into<String>, url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            name: name.into(),
            transport: Transport::Http,
            url: Some(url.clone()),
            source: Source {
                r#type: SourceType::Remote,
                url: Some(url),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn with_source(mut self, source: Source) -> Self {
        self.source = source;
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Key used in tool configs and in diffs: the namespace when set, else the name.
    pub fn key(&self) -> &str {
        self.namespace.as_deref().unwrap_or(&self.name)
    }

    pub fn is_enabled(&self) -> bool {
        !self.disabled
    }

    /// Validate a single server definition.
    pub fn validate(&self) -> anyhow::Result<()> {
        validate_name(&self.name)?;
        if let Some(namespace) = &self.namespace {
            validate_name(namespace).context("Invalid namespace")?;
        }
        match self.transport {
            Transport::Stdio => {
                let resolvable = matches!(
                    self.source.r#type,
                    SourceType::Git | SourceType::Alias | SourceType::Local
                );
                if self.command.as_deref().is_none_or(str::is_empty) && !resolvable {
                    anyhow::bail!("stdio server requires a command");
                }
            }
            Transport::Http | Transport::Sse => {
                if self.url.as_deref().is_none_or(str::is_empty) {
                    anyhow::bail!("{} server requires a url", self.transport);
                }
            }
        }
        self.source.validate()
    }
}

fn validate_name(name: &str) -> anyhow::Result<()> {
    if name.trim().is_empty() {
        anyhow::bail!("name must not be empty");
    }
    if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
        anyhow::bail!("name '{}' must not contain path separators", name);
    }
    Ok(())
}

/// Where a server's implementation comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    #[serde(default)]
    pub r#type: SourceType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Branch, tag or commit to pin.
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl Source {
    pub fn local(path: impl Into<String>) -> Self {
        Self {
            r#type: SourceType::Local,
            url: Some(path.into()),
            ..Default::default()
        }
    }

    pub fn git(url: impl Into<String>) -> Self {
        Self {
            r#type: SourceType::Git,
            url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn alias(key: impl Into<String>) -> Self {
        Self {
            r#type: SourceType::Alias,
            alias: Some(key.into()),
            ..Default::default()
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn is_pinned(&self) -> bool {
        self.reference.as_deref().is_some_and(|r| !r.is_empty())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        match self.r#type {
            SourceType::Local | SourceType::Git => {
                if self.url.as_deref().is_none_or(str::is_empty) {
                    anyhow::bail!("{:?} source requires a url", self.r#type);
                }
            }
            SourceType::Alias => {
                if self.alias.as_deref().is_none_or(str::is_empty) {
                    anyhow::bail!("alias source requires an alias key");
                }
            }
            SourceType::Remote | SourceType::Manual => {}
        }
        Ok(())
    }
}

/// Explicit build steps overriding ecosystem detection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub install: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub build: Vec<String>,
}

impl BuildConfig {
    pub fn is_empty(&self) -> bool {
        self.install.is_empty() && self.build.is_empty()
    }
}

/// Update policy for VCS-acquired servers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoUpdate {
    Off,
    #[default]
    Notify,
    Apply,
}

/// Per-tool enablement and policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Tool name to enabled flag. Tools not listed are enabled.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tools: BTreeMap<String, bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_profile: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_update: Option<AutoUpdate>,
}

impl Settings {
    pub fn tool_enabled(&self, tool: &str) -> bool {
        self.tools.get(tool).copied().unwrap_or(true)
    }

    pub fn auto_update(&self) -> AutoUpdate {
        self.auto_update.unwrap_or_default()
    }
}

/// Named overlay of extra servers and a disabled list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub servers: BTreeMap<String, Server>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disabled: Vec<String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a server under its own name, replacing any existing entry.
    pub fn insert_server(&mut self, server: Server) -> Option<Server> {
        self.servers.insert(server.name.clone(), server)
    }

    pub fn server(&self, name: &str) -> Option<&Server> {
        self.servers.get(name)
    }

    /// Copy map keys into entry names and stamp every entry with `scope`.
    pub fn stamp(&mut self, scope: Scope) {
        for (name, server) in self.servers.iter_mut() {
            server.name = name.clone();
            server.scope = scope;
        }
        for profile in self.profiles.values_mut() {
            for (name, server) in profile.servers.iter_mut() {
                server.name = name.clone();
                server.scope = scope;
            }
        }
        for doc in self
            .commands
            .values_mut()
            .chain(self.rules.values_mut())
            .chain(self.skills.values_mut())
        {
            doc.scope = scope;
        }
    }

    /// Resolve an alias key to its git URL.
    pub fn resolve_alias(&self, alias: &str) -> Option<&str> {
        self.aliases.get(alias).map(String::as_str)
    }

    /// Validate every server, including profile servers.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, server) in &self.servers {
            server
                .validate()
                .with_context(|| format!("Invalid server configuration: '{}'", name))?;
        }
        for (profile_name, profile) in &self.profiles {
            for (name, server) in &profile.servers {
                server.validate().with_context(|| {
                    format!(
                        "Invalid server configuration: '{}' in profile '{}'",
                        name, profile_name
                    )
                })?;
            }
        }
        if let Some(profile) = &self.settings.default_profile
            && !self.profiles.contains_key(profile)
        {
            anyhow::bail!("Default profile '{}' is not defined", profile);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config() {
        let config = Config::new();
        assert!(config.servers.is_empty());
        assert!(config.profiles.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_key_prefers_namespace() {
        let bare = Server::stdio("github", "npx", vec![]);
        let namespaced = Server::stdio("github", "npx", vec![]).with_namespace("work-github");
        assert_eq!(bare.key(), "github");
        assert_eq!(namespaced.key(), "work-github");
    }

    #[test]
    fn test_stamp_sets_name_and_scope() {
        let json = r#"{ "servers": { "fs": { "command": "node" } } }"#;
        let mut config: Config = serde_json::from_str(json).expect("parse config");
        config.stamp(Scope::Local);

        let server = config.server("fs").expect("server exists");
        assert_eq!(server.name, "fs");
        assert_eq!(server.scope, Scope::Local);
        assert_eq!(server.transport, Transport::Stdio);
    }

    #[test]
    fn test_source_ref_field_name() {
        let source = Source::git("https://github.com/org/repo").with_reference("v1.2.0");
        let json = serde_json::to_value(&source).expect("serialize source");
        assert_eq!(json["type"], "git");
        assert_eq!(json["ref"], "v1.2.0");
    }

    #[test]
    fn test_validate_stdio_requires_command() {
        let server = Server {
            name: "broken".to_string(),
            ..Default::default()
        };
        assert!(server.validate().is_err());

        let git_backed = Server {
            name: "cloned".to_string(),
            source: Source::git("https://github.com/org/repo"),
            ..Default::default()
        };
        assert!(git_backed.validate().is_ok());
    }

    #[test]
    fn test_validate_http_requires_url() {
        let mut server = Server::http("remote", "https://mcp.example.com");
        assert!(server.validate().is_ok());
        server.url = None;
        assert!(server.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_path_names() {
        let server = Server::stdio("../escape", "node", vec![]);
        assert!(server.validate().is_err());
    }

    #[test]
    fn test_validate_unknown_default_profile() {
        let mut config = Config::new();
        config.settings.default_profile = Some("work".to_string());
        assert!(config.validate().is_err());

        config.profiles.insert("work".to_string(), Profile::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tool_enabled_defaults_true() {
        let mut settings = Settings::default();
        assert!(settings.tool_enabled("cursor"));
        settings.tools.insert("cursor".to_string(), false);
        assert!(!settings.tool_enabled("cursor"));
        assert_eq!(settings.auto_update(), AutoUpdate::Notify);
    }
}
