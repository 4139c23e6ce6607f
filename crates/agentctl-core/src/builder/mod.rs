//! Acquisition and build pipeline for stdio servers.
//!
//! A server moves through `NotCloned -> Cloned -> Built -> CommandResolved`.
//! Git and alias sources are cloned into `<data_dir>/agentctl/servers`;
//! local sources are built in place. Remote and manual sources have nothing
//! to acquire.

pub mod ecosystem;
pub mod entrypoint;
pub mod git;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::Context;
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Server;
use crate::fs::hash_tree;
use crate::lockfile::{LockedEntry, LockfileStore};
use crate::types::SourceType;

pub use ecosystem::{Ecosystem, Step};

/// Marker recorded after a successful build.
pub const BUILT_STAMP: &str = ".agentctl-built";

/// Directory under the servers dir holding stamps for in-place local builds.
const LOCAL_STAMPS_DIR: &str = ".local-builds";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildState {
    NotCloned,
    Cloned,
    Built,
    CommandResolved,
}

/// Launch command for a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedCommand {
    pub command: String,
    pub args: Vec<String>,
}

impl ResolvedCommand {
    fn from_server(server: &Server) -> Option<Self> {
        let command = server.command.as_deref().filter(|c| !c.is_empty())?;
        Some(Self {
            command: command.to_string(),
            args: server.args.clone(),
        })
    }

    /// Write this command into `server`.
    pub fn apply(&self, server: &mut Server) {
        server.command = Some(self.command.clone());
        server.args = self.args.clone();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildOutcome {
    /// Detected ecosystem. `None` for explicit steps or nothing to build.
    pub ecosystem: Option<Ecosystem>,
    /// Steps that ran, in order.
    pub steps: Vec<String>,
    /// Default launch command derived from the built tree.
    pub command: Option<ResolvedCommand>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InstallOutcome {
    pub path: PathBuf,
    pub build: BuildOutcome,
    pub command: Option<ResolvedCommand>,
    pub entry: LockedEntry,
}

/// Per-server results of a bulk install.
#[derive(Debug, Default, Serialize)]
pub struct BulkReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, String)>,
    /// Servers with nothing to acquire.
    pub skipped: Vec<String>,
}

impl BulkReport {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

#[derive(Debug)]
pub struct Builder {
    servers_dir: PathBuf,
    base_dir: PathBuf,
    home_dir: Option<PathBuf>,
    aliases: BTreeMap<String, String>,
}

impl Builder {
    /// Builder installing under `<data_dir>/agentctl/servers`. Relative local
    /// paths resolve against `base_dir`.
    pub fn new(data_dir: &Path, base_dir: PathBuf) -> Self {
        Self {
            servers_dir: data_dir.join("agentctl").join("servers"),
            base_dir,
            home_dir: None,
            aliases: BTreeMap::new(),
        }
    }

    pub fn with_home(mut self, home_dir: PathBuf) -> Self {
        self.home_dir = Some(home_dir);
        self
    }

    pub fn with_aliases(mut self, aliases: BTreeMap<String, String>) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn servers_dir(&self) -> &Path {
        &self.servers_dir
    }

    pub fn install_path(&self, server: &Server) -> anyhow::Result<PathBuf> {
        if server.source.r#type == SourceType::Local {
            let raw = server
                .source
                .url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("Local source for '{}' has no path", server.name))?;
            return Ok(self.expand_local(raw));
        }
        let mut path = self.servers_dir.clone();
        if let Some(namespace) = &server.namespace {
            path.push(namespace);
        }
        path.push(&server.name);
        Ok(path)
    }

    /// Build stamp for `server`. Cloned sources keep it in the install dir;
    /// local sources keep it under the servers dir so the user's tree is not
    /// touched.
    pub fn stamp_path(&self, server: &Server) -> anyhow::Result<PathBuf> {
        if server.source.r#type != SourceType::Local {
            return Ok(self.install_path(server)?.join(BUILT_STAMP));
        }
        let mut path = self.servers_dir.join(LOCAL_STAMPS_DIR);
        if let Some(namespace) = &server.namespace {
            path.push(namespace);
        }
        path.push(&server.name);
        Ok(path.join(BUILT_STAMP))
    }

    fn expand_local(&self, raw: &str) -> PathBuf {
        if let Some(rest) = raw.strip_prefix("~/")
            && let Some(home) = self.home_dir.clone().or_else(dirs::home_dir)
        {
            return home.join(rest);
        }
        let path = PathBuf::from(raw);
        if path.is_absolute() {
            path
        } else {
            self.base_dir.join(path)
        }
    }

    /// Clone URL for VCS sources. `None` for sources with nothing to clone.
    pub fn clone_url(&self, server: &Server) -> anyhow::Result<Option<String>> {
        match server.source.r#type {
            SourceType::Git => Ok(server.source.url.clone()),
            SourceType::Alias => {
                let key = server.source.alias.as_deref().unwrap_or_default();
                let url = self
                    .aliases
                    .get(key)
                    .ok_or_else(|| anyhow::anyhow!("Unknown alias '{}' for '{}'", key, server.name))?;
                Ok(Some(url.clone()))
            }
            SourceType::Local | SourceType::Remote | SourceType::Manual => Ok(None),
        }
    }

    pub fn state(&self, server: &Server) -> anyhow::Result<BuildState> {
        let path = self.install_path(server)?;
        let acquired = if server.source.r#type.is_vcs() {
            path.join(".git").exists()
        } else {
            path.exists()
        };
        if !acquired {
            return Ok(BuildState::NotCloned);
        }
        if !self.stamp_path(server)?.exists() {
            return Ok(BuildState::Cloned);
        }
        if self.resolve_command(server)?.is_some() {
            Ok(BuildState::CommandResolved)
        } else {
            Ok(BuildState::Built)
        }
    }

    pub fn installed(&self, server: &Server) -> bool {
        self.install_path(server).is_ok_and(|path| path.exists())
    }

    /// Clone the source. A no-op when already cloned or not a VCS source.
    pub fn clone(&self, server: &Server) -> anyhow::Result<PathBuf> {
        let path = self.install_path(server)?;
        let Some(url) = self.clone_url(server)? else {
            return Ok(path);
        };
        if path.join(".git").exists() {
            debug!(server = %server.name, path = %path.display(), "Already cloned");
            return Ok(path);
        }

        git::require_tool("git")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let target = path.to_string_lossy().into_owned();
        info!(server = %server.name, url = %url, "Cloning");

        match server.source.reference.as_deref().filter(|r| !r.is_empty()) {
            Some(commit) if git::looks_like_commit(commit) => {
                git::run_git(None, &["clone", "--depth", "1", &url, &target])?;
                git::run_git(Some(&path), &["fetch", "--depth", "1", "origin", commit])?;
                git::run_git(Some(&path), &["checkout", commit])?;
            }
            Some(reference) => {
                git::run_git(
                    None,
                    &["clone", "--depth", "1", "--branch", reference, &url, &target],
                )?;
            }
            None => git::run_git(None, &["clone", "--depth", "1", &url, &target])?,
        }
        Ok(path)
    }

    /// Move a clone to its pinned ref, or the remote default branch when
    /// unpinned. Returns the new HEAD commit.
    pub fn update(&self, server: &Server) -> anyhow::Result<Option<String>> {
        if self.clone_url(server)?.is_none() {
            return Ok(None);
        }
        let path = self.install_path(server)?;
        if !path.join(".git").exists() {
            self.clone(server)?;
            return Self::get_commit(&path).map(Some);
        }

        git::require_tool("git")?;
        let reference = server
            .source
            .reference
            .as_deref()
            .filter(|r| !r.is_empty())
            .unwrap_or("HEAD");
        info!(server = %server.name, reference, "Updating");
        git::run_git(Some(&path), &["fetch", "--depth", "1", "origin", reference])?;
        git::run_git(Some(&path), &["reset", "--hard", "FETCH_HEAD"])?;

        let stamp = self.stamp_path(server)?;
        if stamp.exists() {
            std::fs::remove_file(&stamp)
                .with_context(|| format!("Failed to remove build stamp: {}", stamp.display()))?;
        }
        Self::get_commit(&path).map(Some)
    }

    /// Run explicit build steps, or the detected ecosystem's steps.
    pub fn build(&self, server: &Server) -> anyhow::Result<BuildOutcome> {
        let path = self.install_path(server)?;
        if !path.is_dir() {
            anyhow::bail!(
                "Server '{}' has not been acquired: {}",
                server.name,
                path.display()
            );
        }

        let mut steps = Vec::new();
        let mut detected = None;
        match server.build.as_ref().filter(|b| !b.is_empty()) {
            Some(explicit) => {
                for line in explicit.install.iter().chain(explicit.build.iter()) {
                    run_shell(&path, line)?;
                    steps.push(line.clone());
                }
            }
            None => match Ecosystem::detect(&path) {
                Some(ecosystem) => {
                    debug!(server = %server.name, %ecosystem, "Detected ecosystem");
                    detected = Some(ecosystem);
                    let install = ecosystem.install_step();
                    let build = ecosystem.build_step(&path, &server.name);
                    for step in std::iter::once(install).chain(build) {
                        run_step(&path, &step)?;
                        steps.push(step.to_string());
                    }
                }
                None => debug!(server = %server.name, "No build needed"),
            },
        }

        let stamp = self.stamp_path(server)?;
        if let Some(parent) = stamp.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        std::fs::write(&stamp, Utc::now().to_rfc3339())
            .with_context(|| format!("Failed to write build stamp: {}", stamp.display()))?;

        let command = entrypoint::probe(&path, &server.name).map(|entry| {
            let (command, args) = entrypoint::launch_command(&entry);
            ResolvedCommand { command, args }
        });
        Ok(BuildOutcome {
            ecosystem: detected,
            steps,
            command,
        })
    }

    /// Launch command for `server`. Local sources with a configured command
    /// keep it unchanged.
    pub fn resolve_command(&self, server: &Server) -> anyhow::Result<Option<ResolvedCommand>> {
        let configured = ResolvedCommand::from_server(server);
        match server.source.r#type {
            SourceType::Remote | SourceType::Manual => return Ok(configured),
            SourceType::Local if configured.is_some() => return Ok(configured),
            SourceType::Local | SourceType::Git | SourceType::Alias => {}
        }
        let path = self.install_path(server)?;
        let probed = entrypoint::probe(&path, &server.name).map(|entry| {
            let (command, args) = entrypoint::launch_command(&entry);
            ResolvedCommand { command, args }
        });
        Ok(probed.or(configured))
    }

    /// Delete the install dir. Local sources are never deleted.
    pub fn remove(&self, server: &Server) -> anyhow::Result<bool> {
        if server.source.r#type == SourceType::Local {
            return Ok(false);
        }
        let path = self.install_path(server)?;
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_dir_all(&path)
            .with_context(|| format!("Failed to remove install directory: {}", path.display()))?;
        info!(server = %server.name, "Removed install directory");
        Ok(true)
    }

    pub fn get_commit(path: &Path) -> anyhow::Result<String> {
        git::head_commit(path)
    }

    pub fn get_version(path: &Path) -> anyhow::Result<Option<String>> {
        git::exact_tag(path)
    }

    /// Clone, build, resolve and lock a single server.
    pub fn install(
        &self,
        server: &Server,
        lockfile: &mut LockfileStore,
    ) -> anyhow::Result<InstallOutcome> {
        if matches!(
            server.source.r#type,
            SourceType::Remote | SourceType::Manual
        ) {
            anyhow::bail!("Server '{}' has no installable source", server.name);
        }

        let path = self.clone(server)?;
        let build = self.build(server)?;
        let command = self.resolve_command(server)?;
        if command.is_none() {
            warn!(server = %server.name, "No launch command could be resolved");
        }

        let (commit, version) = if path.join(".git").exists() {
            (
                Self::get_commit(&path).ok(),
                Self::get_version(&path).ok().flatten(),
            )
        } else {
            (None, None)
        };
        let source_url = match self.clone_url(server)? {
            Some(url) => Some(url),
            None => Some(path.to_string_lossy().into_owned()),
        };
        let entry = LockedEntry::new(Utc::now())
            .with_source(source_url, server.source.reference.clone())
            .with_commit(commit, version)
            .with_integrity(Some(hash_tree(&path)?));
        lockfile.lock(server.key(), entry.clone())?;

        Ok(InstallOutcome {
            path,
            build,
            command,
            entry,
        })
    }

    /// Install every acquirable server, continuing past failures.
    pub fn install_all<'s>(
        &self,
        servers: impl IntoIterator<Item = &'s Server>,
        lockfile: &mut LockfileStore,
    ) -> BulkReport {
        let mut report = BulkReport::default();
        for server in servers {
            if matches!(
                server.source.r#type,
                SourceType::Remote | SourceType::Manual
            ) {
                report.skipped.push(server.name.clone());
                continue;
            }
            match self.install(server, lockfile) {
                Ok(_) => report.succeeded.push(server.name.clone()),
                Err(err) => {
                    warn!(server = %server.name, error = %err, "Install failed");
                    report.failed.push((server.name.clone(), format!("{:#}", err)));
                }
            }
        }
        report
    }
}

fn run_step(dir: &Path, step: &Step) -> anyhow::Result<()> {
    git::require_tool(step.program)?;
    info!(dir = %dir.display(), step = %step, "Running build step");
    let status = Command::new(step.program)
        .args(&step.args)
        .current_dir(dir)
        .status()
        .with_context(|| format!("Failed to run '{}'", step))?;
    if !status.success() {
        anyhow::bail!("Build step '{}' failed: {}", step, status);
    }
    Ok(())
}

fn run_shell(dir: &Path, line: &str) -> anyhow::Result<()> {
    let (shell, flag) = if cfg!(windows) { ("cmd", "/C") } else { ("sh", "-c") };
    git::require_tool(shell)?;
    info!(dir = %dir.display(), step = line, "Running build step");
    let status = Command::new(shell)
        .args([flag, line])
        .current_dir(dir)
        .status()
        .with_context(|| format!("Failed to run '{}'", line))?;
    if !status.success() {
        anyhow::bail!("Build step '{}' failed: {}", line, status);
    }
    Ok(())
}
