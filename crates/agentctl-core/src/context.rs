//! Application context for unified dependency injection.

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::adapter::{AdapterContext, AdapterRegistry};
use crate::builder::Builder;
use crate::config::{ConfigStore, LedgerStore};
use crate::lockfile::LockfileStore;

/// Every directory the core reads or writes.
///
/// Frontends create this once and hand out services from it. Tests point
/// every directory into a temp dir.
#[derive(Debug, Clone)]
pub struct AppContext {
    home_dir: PathBuf,
    working_dir: PathBuf,
    config_dir: PathBuf,
    data_dir: PathBuf,
    state_dir: PathBuf,
}

impl AppContext {
    /// `config_dir` and `data_dir` are platform roots; the state dir is the
    /// daemon's own directory.
    pub fn new(
        home_dir: PathBuf,
        working_dir: PathBuf,
        config_dir: PathBuf,
        data_dir: PathBuf,
        state_dir: PathBuf,
    ) -> Self {
        Self {
            home_dir,
            working_dir,
            config_dir,
            data_dir,
            state_dir,
        }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        let home_dir =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
        let working_dir = std::env::current_dir().context("Failed to read working directory")?;
        let config_dir = dirs::config_dir().unwrap_or_else(|| home_dir.join(".config"));
        let data_dir = dirs::data_dir().unwrap_or_else(|| home_dir.join(".local").join("share"));
        let state_dir = dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| home_dir.join(".local").join("state"))
            .join("agentctl");
        Ok(Self::new(home_dir, working_dir, config_dir, data_dir, state_dir))
    }

    /// Context with every directory under `root`.
    pub fn under(root: &Path, working_dir: PathBuf) -> Self {
        Self::new(
            root.join("home"),
            working_dir,
            root.join("config"),
            root.join("data"),
            root.join("state"),
        )
    }

    pub fn home_dir(&self) -> &Path {
        &self.home_dir
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// `<config_dir>/agentctl`
    pub fn global_dir(&self) -> PathBuf {
        self.config_dir.join("agentctl")
    }

    pub fn config_store(&self) -> ConfigStore {
        ConfigStore::from_paths(self.global_dir(), self.working_dir.clone())
    }

    pub fn adapter_context(&self) -> AdapterContext {
        AdapterContext::new(self.home_dir.clone(), self.config_dir.clone())
    }

    pub fn registry(&self) -> AdapterRegistry {
        AdapterRegistry::with_default_adapters(&self.adapter_context())
    }

    /// Builder with the alias table of the effective config.
    pub fn builder(&self) -> anyhow::Result<Builder> {
        let config = self.config_store().load_with_project()?;
        let base_dir = self
            .config_store()
            .project_root()
            .unwrap_or_else(|| self.working_dir.clone());
        Ok(Builder::new(&self.data_dir, base_dir)
            .with_home(self.home_dir.clone())
            .with_aliases(config.aliases))
    }

    pub fn lockfile(&self) -> anyhow::Result<LockfileStore> {
        LockfileStore::load(&self.global_dir())
    }

    pub fn ledger(&self) -> anyhow::Result<LedgerStore> {
        LedgerStore::load(&self.global_dir())
    }

    #[cfg(unix)]
    pub fn daemon_paths(&self) -> crate::daemon::DaemonPaths {
        crate::daemon::DaemonPaths::new(&self.state_dir)
    }

    /// Update source for the daemon, checking remotes with `git ls-remote`.
    #[cfg(unix)]
    pub fn update_source(&self) -> anyhow::Result<crate::daemon::LockfileUpdateSource> {
        Ok(crate::daemon::LockfileUpdateSource::new(
            self.config_store(),
            self.builder()?,
            Box::new(crate::updates::GitRemoteChecker),
        ))
    }
}
