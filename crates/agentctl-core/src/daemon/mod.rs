//! Background update checker with a Unix socket.
//!
//! Files under the state directory:
//! - `daemon.sock`: command socket
//! - `daemon.pid`: PID of the running daemon
//! - `daemon-status.json`: last status, readable without the daemon

pub mod client;
pub mod protocol;
pub mod server;
pub mod state;

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::builder::Builder;
use crate::config::{AutoUpdate, ConfigStore};
use crate::lockfile::LockfileStore;
use crate::updates::{UpdateChecker, UpdateHint, check_updates};

pub use client::{read_status_file, send_command};
pub use protocol::{Request, Response};
pub use server::DaemonServer;
pub use state::{DaemonStatus, StatusStore};

pub const SOCKET_FILE: &str = "daemon.sock";
pub const PID_FILE: &str = "daemon.pid";
pub const STATUS_FILE: &str = "daemon-status.json";

pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonPaths {
    pub socket: PathBuf,
    pub pid: PathBuf,
    pub status: PathBuf,
}

impl DaemonPaths {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            socket: state_dir.join(SOCKET_FILE),
            pid: state_dir.join(PID_FILE),
            status: state_dir.join(STATUS_FILE),
        }
    }

    /// Remove the socket and PID files. Missing files are ignored.
    pub fn cleanup(&self) {
        for path in [&self.socket, &self.pid] {
            match std::fs::remove_file(path) {
                Ok(()) => debug!(path = %path.display(), "Removed"),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => warn!(path = %path.display(), error = %err, "Failed to remove"),
            }
        }
    }
}

/// Produces update hints for the daemon's check loop.
pub trait UpdateSource: Send + Sync {
    fn check(&self) -> anyhow::Result<Vec<UpdateHint>>;
}

/// Checks the servers of the effective config against the lockfile.
///
/// Honors `settings.auto_update`: `off` skips checks, `notify` only reports,
/// `apply` updates and rebuilds servers with a newer remote commit.
pub struct LockfileUpdateSource {
    config: ConfigStore,
    builder: Builder,
    checker: Box<dyn UpdateChecker>,
}

impl LockfileUpdateSource {
    pub fn new(config: ConfigStore, builder: Builder, checker: Box<dyn UpdateChecker>) -> Self {
        Self {
            config,
            builder,
            checker,
        }
    }
}

impl UpdateSource for LockfileUpdateSource {
    fn check(&self) -> anyhow::Result<Vec<UpdateHint>> {
        let config = self.config.load_with_project()?;
        let policy = config.settings.auto_update();
        if policy == AutoUpdate::Off {
            debug!("Auto-update is off; skipping check");
            return Ok(Vec::new());
        }

        let servers = self.config.active_servers(None)?;
        let mut lockfile = LockfileStore::load(self.config.global_dir())?;
        let hints = check_updates(&servers, &mut lockfile, self.checker.as_ref(), Utc::now());
        if policy == AutoUpdate::Notify || hints.is_empty() {
            return Ok(hints);
        }

        let mut pending = Vec::new();
        for hint in hints {
            let Some(server) = servers.iter().find(|s| s.key() == hint.name) else {
                continue;
            };
            let applied = self
                .builder
                .update(server)
                .and_then(|_| self.builder.install(server, &mut lockfile));
            match applied {
                Ok(_) => info!(server = %server.name, "Applied update"),
                Err(err) => {
                    warn!(server = %server.name, error = %format!("{:#}", err), "Update failed");
                    pending.push(hint);
                }
            }
        }
        Ok(pending)
    }
}
