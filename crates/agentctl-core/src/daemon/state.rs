//! Shared daemon status, persisted after every change.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::fs::{read_json_or_default, write_json_atomic};
use crate::updates::UpdateHint;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DaemonStatus {
    #[serde(default)]
    pub pid: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub running: bool,

    #[serde(default)]
    pub checking: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_check: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_check: Option<DateTime<Utc>>,

    #[serde(default)]
    pub check_count: u64,

    #[serde(default)]
    pub updates: Vec<UpdateHint>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Status snapshot behind a single lock, mirrored to disk.
#[derive(Debug, Clone)]
pub struct StatusStore {
    path: PathBuf,
    inner: Arc<RwLock<DaemonStatus>>,
}

impl StatusStore {
    /// Load the last persisted status, or start from the default.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        let status: DaemonStatus = read_json_or_default(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            inner: Arc::new(RwLock::new(status)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn snapshot(&self) -> DaemonStatus {
        self.inner.read().await.clone()
    }

    /// Apply `f` and persist the result before releasing the lock.
    pub async fn update<F>(&self, f: F) -> anyhow::Result<DaemonStatus>
    where
        F: FnOnce(&mut DaemonStatus),
    {
        let mut status = self.inner.write().await;
        f(&mut status);
        write_json_atomic(&self.path, &*status)?;
        Ok(status.clone())
    }
}
