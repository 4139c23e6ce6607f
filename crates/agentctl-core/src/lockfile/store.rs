//! Lockfile persistence next to the global config.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::types::{Integrity, LockedEntry, Lockfile};
use crate::fs::{hash_tree, read_json_or_default, write_json_atomic};

pub const LOCKFILE_NAME: &str = "agentctl.lock";

/// Loaded lockfile bound to its path. Every mutation is saved immediately.
#[derive(Debug, Clone)]
pub struct LockfileStore {
    path: PathBuf,
    lockfile: Lockfile,
}

impl LockfileStore {
    /// Load `<global_dir>/agentctl.lock`, or start empty.
    pub fn load(global_dir: &Path) -> anyhow::Result<Self> {
        let path = global_dir.join(LOCKFILE_NAME);
        let lockfile = read_json_or_default(&path)?;
        Ok(Self { path, lockfile })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lockfile(&self) -> &Lockfile {
        &self.lockfile
    }

    pub fn get(&self, name: &str) -> Option<&LockedEntry> {
        self.lockfile.get(name)
    }

    pub fn lock(&mut self, name: &str, entry: LockedEntry) -> anyhow::Result<()> {
        debug!(name, commit = ?entry.resolved_commit, "Locking server");
        self.lockfile.lock(name, entry);
        self.save()
    }

    /// Drop an entry. Only called on explicit uninstall.
    pub fn remove(&mut self, name: &str) -> anyhow::Result<Option<LockedEntry>> {
        let removed = self.lockfile.remove(name);
        if removed.is_some() {
            self.save()?;
        }
        Ok(removed)
    }

    /// Record a staleness check for `name`.
    pub fn mark_checked(&mut self, name: &str, at: chrono::DateTime<chrono::Utc>) -> anyhow::Result<()> {
        if let Some(entry) = self.lockfile.get_mut(name) {
            entry.last_checked = Some(at);
            self.save()?;
        }
        Ok(())
    }

    /// Compare the tree at `path` with the locked integrity of `name`.
    pub fn verify(&self, name: &str, path: &Path) -> anyhow::Result<Integrity> {
        let Some(expected) = self.get(name).and_then(|e| e.integrity.clone()) else {
            return Ok(Integrity::Missing);
        };
        if !path.exists() {
            return Ok(Integrity::Missing);
        }
        let actual = hash_tree(path)?;
        if actual == expected {
            Ok(Integrity::Ok)
        } else {
            Ok(Integrity::Drifted { expected, actual })
        }
    }

    fn save(&self) -> anyhow::Result<()> {
        write_json_atomic(&self.path, &self.lockfile)
    }
}
