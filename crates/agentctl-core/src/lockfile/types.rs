//! Lockfile types for installed server state.
//!
//! Tracks the acquired source, resolved commit and tree integrity per server.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Resolved install state keyed by server name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lockfile {
    entries: BTreeMap<String, LockedEntry>,
}

impl Lockfile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&LockedEntry> {
        self.entries.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut LockedEntry> {
        self.entries.get_mut(name)
    }

    /// Upsert `entry`. An existing entry keeps its original `installed_at`.
    pub fn lock(&mut self, name: impl Into<String>, mut entry: LockedEntry) {
        let name = name.into();
        if let Some(existing) = self.entries.get(&name) {
            entry.installed_at = existing.installed_at;
        }
        self.entries.insert(name, entry);
    }

    pub fn remove(&mut self, name: &str) -> Option<LockedEntry> {
        self.entries.remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &LockedEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A locked server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockedEntry {
    /// Clone URL, or the local path for local sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,

    /// Ref requested at install time, if pinned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_ref: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_commit: Option<String>,

    /// Exact tag at the resolved commit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// `blake3:<hex>` over the acquired tree.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity: Option<String>,

    pub installed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<DateTime<Utc>>,
}

impl LockedEntry {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            source_url: None,
            resolved_ref: None,
            resolved_commit: None,
            version: None,
            integrity: None,
            installed_at: now,
            updated_at: now,
            last_checked: None,
        }
    }

    pub fn with_source(mut self, url: Option<String>, reference: Option<String>) -> Self {
        self.source_url = url;
        self.resolved_ref = reference;
        self
    }

    pub fn with_commit(mut self, commit: Option<String>, version: Option<String>) -> Self {
        self.resolved_commit = commit;
        self.version = version;
        self
    }

    pub fn with_integrity(mut self, integrity: Option<String>) -> Self {
        self.integrity = integrity;
        self
    }

    /// Most recent of `updated_at` and `last_checked`.
    pub fn last_seen(&self) -> DateTime<Utc> {
        match self.last_checked {
            Some(checked) if checked > self.updated_at => checked,
            _ => self.updated_at,
        }
    }
}

/// Result of comparing an install dir with its locked integrity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Integrity {
    Ok,
    Drifted { expected: String, actual: String },
    Missing,
}
