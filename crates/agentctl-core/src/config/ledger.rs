//! Managed-state ledger.
//!
//! Records which entries in each foreign config file were written by the
//! sync engine. Only names in the ledger may be removed by a clean sync.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::fs::{read_json_or_default, write_json_atomic};
use crate::types::ResourceKind;

/// Ledger file name inside the global config directory.
pub const LEDGER_FILE: &str = "managed.json";

/// Ledger key to the sorted set of names the engine owns there.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManagedLedger {
    entries: BTreeMap<String, BTreeSet<String>>,
}

impl ManagedLedger {
    /// Ledger key for one adapter target.
    ///
    /// Servers use the bare tool name, other kinds `<tool>/<kind>`. Workspace
    /// targets append `@<project dir>`.
    pub fn key(tool: &str, kind: ResourceKind, workspace: Option<&Path>) -> String {
        let mut key = match kind {
            ResourceKind::Servers => tool.to_string(),
            other => format!("{}/{}", tool, other),
        };
        if let Some(dir) = workspace {
            key.push('@');
            key.push_str(&dir.to_string_lossy());
        }
        key
    }

    pub fn get(&self, key: &str) -> BTreeSet<String> {
        self.entries.get(key).cloned().unwrap_or_default()
    }

    pub fn set(&mut self, key: impl Into<String>, names: BTreeSet<String>) {
        let key = key.into();
        if names.is_empty() {
            self.entries.remove(&key);
        } else {
            self.entries.insert(key, names);
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Load-or-default ledger persisted after every mutation.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    path: PathBuf,
    ledger: ManagedLedger,
}

impl LedgerStore {
    pub fn load(global_dir: &Path) -> anyhow::Result<Self> {
        let path = global_dir.join(LEDGER_FILE);
        let ledger = read_json_or_default(&path)
            .with_context(|| format!("Failed to load managed ledger: {}", path.display()))?;
        Ok(Self { path, ledger })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn ledger(&self) -> &ManagedLedger {
        &self.ledger
    }

    pub fn get(&self, key: &str) -> BTreeSet<String> {
        self.ledger.get(key)
    }

    /// Replace the names for `key` and persist immediately.
    pub fn update(&mut self, key: &str, names: BTreeSet<String>) -> anyhow::Result<()> {
        self.ledger.set(key, names);
        write_json_atomic(&self.path, &self.ledger)
            .with_context(|| format!("Failed to save managed ledger: {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_ledger_keys() {
        assert_eq!(
            ManagedLedger::key("cursor", ResourceKind::Servers, None),
            "cursor"
        );
        assert_eq!(
            ManagedLedger::key("cursor", ResourceKind::Rules, None),
            "cursor/rules"
        );
        assert_eq!(
            ManagedLedger::key("vscode", ResourceKind::Servers, Some(Path::new("/w/app"))),
            "vscode@/w/app"
        );
    }

    #[test]
    fn test_store_persists_on_update() {
        let temp = TempDir::new().unwrap();
        let mut store = LedgerStore::load(temp.path()).unwrap();
        assert!(store.ledger().is_empty());

        let names: BTreeSet<String> = ["b", "a"].iter().map(|s| s.to_string()).collect();
        store.update("cursor", names.clone()).unwrap();

        let raw = std::fs::read_to_string(temp.path().join(LEDGER_FILE)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["cursor"], serde_json::json!(["a", "b"]));

        let reloaded = LedgerStore::load(temp.path()).unwrap();
        assert_eq!(reloaded.get("cursor"), names);
    }

    #[test]
    fn test_empty_set_removes_key() {
        let mut ledger = ManagedLedger::default();
        ledger.set("cursor", BTreeSet::from(["a".to_string()]));
        ledger.set("cursor", BTreeSet::new());
        assert!(ledger.is_empty());
    }
}
