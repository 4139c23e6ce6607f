//! Pure diff between desired and on-disk resource keys.

use std::collections::BTreeSet;

use serde::Serialize;

/// Partition of desired and current keys for one target.
///
/// Every set is ordered, so the same inputs always yield the same diff.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diff {
    /// Desired, absent on disk.
    pub to_add: BTreeSet<String>,
    /// Desired and present on disk. Always fully overwritten.
    pub to_update: BTreeSet<String>,
    /// On disk, not desired, not in the ledger. Never touched.
    pub unmanaged: BTreeSet<String>,
    /// On disk, not desired, written by us earlier.
    pub to_remove: BTreeSet<String>,
    /// Managed entries outside a scope-restricted run. Carried over and kept
    /// in the ledger.
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub retained: BTreeSet<String>,
}

impl Diff {
    pub fn is_noop(&self) -> bool {
        self.to_add.is_empty() && self.to_update.is_empty() && self.to_remove.is_empty()
    }

    /// Treat removal candidates as belonging to another scope.
    ///
    /// Used when the desired set only covers part of a target.
    pub fn retain_removals(&mut self) {
        self.retained.append(&mut self.to_remove);
    }

    /// Existing entries the writer must carry over unchanged.
    pub fn keep(&self, clean: bool) -> BTreeSet<String> {
        let mut keep: BTreeSet<String> = self.unmanaged.union(&self.retained).cloned().collect();
        if !clean {
            keep.extend(self.to_remove.iter().cloned());
        }
        keep
    }

    /// Ledger contents after a successful write.
    pub fn next_ledger(&self, clean: bool) -> BTreeSet<String> {
        let mut managed: BTreeSet<String> = self.to_add.union(&self.to_update).cloned().collect();
        managed.extend(self.retained.iter().cloned());
        if !clean {
            managed.extend(self.to_remove.iter().cloned());
        }
        managed
    }
}

pub fn compute_diff(
    desired: &BTreeSet<String>,
    current: &BTreeSet<String>,
    managed: &BTreeSet<String>,
) -> Diff {
    let mut diff = Diff::default();
    for key in desired {
        if current.contains(key) {
            diff.to_update.insert(key.clone());
        } else {
            diff.to_add.insert(key.clone());
        }
    }
    for key in current.difference(desired) {
        if managed.contains(key) {
            diff.to_remove.insert(key.clone());
        } else {
            diff.unmanaged.insert(key.clone());
        }
    }
    diff
}
