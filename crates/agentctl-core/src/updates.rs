//! Update hints for unpinned VCS servers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Server;
use crate::lockfile::{LockedEntry, LockfileStore, staleness};

/// A server whose remote has moved past the locked commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateHint {
    pub name: String,
    pub current_commit: Option<String>,
    pub remote_commit: String,
    pub checked_at: DateTime<Utc>,
}

/// Source of remote commit information.
pub trait UpdateChecker: Send + Sync {
    /// Remote commit when it differs from the locked one.
    fn remote_update(&self, entry: &LockedEntry) -> Option<String>;
}

/// Queries remotes with `git ls-remote`.
#[derive(Debug, Default, Clone, Copy)]
pub struct GitRemoteChecker;

impl UpdateChecker for GitRemoteChecker {
    fn remote_update(&self, entry: &LockedEntry) -> Option<String> {
        staleness::remote_update(entry)
    }
}

/// Check every stale server and record the check time.
///
/// Servers without a lock entry, pinned servers and recently checked
/// servers are skipped. Lockfile write failures are logged and ignored.
pub fn check_updates(
    servers: &[Server],
    lockfile: &mut LockfileStore,
    checker: &dyn UpdateChecker,
    now: DateTime<Utc>,
) -> Vec<UpdateHint> {
    let mut hints = Vec::new();
    for server in servers {
        let Some(entry) = lockfile.get(server.key()).cloned() else {
            continue;
        };
        if !staleness::is_stale(&server.source, &entry, now) {
            continue;
        }
        if let Some(remote_commit) = checker.remote_update(&entry) {
            hints.push(UpdateHint {
                name: server.key().to_string(),
                current_commit: entry.resolved_commit.clone(),
                remote_commit,
                checked_at: now,
            });
        }
        if let Err(err) = lockfile.mark_checked(server.key(), now) {
            debug!(server = %server.name, error = %err, "Failed to record update check");
        }
    }
    hints
}
