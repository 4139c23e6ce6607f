//! Staleness policy for unpinned VCS sources.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use super::types::LockedEntry;
use crate::builder::git;
use crate::config::Source;

/// Minimum time between remote checks.
pub const CHECK_INTERVAL_HOURS: i64 = 24;

/// Whether `entry` is due for a remote check.
pub fn is_stale(source: &Source, entry: &LockedEntry, now: DateTime<Utc>) -> bool {
    if !source.r#type.is_vcs() || source.is_pinned() {
        return false;
    }
    match entry.last_checked {
        None => true,
        Some(_) => now - entry.last_seen() > Duration::hours(CHECK_INTERVAL_HOURS),
    }
}

/// Remote HEAD when it differs from the locked commit. Failures yield `None`.
pub fn remote_update(entry: &LockedEntry) -> Option<String> {
    let url = entry.source_url.as_deref()?;
    match git::ls_remote(url, None) {
        Ok(Some(remote)) if entry.resolved_commit.as_deref() != Some(remote.as_str()) => Some(remote),
        Ok(_) => None,
        Err(err) => {
            debug!(url, error = %err, "Remote check failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(age_hours: i64, checked_hours: Option<i64>) -> LockedEntry {
        let now = Utc::now();
        let mut entry = LockedEntry::new(now - Duration::hours(age_hours));
        entry.last_checked = checked_hours.map(|h| now - Duration::hours(h));
        entry
    }

    #[test]
    fn test_unchecked_git_source_is_stale() {
        let source = Source::git("https://github.com/org/repo");
        assert!(is_stale(&source, &entry(1, None), Utc::now()));
    }

    #[test]
    fn test_recent_check_is_fresh() {
        let source = Source::git("https://github.com/org/repo");
        assert!(!is_stale(&source, &entry(48, Some(2)), Utc::now()));
        assert!(is_stale(&source, &entry(48, Some(25)), Utc::now()));
    }

    #[test]
    fn test_pinned_and_local_never_stale() {
        let pinned = Source::git("https://github.com/org/repo").with_reference("v1.0.0");
        assert!(!is_stale(&pinned, &entry(100, None), Utc::now()));
        assert!(!is_stale(&Source::local("./srv"), &entry(100, None), Utc::now()));
    }

    #[test]
    fn test_remote_failure_is_swallowed() {
        let mut locked = entry(1, None);
        locked.source_url = Some("/nonexistent/agentctl/repo".to_string());
        assert_eq!(remote_update(&locked), None);
    }
}
