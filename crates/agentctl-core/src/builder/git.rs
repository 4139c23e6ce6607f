//! Git plumbing for acquiring server sources.
//!
//! Mutating operations shell out to `git` with inherited I/O so progress and
//! credential prompts reach the user. Read-only queries go through `git2`.

use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::Context;
use git2::Repository;

/// Fail with a message naming `tool` when it is not on `PATH`.
pub fn require_tool(tool: &str) -> anyhow::Result<()> {
    which::which(tool)
        .map(|_| ())
        .map_err(|_| anyhow::anyhow!("Required tool '{}' was not found on PATH", tool))
}

/// Run `git` with inherited stdio, failing on a non-zero exit.
pub fn run_git(cwd: Option<&Path>, args: &[&str]) -> anyhow::Result<()> {
    let mut cmd = Command::new("git");
    cmd.args(args);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    let status = cmd
        .status()
        .with_context(|| format!("Failed to run git {:?}", args))?;
    if !status.success() {
        anyhow::bail!("Git command failed {:?}: {}", args, status);
    }
    Ok(())
}

/// Remote commit for `reference` (or `HEAD`) without fetching.
pub fn ls_remote(url: &str, reference: Option<&str>) -> anyhow::Result<Option<String>> {
    let target = reference.unwrap_or("HEAD");
    let output = Command::new("git")
        .args(["ls-remote", url, target])
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("Failed to run git ls-remote {}", url))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("git ls-remote {} failed: {}", url, stderr.trim());
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().next())
        .map(str::to_string))
}

/// A full 40-character hex object id.
pub fn looks_like_commit(reference: &str) -> bool {
    reference.len() == 40 && reference.chars().all(|c| c.is_ascii_hexdigit())
}

/// HEAD commit of the repository at `path`.
pub fn head_commit(path: &Path) -> anyhow::Result<String> {
    let repo = Repository::open(path)
        .with_context(|| format!("Failed to open git repository: {}", path.display()))?;
    let commit = repo
        .head()
        .and_then(|head| head.peel_to_commit())
        .with_context(|| format!("Failed to resolve HEAD in {}", path.display()))?;
    Ok(commit.id().to_string())
}

/// Tag pointing exactly at HEAD. Highest semver wins when several do.
pub fn exact_tag(path: &Path) -> anyhow::Result<Option<String>> {
    let repo = Repository::open(path)
        .with_context(|| format!("Failed to open git repository: {}", path.display()))?;
    let head = match repo.head().and_then(|head| head.peel_to_commit()) {
        Ok(commit) => commit.id(),
        Err(_) => return Ok(None),
    };

    let names = repo
        .tag_names(None)
        .with_context(|| format!("Failed to list tags in {}", path.display()))?;
    let mut at_head: Vec<String> = Vec::new();
    for name in names.iter().flatten() {
        let Ok(reference) = repo.find_reference(&format!("refs/tags/{}", name)) else {
            continue;
        };
        if let Ok(commit) = reference.peel_to_commit()
            && commit.id() == head
        {
            at_head.push(name.to_string());
        }
    }

    Ok(highest_tag(at_head))
}

fn highest_tag(tags: Vec<String>) -> Option<String> {
    let parsed = |tag: &str| semver::Version::parse(tag.trim_start_matches('v')).ok();
    let best_semver = tags
        .iter()
        .filter_map(|tag| parsed(tag).map(|version| (version, tag)))
        .max_by(|a, b| a.0.cmp(&b.0))
        .map(|(_, tag)| tag.clone());
    best_semver.or_else(|| tags.into_iter().max())
}
