//! Deterministic tree hashing for integrity checks.
//!
//! Computes a stable hash of an acquired source tree so that drift between
//! the locked state and the checkout on disk can be detected.

use anyhow::Context;
use std::fs;
use std::path::Path;

/// Directory names excluded from hashing: VCS metadata and build output.
pub const IGNORED_DIRS: &[&str] = &[".git", "node_modules", "target", ".venv", "__pycache__"];

/// Compute deterministic tree hash of a directory
///
/// # Algorithm
/// - Recursive directory traversal, skipping [`IGNORED_DIRS`]
/// - Sort paths lexicographically for determinism
/// - Files: `relative_path || 0x00 || content`
/// - Directories: `relative_path || 0xFF`
/// - Symlinks: `relative_path || 0x01 || link target` (not followed)
/// - Output: `blake3:` followed by the hex digest
pub fn hash_tree(path: &Path) -> anyhow::Result<String> {
    let mut hasher = blake3::Hasher::new();
    hash_dir_recursive(&mut hasher, path, "")?;
    Ok(format!("blake3:{}", hasher.finalize().to_hex()))
}

fn hash_dir_recursive(hasher: &mut blake3::Hasher, dir: &Path, base: &str) -> anyhow::Result<()> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?;

    let mut sorted_entries: Vec<_> = entries
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to read directory entries: {}", dir.display()))?;
    sorted_entries.sort_by_key(|e| e.file_name());

    for entry in sorted_entries {
        let name = entry.file_name();
        let name_str = name.to_string_lossy();
        let rel_path = if base.is_empty() {
            name_str.to_string()
        } else {
            format!("{}/{}", base, name_str)
        };

        let ty = entry
            .file_type()
            .with_context(|| format!("Failed to stat file: {}", entry.path().display()))?;

        if ty.is_dir() {
            if IGNORED_DIRS.contains(&name_str.as_ref()) {
                continue;
            }
            hasher.update(rel_path.as_bytes());
            hasher.update(&[0xFF]);
            hash_dir_recursive(hasher, &entry.path(), &rel_path)?;
        } else if ty.is_file() {
            hasher.update(rel_path.as_bytes());
            hasher.update(&[0x00]);
            let content = fs::read(entry.path())
                .with_context(|| format!("Failed to read file: {}", entry.path().display()))?;
            hasher.update(&content);
        } else if ty.is_symlink() {
            let target = fs::read_link(entry.path())
                .with_context(|| format!("Failed to read link: {}", entry.path().display()))?;
            hasher.update(rel_path.as_bytes());
            hasher.update(&[0x01]);
            hasher.update(target.to_string_lossy().as_bytes());
        }
    }

    Ok(())
}
