//! Atomic file persistence (tmp + rename).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Write `bytes` to `path` through a temp file in the same directory.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&parent)
        .with_context(|| format!("Failed to create directory: {}", parent.display()))?;

    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("Invalid file path: {}", path.display()))?
        .to_string_lossy();
    let tmp_path = parent.join(format!(".{}.{}.tmp", file_name, std::process::id()));

    fs::write(&tmp_path, bytes)
        .with_context(|| format!("Failed to write tmp file: {}", tmp_path.display()))?;

    // rename does not replace an existing target on Windows
    if cfg!(windows) && path.exists() {
        fs::remove_file(path)
            .with_context(|| format!("Failed to remove existing file: {}", path.display()))?;
    }
    fs::rename(&tmp_path, path)
        .with_context(|| format!("Failed to rename tmp file: {}", tmp_path.display()))?;
    Ok(())
}

/// Serialize `value` as pretty JSON with a trailing newline and write atomically.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> anyhow::Result<()> {
    let mut bytes = serde_json::to_vec_pretty(value).context("Failed to serialize JSON")?;
    bytes.push(b'\n');
    write_atomic(path, &bytes)
}

/// Load JSON from `path`, or `T::default()` when the file does not exist.
pub fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> anyhow::Result<T> {
    if !path.exists() {
        return Ok(T::default());
    }
    let bytes =
        fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(&bytes).with_context(|| format!("Failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[test]
    fn test_write_atomic_creates_parents() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("a").join("b").join("file.json");

        write_atomic(&path, b"{}").expect("write should succeed");

        assert_eq!(fs::read_to_string(&path).expect("read back"), "{}");
        let leftovers: Vec<_> = fs::read_dir(path.parent().expect("parent"))
            .expect("read dir")
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_read_json_missing_is_default() {
        let temp = TempDir::new().expect("tempdir");
        let map: BTreeMap<String, String> =
            read_json_or_default(&temp.path().join("missing.json")).expect("default");
        assert!(map.is_empty());
    }

    #[test]
    fn test_read_json_malformed_fails() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("bad.json");
        fs::write(&path, "{ not json").expect("write");
        let result: anyhow::Result<BTreeMap<String, String>> = read_json_or_default(&path);
        assert!(result.is_err());
    }
}
