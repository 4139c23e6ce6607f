//! Servers subtree inside a foreign config file.
//!
//! Reads and rewrites the map at a fixed key path (e.g. `mcpServers`) while
//! leaving every other key of the document untouched.

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::Context;
use serde_json::{Map, Value};

use super::format::FileFormat;
use crate::config::Server;

/// Translate a canonical server into the tool's entry.
pub type EncodeFn = fn(&Server) -> Value;

/// Translate a tool entry back into a canonical server. Never fails: entries
/// the codec does not understand still yield a named server.
pub type DecodeFn = fn(&str, &Value) -> Server;

/// Top-level keys written when the file is created.
pub type SkeletonFn = fn() -> Map<String, Value>;

/// One servers map inside one config file.
#[derive(Debug, Clone)]
pub struct ServersFile {
    pub path: PathBuf,
    pub format: FileFormat,
    pub key_path: &'static [&'static str],
    pub encode: EncodeFn,
    pub decode: DecodeFn,
    pub skeleton: SkeletonFn,
}

impl ServersFile {
    pub fn json(
        path: PathBuf,
        key_path: &'static [&'static str],
        encode: EncodeFn,
        decode: DecodeFn,
    ) -> Self {
        Self {
            path,
            format: FileFormat::Json,
            key_path,
            encode,
            decode,
            skeleton: Map::new,
        }
    }

    pub fn with_format(mut self, format: FileFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_skeleton(mut self, skeleton: SkeletonFn) -> Self {
        self.skeleton = skeleton;
        self
    }

    /// Raw entries at the key path.
    pub fn read_entries(&self) -> anyhow::Result<Map<String, Value>> {
        let root = self.format.load(&self.path)?;
        extract_map_at_path(&root, self.key_path)
            .with_context(|| format!("Invalid servers section in {}", self.path.display()))
    }

    pub fn read_servers(&self) -> anyhow::Result<Vec<Server>> {
        Ok(self
            .read_entries()?
            .iter()
            .map(|(name, value)| (self.decode)(name, value))
            .collect())
    }

    /// Rewrite the servers map: entries in `keep` are carried over verbatim,
    /// then every desired server is encoded under its key.
    pub fn write_servers(&self, servers: &[Server], keep: &BTreeSet<String>) -> anyhow::Result<()> {
        let mut root = if self.path.exists() {
            self.format.load(&self.path)?
        } else {
            (self.skeleton)()
        };
        let existing = extract_map_at_path(&root, self.key_path)
            .with_context(|| format!("Invalid servers section in {}", self.path.display()))?;

        let mut entries = Map::new();
        for (name, value) in &existing {
            if keep.contains(name) {
                entries.insert(name.clone(), value.clone());
            }
        }
        for server in servers {
            entries.insert(server.key().to_string(), (self.encode)(server));
        }

        set_map_at_path(&mut root, self.key_path, entries)?;
        self.format.save(&self.path, &root)
    }
}

pub fn extract_map_at_path(
    root: &Map<String, Value>,
    path: &[&str],
) -> anyhow::Result<Map<String, Value>> {
    if path.is_empty() {
        anyhow::bail!("Path for managed entries cannot be empty");
    }
    let mut current = root;
    for (idx, segment) in path.iter().enumerate() {
        let value = match current.get(*segment) {
            Some(value) => value,
            None => return Ok(Map::new()),
        };
        match value {
            Value::Object(map) if idx == path.len() - 1 => return Ok(map.clone()),
            Value::Object(map) => current = map,
            Value::Null => return Ok(Map::new()),
            _ => anyhow::bail!("Expected '{}' to be an object", segment),
        }
    }
    Ok(Map::new())
}

pub fn set_map_at_path(
    root: &mut Map<String, Value>,
    path: &[&str],
    map: Map<String, Value>,
) -> anyhow::Result<()> {
    let Some((last, parents)) = path.split_last() else {
        anyhow::bail!("Path for managed entries cannot be empty");
    };
    let mut current = root;
    for segment in parents {
        let next = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if next.is_null() {
            *next = Value::Object(Map::new());
        }
        current = match next {
            Value::Object(map) => map,
            _ => anyhow::bail!("Expected '{}' to be an object", segment),
        };
    }
    current.insert(last.to_string(), Value::Object(map));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::codec;
    use serde_json::json;
    use tempfile::TempDir;

    fn file(temp: &TempDir) -> ServersFile {
        ServersFile::json(
            temp.path().join("tool.json"),
            &["mcpServers"],
            codec::encode_plain,
            codec::decode_plain,
        )
    }

    #[test]
    fn test_extract_nested_path() {
        let root = json!({ "a": { "b": { "x": 1 } } });
        let Value::Object(root) = root else {
            unreachable!()
        };
        let map = extract_map_at_path(&root, &["a", "b"]).unwrap();
        assert_eq!(map["x"], 1);
        assert!(extract_map_at_path(&root, &["a", "missing"]).unwrap().is_empty());
        assert!(extract_map_at_path(&root, &["a", "b", "x"]).is_err());
    }

    #[test]
    fn test_set_creates_parents() {
        let mut root = Map::new();
        set_map_at_path(&mut root, &["projects", "/w", "mcpServers"], Map::new()).unwrap();
        assert_eq!(root["projects"]["/w"]["mcpServers"], json!({}));
    }

    #[test]
    fn test_write_preserves_other_keys_and_kept_entries() {
        let temp = TempDir::new().unwrap();
        let file = file(&temp);
        std::fs::write(
            &file.path,
            r#"{
  "theme": "dark",
  "mcpServers": {
    "mine": { "command": "my-tool", "custom": true },
    "stale": { "command": "old" }
  }
}"#,
        )
        .unwrap();

        let keep = BTreeSet::from(["mine".to_string()]);
        file.write_servers(&[Server::stdio("fs", "node", vec![])], &keep)
            .unwrap();

        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(&file.path).unwrap()).unwrap();
        assert_eq!(written["theme"], "dark");
        assert_eq!(written["mcpServers"]["mine"], json!({ "command": "my-tool", "custom": true }));
        assert_eq!(written["mcpServers"]["fs"]["command"], "node");
        assert!(written["mcpServers"].get("stale").is_none());
    }

    #[test]
    fn test_read_servers_decodes_names() {
        let temp = TempDir::new().unwrap();
        let file = file(&temp);
        std::fs::write(&file.path, r#"{ "mcpServers": { "a": { "command": "x" } } }"#).unwrap();

        let servers = file.read_servers().unwrap();
        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].name, "a");
        assert_eq!(servers[0].command.as_deref(), Some("x"));
    }
}
