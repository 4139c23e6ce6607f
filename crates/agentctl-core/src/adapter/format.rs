//! On-disk formats for tool config files.
//!
//! Both formats are handled as a JSON object map so that path extraction and
//! entry preservation are shared.

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{Map, Value};

use crate::fs::write_atomic;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Toml,
}

impl FileFormat {
    /// Load the file's root object. A missing or blank file is empty.
    pub fn load(self, path: &Path) -> Result<Map<String, Value>> {
        if !path.exists() {
            return Ok(Map::new());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        match self {
            FileFormat::Json => {
                let value: Value = serde_json::from_str(&content)
                    .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?;
                match value {
                    Value::Object(map) => Ok(map),
                    _ => anyhow::bail!("Expected JSON object at root: {}", path.display()),
                }
            }
            FileFormat::Toml => {
                let value: toml::Value = toml::from_str(&content)
                    .with_context(|| format!("Failed to parse TOML config: {}", path.display()))?;
                match toml_to_json(value) {
                    Value::Object(map) => Ok(map),
                    _ => anyhow::bail!("Expected TOML table at root: {}", path.display()),
                }
            }
        }
    }

    pub fn save(self, path: &Path, map: &Map<String, Value>) -> Result<()> {
        let content = match self {
            FileFormat::Json => {
                let mut out =
                    serde_json::to_string_pretty(map).context("Failed to serialize JSON config")?;
                out.push('\n');
                out
            }
            FileFormat::Toml => {
                let value = json_to_toml(&Value::Object(map.clone()))?
                    .ok_or_else(|| anyhow::anyhow!("Config root cannot be empty"))?;
                toml::to_string_pretty(&value).context("Failed to serialize TOML config")?
            }
        };
        write_atomic(path, content.as_bytes())
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }
}

fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(f.to_string())),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(key, value)| (key, toml_to_json(value)))
                .collect(),
        ),
    }
}

/// TOML has no null; null values and null-only members are dropped.
fn json_to_toml(value: &Value) -> Result<Option<toml::Value>> {
    Ok(Some(match value {
        Value::Null => return Ok(None),
        Value::Bool(b) => toml::Value::Boolean(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                toml::Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                toml::Value::Float(f)
            } else {
                anyhow::bail!("Unsupported number type: {}", n)
            }
        }
        Value::String(s) => toml::Value::String(s.clone()),
        Value::Array(arr) => {
            let mut items = Vec::with_capacity(arr.len());
            for item in arr {
                if let Some(item) = json_to_toml(item)? {
                    items.push(item);
                }
            }
            toml::Value::Array(items)
        }
        Value::Object(obj) => {
            let mut table = toml::map::Map::new();
            for (key, value) in obj {
                if let Some(value) = json_to_toml(value)? {
                    table.insert(key.clone(), value);
                }
            }
            toml::Value::Table(table)
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let map = FileFormat::Json.load(&temp.path().join("nope.json")).unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn test_json_root_must_be_object() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("list.json");
        std::fs::write(&path, "[1, 2]").unwrap();
        assert!(FileFormat::Json.load(&path).is_err());
    }

    #[test]
    fn test_toml_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        let map = json!({
            "model": "o3",
            "mcp_servers": { "fs": { "command": "node", "args": ["a.js"], "skip": null } }
        });
        let Value::Object(map) = map else {
            unreachable!()
        };

        FileFormat::Toml.save(&path, &map).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("[mcp_servers.fs]"));

        let loaded = FileFormat::Toml.load(&path).unwrap();
        assert_eq!(loaded["model"], "o3");
        assert_eq!(loaded["mcp_servers"]["fs"]["args"], json!(["a.js"]));
        assert!(loaded["mcp_servers"]["fs"].get("skip").is_none());
    }
}
