//! JSON config parser with helpful error messages

use super::schema::Config;
use anyhow::{Context, Result};
use std::path::Path;

/// Parse a config file with detailed error messages
pub fn parse_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse config content from string. Blank content is an empty config.
pub fn parse_config_str(content: &str) -> Result<Config> {
    if content.trim().is_empty() {
        return Ok(Config::new());
    }
    serde_json::from_str(content).map_err(|e| enhance_json_error(e, content))
}

/// Serialize a config to pretty JSON with a trailing newline
pub fn to_json(config: &Config) -> Result<String> {
    let mut out =
        serde_json::to_string_pretty(config).context("Failed to serialize configuration")?;
    out.push('\n');
    Ok(out)
}

fn enhance_json_error(error: serde_json::Error, content: &str) -> anyhow::Error {
    let line_num = error.line();
    if line_num == 0 {
        return anyhow::anyhow!("JSON parsing error: {}", error);
    }
    anyhow::anyhow!(
        "JSON parsing error at line {}, column {}:\n{}\n\nError: {}",
        line_num,
        error.column(),
        get_line_context(content, line_num),
        error
    )
}

/// Get context lines around an error
fn get_line_context(content: &str, line_num: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let start = line_num.saturating_sub(2);
    let end = (line_num + 1).min(lines.len());

    lines[start.min(end)..end]
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let num = start + i + 1;
            let marker = if num == line_num { ">>>" } else { "   " };
            format!("{} {:4} | {}", marker, num, line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Transport;

    #[test]
    fn test_parse_valid_config() {
        let json = r#"{
  "servers": {
    "github": { "command": "npx", "args": ["-y", "@modelcontextprotocol/server-github"] },
    "docs": { "transport": "http", "url": "https://docs.example.com/mcp" }
  },
  "settings": { "tools": { "cursor": false } }
}"#;
        let config = parse_config_str(json).unwrap();
        assert_eq!(config.servers.len(), 2);
        assert_eq!(config.servers["docs"].transport, Transport::Http);
        assert!(!config.settings.tool_enabled("cursor"));
    }

    #[test]
    fn test_parse_empty_config() {
        let config = parse_config_str("  \n").unwrap();
        assert!(config.servers.is_empty());
    }

    #[test]
    fn test_parse_error_has_line_context() {
        let json = "{\n  \"servers\": {\n    \"a\": { \"command\": }\n  }\n}";
        let err = parse_config_str(json).unwrap_err().to_string();
        assert!(err.contains("line 3"), "unexpected message: {}", err);
        assert!(err.contains(">>>"));
    }

    #[test]
    fn test_to_json_skips_empty_fields() {
        let mut config = Config::new();
        config.insert_server(crate::config::Server::stdio("fs", "node", vec![]));
        let json = to_json(&config).unwrap();
        assert!(json.ends_with('\n'));
        assert!(!json.contains("profiles"));
        assert!(!json.contains("\"name\""));
    }
}
