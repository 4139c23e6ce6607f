//! Markdown resources: commands, rules and skills.
//!
//! Each document may start with a YAML frontmatter block:
//!
//! ```text
//! ---
//! description: Review the current diff
//! globs: ["*.rs"]
//! ---
//! body...
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::fs::write_atomic;
use crate::types::Scope;

/// Skill entry file inside a skill directory.
pub const SKILL_FILE: &str = "SKILL.md";

/// A named markdown resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// File patterns a rule applies to.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub globs: Vec<String>,

    /// Full file content, frontmatter included.
    pub content: String,

    #[serde(skip)]
    pub scope: Scope,
}

pub type Command = Document;
pub type Rule = Document;
pub type Skill = Document;

#[derive(Debug, Default, Deserialize)]
struct Frontmatter {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    globs: Option<Globs>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Globs {
    One(String),
    Many(Vec<String>),
}

impl Document {
    /// Build a document from raw file content.
    pub fn parse(name: impl Into<String>, content: impl Into<String>) -> anyhow::Result<Self> {
        let name = name.into();
        let content = content.into();
        let front = match split_frontmatter(&content) {
            Some((yaml, _)) if !yaml.trim().is_empty() => {
                match serde_yaml::from_str::<Option<Frontmatter>>(yaml) {
                    Ok(front) => front.unwrap_or_default(),
                    Err(e) => {
                        // tool dialects write unquoted globs such as `*.rs`
                        debug!(document = %name, error = %e, "Falling back to line frontmatter");
                        parse_frontmatter_lines(yaml)
                    }
                }
            }
            _ => Frontmatter::default(),
        };
        let globs = match front.globs {
            Some(Globs::One(glob)) => glob
                .split(',')
                .map(|g| g.trim().to_string())
                .filter(|g| !g.is_empty())
                .collect(),
            Some(Globs::Many(globs)) => globs,
            None => Vec::new(),
        };
        Ok(Self {
            name,
            description: front.description,
            globs,
            content,
            scope: Scope::default(),
        })
    }

    /// Content without the frontmatter block.
    pub fn body(&self) -> &str {
        split_frontmatter(&self.content)
            .map(|(_, body)| body)
            .unwrap_or(&self.content)
    }
}

/// `key: value` scan for headers that are not valid YAML.
fn parse_frontmatter_lines(yaml: &str) -> Frontmatter {
    let mut front = Frontmatter::default();
    for line in yaml.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim().trim_matches('"').trim_matches('\'');
        if value.is_empty() {
            continue;
        }
        match key.trim() {
            "description" => front.description = Some(value.to_string()),
            "globs" => front.globs = Some(Globs::One(value.to_string())),
            _ => {}
        }
    }
    front
}

/// Split `---\n<yaml>\n---\n<body>` into its parts.
fn split_frontmatter(content: &str) -> Option<(&str, &str)> {
    let rest = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))?;
    let (yaml, after) = match rest.strip_prefix("---") {
        Some(after) => ("", after),
        None => {
            let end = rest.find("\n---")?;
            (&rest[..end], &rest[end + 4..])
        }
    };
    let body = after
        .strip_prefix("\r\n")
        .or_else(|| after.strip_prefix('\n'))
        .unwrap_or(after);
    Some((yaml, body))
}

/// Load `<dir>/*.<ext>` files as documents keyed by file stem.
pub fn load_markdown_dir(dir: &Path, ext: &str) -> anyhow::Result<BTreeMap<String, Document>> {
    let mut docs = BTreeMap::new();
    if !dir.is_dir() {
        return Ok(docs);
    }
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(ext) {
            continue;
        }
        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        docs.insert(name.to_string(), Document::parse(name, content)?);
    }
    Ok(docs)
}

/// Load `<dir>/<name>/SKILL.md` skill directories.
pub fn load_skill_dir(dir: &Path) -> anyhow::Result<BTreeMap<String, Document>> {
    let mut docs = BTreeMap::new();
    if !dir.is_dir() {
        return Ok(docs);
    }
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        let skill_file = path.join(SKILL_FILE);
        if !skill_file.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|s| s.to_str()) else {
            continue;
        };
        let content = std::fs::read_to_string(&skill_file)
            .with_context(|| format!("Failed to read skill: {}", skill_file.display()))?;
        docs.insert(name.to_string(), Document::parse(name, content)?);
    }
    Ok(docs)
}

/// Write documents as `<dir>/<name>.<ext>`, removing `stale` names.
pub fn write_markdown_dir(
    dir: &Path,
    ext: &str,
    docs: &[Document],
    stale: &[String],
) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    for doc in docs {
        let path = doc_path(dir, &doc.name, ext);
        write_atomic(&path, doc.content.as_bytes())
            .with_context(|| format!("Failed to write file: {}", path.display()))?;
    }
    for name in stale {
        let path = doc_path(dir, name, ext);
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove file: {}", path.display()))?;
        }
    }
    Ok(())
}

/// Write skills as `<dir>/<name>/SKILL.md`, removing `stale` skill directories.
pub fn write_skill_dir(dir: &Path, docs: &[Document], stale: &[String]) -> anyhow::Result<()> {
    for doc in docs {
        let skill_dir = dir.join(&doc.name);
        std::fs::create_dir_all(&skill_dir)
            .with_context(|| format!("Failed to create directory: {}", skill_dir.display()))?;
        let path = skill_dir.join(SKILL_FILE);
        write_atomic(&path, doc.content.as_bytes())
            .with_context(|| format!("Failed to write skill: {}", path.display()))?;
    }
    for name in stale {
        let skill_dir = dir.join(name);
        if skill_dir.is_dir() {
            std::fs::remove_dir_all(&skill_dir).with_context(|| {
                format!("Failed to remove skill directory: {}", skill_dir.display())
            })?;
        }
    }
    Ok(())
}

fn doc_path(dir: &Path, name: &str, ext: &str) -> PathBuf {
    dir.join(format!("{}.{}", name, ext))
}
