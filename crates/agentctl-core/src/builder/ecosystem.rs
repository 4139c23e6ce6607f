//! Ecosystem detection by marker file.

use std::fmt;
use std::path::Path;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    Node,
    Python,
    Requirements,
    Rust,
    Go,
}

/// One shell-free step: program plus arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub program: &'static str,
    pub args: Vec<String>,
}

impl Step {
    fn new(program: &'static str, args: &[&str]) -> Self {
        Self {
            program,
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Marker files in probe order. First match wins.
pub const MARKERS: &[(&str, Ecosystem)] = &[
    ("package.json", Ecosystem::Node),
    ("pyproject.toml", Ecosystem::Python),
    ("requirements.txt", Ecosystem::Requirements),
    ("Cargo.toml", Ecosystem::Rust),
    ("go.mod", Ecosystem::Go),
];

impl Ecosystem {
    pub fn detect(dir: &Path) -> Option<Self> {
        MARKERS
            .iter()
            .find(|(marker, _)| dir.join(marker).is_file())
            .map(|(_, ecosystem)| *ecosystem)
    }

    pub fn marker(self) -> &'static str {
        MARKERS
            .iter()
            .find(|(_, ecosystem)| *ecosystem == self)
            .map(|(marker, _)| *marker)
            .unwrap_or_default()
    }

    pub fn install_step(self) -> Step {
        match self {
            Ecosystem::Node => Step::new("npm", &["install"]),
            Ecosystem::Python => Step::new("pip", &["install", "-e", "."]),
            Ecosystem::Requirements => Step::new("pip", &["install", "-r", "requirements.txt"]),
            Ecosystem::Rust => Step::new("cargo", &["build", "--release"]),
            Ecosystem::Go => Step::new("go", &["mod", "download"]),
        }
    }

    /// Build step, when the project declares one.
    pub fn build_step(self, dir: &Path, name: &str) -> Option<Step> {
        match self {
            Ecosystem::Node => has_build_script(dir).then(|| Step::new("npm", &["run", "build"])),
            Ecosystem::Go => Some(Step::new("go", &["build", "-o", name, "."])),
            Ecosystem::Python | Ecosystem::Requirements | Ecosystem::Rust => None,
        }
    }
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Ecosystem::Node => "node",
            Ecosystem::Python => "python",
            Ecosystem::Requirements => "requirements",
            Ecosystem::Rust => "rust",
            Ecosystem::Go => "go",
        };
        f.write_str(name)
    }
}

fn has_build_script(dir: &Path) -> bool {
    std::fs::read_to_string(dir.join("package.json"))
        .ok()
        .and_then(|text| serde_json::from_str::<serde_json::Value>(&text).ok())
        .is_some_and(|pkg| pkg.pointer("/scripts/build").is_some())
}
