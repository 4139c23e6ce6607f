//! Config path resolution helpers.

use std::path::{Path, PathBuf};

use crate::types::{ConfigError, Scope};

/// Global config file name inside the global config directory.
pub const CONFIG_FILE: &str = "config.json";

/// Project marker file. Its presence makes a directory a project root.
pub const PROJECT_MARKER: &str = ".agentctl.json";

/// Per-project resource root holding commands, rules and skills.
pub const PROJECT_RESOURCE_DIR: &str = ".agentctl";

pub const COMMANDS_DIR: &str = "commands";
pub const RULES_DIR: &str = "rules";
pub const SKILLS_DIR: &str = "skills";

/// Walk upward from `start` to the nearest directory holding a project marker.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(PROJECT_MARKER).is_file())
        .map(Path::to_path_buf)
}

/// Like [`find_project_root`], failing with [`ConfigError::NoProject`].
pub fn require_project_root(start: &Path) -> Result<PathBuf, ConfigError> {
    find_project_root(start).ok_or_else(|| ConfigError::NoProject {
        start: start.to_path_buf(),
    })
}

/// Config file for a concrete scope.
pub fn config_path_for_scope(scope: Scope, global_dir: &Path, project_root: &Path) -> PathBuf {
    match scope {
        Scope::Local => project_root.join(PROJECT_MARKER),
        Scope::Global | Scope::All => global_dir.join(CONFIG_FILE),
    }
}

/// Directory holding `commands/`, `rules/` and `skills/` for a concrete scope.
pub fn resource_root_for_scope(scope: Scope, global_dir: &Path, project_root: &Path) -> PathBuf {
    match scope {
        Scope::Local => project_root.join(PROJECT_RESOURCE_DIR),
        Scope::Global | Scope::All => global_dir.to_path_buf(),
    }
}
