//! Adapter registry for the built-in tool drivers.

use crate::config::Settings;
use crate::types::ConfigError;

use super::{
    Adapter, AdapterContext, claude_code::ClaudeCodeAdapter,
    claude_desktop::ClaudeDesktopAdapter, codex::CodexAdapter, cursor::CursorAdapter,
    gemini_cli::GeminiCliAdapter, opencode::OpenCodeAdapter, vscode::VsCodeAdapter,
};

/// Registry of available tool adapters.
#[derive(Debug)]
pub struct AdapterRegistry {
    adapters: Vec<Box<dyn Adapter>>,
}

impl AdapterRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            adapters: Vec::new(),
        }
    }

    /// Create a registry with every built-in adapter.
    pub fn with_default_adapters(ctx: &AdapterContext) -> Self {
        let adapters: Vec<Box<dyn Adapter>> = vec![
            Box::new(ClaudeCodeAdapter::new(ctx.clone())),
            Box::new(ClaudeDesktopAdapter::new(ctx.clone())),
            Box::new(CursorAdapter::new(ctx.clone())),
            Box::new(VsCodeAdapter::new(ctx.clone())),
            Box::new(GeminiCliAdapter::new(ctx.clone())),
            Box::new(OpenCodeAdapter::new(ctx.clone())),
            Box::new(CodexAdapter::new(ctx.clone())),
        ];
        Self { adapters }
    }

    /// Register an adapter.
    pub fn register(&mut self, adapter: Box<dyn Adapter>) {
        self.adapters.push(adapter);
    }

    pub fn all(&self) -> Vec<&dyn Adapter> {
        self.adapters.iter().map(|a| a.as_ref()).collect()
    }

    /// Adapters whose tool is installed.
    pub fn detected(&self) -> Vec<&dyn Adapter> {
        self.adapters
            .iter()
            .filter(|a| a.detect())
            .map(|a| a.as_ref())
            .collect()
    }

    /// Get an adapter by tool name.
    pub fn get(&self, name: &str) -> Result<&dyn Adapter, ConfigError> {
        self.adapters
            .iter()
            .find(|a| a.name() == name)
            .map(|a| a.as_ref())
            .ok_or_else(|| ConfigError::UnknownTool(name.to_string()))
    }

    /// Adapters not switched off in `settings`.
    pub fn enabled(&self, settings: &Settings) -> Vec<&dyn Adapter> {
        self.adapters
            .iter()
            .filter(|a| settings.tool_enabled(a.name()))
            .map(|a| a.as_ref())
            .collect()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
