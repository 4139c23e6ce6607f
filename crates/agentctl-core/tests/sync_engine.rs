use std::fs;
use std::path::Path;

use serde_json::{Value, json};
use tempfile::TempDir;

use agentctl_core::config::{Config, Document, Server, Source};
use agentctl_core::context::AppContext;
use agentctl_core::sync::{SyncEngine, SyncOptions, TargetKind};
use agentctl_core::types::{ResourceKind, Scope};

struct Fixture {
    temp: TempDir,
    ctx: AppContext,
}

impl Fixture {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let project = temp.path().join("project");
        fs::create_dir_all(&project).unwrap();
        let ctx = AppContext::under(temp.path(), project);
        fs::create_dir_all(ctx.home_dir().join(".claude")).unwrap();
        Self { temp, ctx }
    }

    fn project(&self) -> std::path::PathBuf {
        self.temp.path().join("project")
    }

    fn claude_json(&self) -> std::path::PathBuf {
        self.ctx.home_dir().join(".claude.json")
    }

    fn sync(&self, options: SyncOptions) -> agentctl_core::sync::SyncReport {
        let store = self.ctx.config_store();
        let registry = self.ctx.registry();
        SyncEngine::new(&store, &registry).sync(&options).unwrap()
    }
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

fn claude_only() -> SyncOptions {
    SyncOptions {
        tools: vec!["claude-code".to_string()],
        ..SyncOptions::all()
    }
}

#[test]
fn sync_preserves_unrelated_keys_and_unmanaged_entries() {
    let fx = Fixture::new();
    fs::write(
        fx.claude_json(),
        serde_json::to_string_pretty(&json!({
            "theme": "dark",
            "mcpServers": {
                "mine": { "type": "stdio", "command": "my-server" }
            }
        }))
        .unwrap(),
    )
    .unwrap();

    let store = fx.ctx.config_store();
    store
        .add_server(
            Scope::Global,
            Server::stdio("github", "npx", vec!["-y".to_string(), "gh-mcp".to_string()]),
            false,
        )
        .unwrap();

    let report = fx.sync(claude_only());
    assert!(!report.has_failures());

    let written = read_json(&fx.claude_json());
    assert_eq!(written["theme"], "dark");
    assert_eq!(written["mcpServers"]["mine"]["command"], "my-server");
    assert_eq!(written["mcpServers"]["github"]["command"], "npx");

    let result = report
        .results_for("claude-code")
        .find(|r| r.kind == ResourceKind::Servers && r.target == TargetKind::Global)
        .unwrap();
    assert!(result.diff.to_add.contains("github"));
    assert!(result.diff.unmanaged.contains("mine"));
}

#[test]
fn clean_removes_only_managed_entries() {
    let fx = Fixture::new();
    fs::write(
        fx.claude_json(),
        r#"{ "mcpServers": { "mine": { "command": "my-server" } } }"#,
    )
    .unwrap();
    let store = fx.ctx.config_store();
    store
        .add_server(Scope::Global, Server::stdio("old", "node", vec![]), false)
        .unwrap();
    fx.sync(claude_only());

    store.remove_server(Scope::Global, "old").unwrap();

    let report = fx.sync(claude_only());
    let result = report.results_for("claude-code").next().unwrap();
    assert!(result.diff.to_remove.contains("old"));
    assert!(read_json(&fx.claude_json())["mcpServers"].get("old").is_some());

    let report = fx.sync(SyncOptions {
        clean: true,
        ..claude_only()
    });
    assert!(!report.has_failures());
    let servers = read_json(&fx.claude_json())["mcpServers"].clone();
    assert!(servers.get("old").is_none());
    assert!(servers.get("mine").is_some());

    let ledger = fx.ctx.ledger().unwrap();
    assert!(ledger.get("claude-code").is_empty());
}

#[test]
fn dry_run_writes_nothing() {
    let fx = Fixture::new();
    fx.ctx
        .config_store()
        .add_server(Scope::Global, Server::stdio("github", "npx", vec![]), false)
        .unwrap();

    let report = fx.sync(SyncOptions {
        dry_run: true,
        ..claude_only()
    });

    assert!(report.dry_run);
    let result = report.results_for("claude-code").next().unwrap();
    assert!(result.diff.to_add.contains("github"));
    assert!(!fx.claude_json().exists());
    assert!(!fx.ctx.global_dir().join("managed.json").exists());
}

#[test]
fn second_sync_is_stable() {
    let fx = Fixture::new();
    fx.ctx
        .config_store()
        .add_server(Scope::Global, Server::stdio("github", "npx", vec![]), false)
        .unwrap();

    fx.sync(claude_only());
    let first = fs::read_to_string(fx.claude_json()).unwrap();
    let report = fx.sync(claude_only());
    let second = fs::read_to_string(fx.claude_json()).unwrap();

    assert_eq!(first, second);
    let result = report.results_for("claude-code").next().unwrap();
    assert!(result.diff.to_add.is_empty());
    assert!(result.diff.to_update.contains("github"));
}

#[test]
fn local_servers_go_to_workspace_file() {
    let fx = Fixture::new();
    let store = fx.ctx.config_store();
    store.init_project(&fx.project()).unwrap();
    store
        .add_server(Scope::Global, Server::stdio("global-one", "node", vec![]), false)
        .unwrap();
    store
        .add_server(
            Scope::Local,
            Server::stdio("project-one", "node", vec![]).with_source(Source::local("./srv")),
            false,
        )
        .unwrap();

    let report = fx.sync(claude_only());
    assert!(!report.has_failures());

    let global = read_json(&fx.claude_json());
    assert!(global["mcpServers"].get("global-one").is_some());
    assert!(global["mcpServers"].get("project-one").is_none());

    let workspace = read_json(&fx.project().join(".mcp.json"));
    assert!(workspace["mcpServers"].get("project-one").is_some());
}

#[test]
fn local_servers_fold_into_global_without_workspace_support() {
    let fx = Fixture::new();
    let store = fx.ctx.config_store();
    store.init_project(&fx.project()).unwrap();
    store
        .add_server(Scope::Local, Server::stdio("project-one", "node", vec![]), false)
        .unwrap();

    let report = fx.sync(SyncOptions {
        tools: vec!["claude-desktop".to_string()],
        ..SyncOptions::all()
    });

    let result = report.results_for("claude-desktop").next().unwrap();
    assert!(result.is_ok());
    assert!(result.diff.to_add.contains("project-one"));
    assert!(!result.warnings.is_empty());
}

#[test]
fn remote_servers_skipped_for_stdio_only_tools() {
    let fx = Fixture::new();
    fx.ctx
        .config_store()
        .add_server(
            Scope::Global,
            Server::http("docs", "https://mcp.example.com/api"),
            false,
        )
        .unwrap();

    let report = fx.sync(SyncOptions {
        tools: vec!["claude-desktop".to_string()],
        ..SyncOptions::all()
    });
    let result = report.results_for("claude-desktop").next().unwrap();
    assert!(result.diff.to_add.is_empty());
    assert!(result.warnings.iter().any(|w| w.contains("docs")));
}

#[test]
fn disabled_tool_is_skipped_and_unknown_tool_fails() {
    let fx = Fixture::new();
    let store = fx.ctx.config_store();
    let mut config = Config::new();
    config.settings.tools.insert("claude-code".to_string(), false);
    store.save(&config).unwrap();

    let report = fx.sync(claude_only());
    assert_eq!(report.skipped_count(), 1);
    assert!(report.results.is_empty());

    let registry = fx.ctx.registry();
    let err = SyncEngine::new(&store, &registry)
        .sync(&SyncOptions {
            tools: vec!["notepad".to_string()],
            ..SyncOptions::all()
        })
        .unwrap_err();
    assert!(err.to_string().contains("notepad"));
}

#[test]
fn commands_are_written_to_tool_directory() {
    let fx = Fixture::new();
    let store = fx.ctx.config_store();
    let doc = Document::parse("review", "---\ndescription: Review a diff\n---\nReview $ARGUMENTS\n")
        .unwrap();
    store
        .add_document(Scope::Global, ResourceKind::Commands, &doc)
        .unwrap();

    let report = fx.sync(SyncOptions {
        project_dir: None,
        ..claude_only()
    });
    assert!(!report.has_failures());

    let written = fx.ctx.home_dir().join(".claude/commands/review.md");
    let content = fs::read_to_string(written).unwrap();
    assert!(content.contains("Review $ARGUMENTS"));
}

fn seed_both_scopes(fx: &Fixture) {
    let store = fx.ctx.config_store();
    store.init_project(&fx.project()).unwrap();
    store
        .add_server(Scope::Global, Server::stdio("g", "g-cmd", vec![]), false)
        .unwrap();
    store
        .add_server(Scope::Local, Server::stdio("l", "l-cmd", vec![]), false)
        .unwrap();
    let report = fx.sync(claude_only());
    assert!(!report.has_failures());
}

#[test]
fn local_scoped_clean_sync_leaves_global_entries() {
    let fx = Fixture::new();
    seed_both_scopes(&fx);

    let report = fx.sync(SyncOptions {
        scope: Scope::Local,
        clean: true,
        ..claude_only()
    });
    assert!(!report.has_failures());
    assert!(
        report
            .results_for("claude-code")
            .all(|r| r.target == TargetKind::Workspace)
    );

    let global = read_json(&fx.claude_json());
    assert_eq!(global["mcpServers"]["g"]["command"], "g-cmd");
    let workspace = read_json(&fx.project().join(".mcp.json"));
    assert_eq!(workspace["mcpServers"]["l"]["command"], "l-cmd");
    assert!(fx.ctx.ledger().unwrap().get("claude-code").contains("g"));
}

#[test]
fn global_scoped_clean_sync_leaves_workspace_entries() {
    let fx = Fixture::new();
    seed_both_scopes(&fx);

    let report = fx.sync(SyncOptions {
        scope: Scope::Global,
        clean: true,
        ..claude_only()
    });
    assert!(!report.has_failures());
    assert!(
        report
            .results_for("claude-code")
            .all(|r| r.target == TargetKind::Global)
    );

    let workspace = read_json(&fx.project().join(".mcp.json"));
    assert_eq!(workspace["mcpServers"]["l"]["command"], "l-cmd");
    assert_eq!(read_json(&fx.claude_json())["mcpServers"]["g"]["command"], "g-cmd");
}

#[test]
fn scoped_dry_run_reports_no_removals() {
    let fx = Fixture::new();
    seed_both_scopes(&fx);

    for scope in [Scope::Local, Scope::Global] {
        let report = fx.sync(SyncOptions {
            scope,
            dry_run: true,
            clean: true,
            ..claude_only()
        });
        for result in report.results_for("claude-code") {
            assert!(
                result.diff.to_remove.is_empty(),
                "{:?} scope reported removals in {:?}: {:?}",
                scope,
                result.target,
                result.diff.to_remove
            );
        }
    }
}

#[test]
fn scoped_sync_without_workspace_retains_other_scope() {
    let fx = Fixture::new();
    let store = fx.ctx.config_store();
    store.init_project(&fx.project()).unwrap();
    store
        .add_server(Scope::Global, Server::stdio("g", "g-cmd", vec![]), false)
        .unwrap();
    store
        .add_server(Scope::Local, Server::stdio("l", "l-cmd", vec![]), false)
        .unwrap();
    let desktop_only = SyncOptions {
        tools: vec!["claude-desktop".to_string()],
        ..SyncOptions::all()
    };
    fx.sync(desktop_only.clone());

    let report = fx.sync(SyncOptions {
        scope: Scope::Local,
        clean: true,
        ..desktop_only
    });
    let result = report.results_for("claude-desktop").next().unwrap();
    assert!(result.diff.to_remove.is_empty());
    assert!(result.diff.retained.contains("g"));

    let registry = fx.ctx.registry();
    let path = registry.get("claude-desktop").unwrap().config_path();
    let written = read_json(&path);
    assert_eq!(written["mcpServers"]["g"]["command"], "g-cmd");
    assert_eq!(written["mcpServers"]["l"]["command"], "l-cmd");
}
