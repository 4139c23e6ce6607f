use std::collections::BTreeMap;
use std::fs;

use tempfile::TempDir;

use agentctl_core::config::{Config, Profile, Server, Source};
use agentctl_core::context::AppContext;
use agentctl_core::types::{ConfigError, Scope, Transport};

fn context(temp: &TempDir) -> AppContext {
    let project = temp.path().join("project");
    fs::create_dir_all(project.join("src")).unwrap();
    AppContext::under(temp.path(), project.join("src"))
}

#[test]
fn save_then_load_roundtrip() {
    let temp = TempDir::new().unwrap();
    let store = context(&temp).config_store();

    let mut stdio = Server::stdio(
        "filesystem",
        "npx",
        vec!["-y".to_string(), "@mcp/filesystem".to_string()],
    );
    stdio.env.insert("ROOT".to_string(), "/srv".to_string());
    let mut http = Server::http("search", "https://mcp.example.com/api");
    http.headers
        .insert("Authorization".to_string(), "Bearer x".to_string());

    let mut config = Config::new();
    config.insert_server(stdio.clone());
    config.insert_server(http.clone());
    store.save(&config).unwrap();

    let loaded = store.load().unwrap();
    let fs_server = loaded.server("filesystem").unwrap();
    assert_eq!(fs_server.transport, Transport::Stdio);
    assert_eq!(fs_server.command, stdio.command);
    assert_eq!(fs_server.args, stdio.args);
    assert_eq!(fs_server.env, stdio.env);
    assert_eq!(fs_server.scope, Scope::Global);

    let search = loaded.server("search").unwrap();
    assert_eq!(search.transport, Transport::Http);
    assert_eq!(search.url, http.url);
    assert_eq!(search.headers, http.headers);
    assert_eq!(search.source, http.source);
}

#[test]
fn local_scope_requires_project_marker() {
    let temp = TempDir::new().unwrap();
    let store = context(&temp).config_store();

    let err = store
        .add_server(Scope::Local, Server::stdio("a", "node", vec![]), false)
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::NoProject { .. })
    ));

    let err = store
        .add_server(Scope::All, Server::stdio("a", "node", vec![]), false)
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::AllScopeWrite)
    ));
}

#[test]
fn project_overrides_and_disables_global() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp);
    let store = ctx.config_store();

    store
        .add_server(Scope::Global, Server::stdio("shared", "node", vec![]), false)
        .unwrap();
    store
        .add_server(Scope::Global, Server::stdio("hidden", "node", vec![]), false)
        .unwrap();

    store.init_project(&temp.path().join("project")).unwrap();
    store
        .add_server(Scope::Local, Server::stdio("shared", "bun", vec![]), false)
        .unwrap();
    let mut local = store.load_scoped(Scope::Local).unwrap();
    local.disabled.push("hidden".to_string());
    store.save_scoped(Scope::Local, &local).unwrap();

    let all = store.servers_for_scope(Scope::All).unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].name, "shared");
    assert_eq!(all[0].command.as_deref(), Some("bun"));
    assert_eq!(all[0].scope, Scope::Local);

    assert!(store.servers_for_scope(Scope::Global).unwrap().is_empty());
}

#[test]
fn default_profile_applies_to_active_servers() {
    let temp = TempDir::new().unwrap();
    let store = context(&temp).config_store();

    let mut config = Config::new();
    config.insert_server(Server::stdio("base", "node", vec![]));
    let mut off = Server::stdio("off", "node", vec![]);
    off.disabled = true;
    config.insert_server(off);
    config.profiles.insert(
        "work".to_string(),
        Profile {
            servers: BTreeMap::from([(
                "jira".to_string(),
                Server::stdio("jira", "npx", vec![]).with_source(Source::default()),
            )]),
            disabled: Vec::new(),
        },
    );
    config.settings.default_profile = Some("work".to_string());
    store.save(&config).unwrap();

    let names: Vec<String> = store
        .active_servers(None)
        .unwrap()
        .into_iter()
        .map(|s| s.name)
        .collect();
    assert_eq!(names, vec!["base", "jira"]);

    let err = store.active_servers(Some("missing")).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::UnknownProfile(_))
    ));
}

#[test]
fn invalid_json_reports_location() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp);
    let path = ctx.global_dir().join("config.json");
    fs::create_dir_all(ctx.global_dir()).unwrap();
    fs::write(&path, "{\n  \"servers\": {\n    \"a\": { \"command\": }\n  }\n}\n").unwrap();

    let err = ctx.config_store().load().unwrap_err();
    let message = format!("{:#}", err);
    assert!(message.contains("line 3"), "{message}");
}
