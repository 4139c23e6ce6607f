//! Reconciliation of the effective config into every tool's files.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::diff::{Diff, compute_diff};
use crate::adapter::{Adapter, AdapterRegistry};
use crate::config::{ConfigStore, Document, LedgerStore, ManagedLedger, Server, active_servers};
use crate::types::{ResourceKind, Scope};

/// Knobs for one sync run.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Compute and report the diff without writing anything.
    pub dry_run: bool,
    /// Delete managed entries that are no longer desired.
    pub clean: bool,
    /// Restrict to resources of this scope. `All` syncs everything.
    pub scope: Scope,
    /// Profile to apply; falls back to `settings.default_profile`.
    pub profile: Option<String>,
    /// Explicit tool names. Empty means every detected tool.
    pub tools: Vec<String>,
    /// Project directory for workspace targets; discovered when unset.
    pub project_dir: Option<PathBuf>,
}

impl SyncOptions {
    pub fn all() -> Self {
        Self {
            scope: Scope::All,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Global,
    Workspace,
}

/// Outcome of reconciling one resource kind into one file or directory.
#[derive(Debug, Clone, Serialize)]
pub struct TargetResult {
    pub tool: String,
    pub kind: ResourceKind,
    pub target: TargetKind,
    pub path: PathBuf,
    pub diff: Diff,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl TargetResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedTool {
    pub tool: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub dry_run: bool,
    pub results: Vec<TargetResult>,
    pub skipped: Vec<SkippedTool>,
    pub succeeded: usize,
    pub failed: usize,
}

impl SyncReport {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    pub fn results_for(&self, tool: &str) -> impl Iterator<Item = &TargetResult> {
        self.results.iter().filter(move |r| r.tool == tool)
    }

    fn record(&mut self, result: TargetResult) {
        if result.is_ok() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.results.push(result);
    }
}

/// Desired resources split by where they are written.
#[derive(Debug)]
struct Partition<T> {
    global: Vec<T>,
    local: Vec<T>,
}

/// Drives a sync across every selected adapter.
#[derive(Debug)]
pub struct SyncEngine<'a> {
    store: &'a ConfigStore,
    registry: &'a AdapterRegistry,
}

impl<'a> SyncEngine<'a> {
    pub fn new(store: &'a ConfigStore, registry: &'a AdapterRegistry) -> Self {
        Self { store, registry }
    }

    /// Reconcile the effective config into every selected tool.
    ///
    /// Configuration errors abort the run. Failures writing a single target
    /// are recorded in the report and the remaining targets continue.
    pub fn sync(&self, options: &SyncOptions) -> anyhow::Result<SyncReport> {
        let config = self.store.load_with_project()?;
        config.validate()?;

        let servers = active_servers(&config, options.profile.as_deref())?;
        let project_dir = options
            .project_dir
            .clone()
            .or_else(|| self.store.project_root());

        let servers = partition(
            servers.into_iter().filter(|s| options.scope.includes(s.scope)),
            |s| s.scope,
        );
        let commands = partition_docs(&config.commands, options.scope);
        let rules = partition_docs(&config.rules, options.scope);
        let skills = partition_docs(&config.skills, options.scope);

        let mut ledger = LedgerStore::load(self.store.global_dir())?;
        let mut report = SyncReport {
            dry_run: options.dry_run,
            ..Default::default()
        };

        for adapter in self.select_adapters(options)? {
            if !config.settings.tool_enabled(adapter.name()) {
                info!(tool = adapter.name(), "Tool disabled in settings; skipping");
                report.skipped.push(SkippedTool {
                    tool: adapter.name().to_string(),
                    reason: "disabled in settings".to_string(),
                });
                continue;
            }

            let mut run = TargetRun {
                adapter,
                options,
                project_dir: project_dir.as_deref(),
                ledger: &mut ledger,
                report: &mut report,
            };
            run.servers(&servers);
            run.documents(ResourceKind::Commands, &commands);
            run.documents(ResourceKind::Rules, &rules);
            run.documents(ResourceKind::Skills, &skills);
        }

        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped_count(),
            dry_run = options.dry_run,
            "Sync finished"
        );
        Ok(report)
    }

    fn select_adapters(&self, options: &SyncOptions) -> anyhow::Result<Vec<&'a dyn Adapter>> {
        let registry: &'a AdapterRegistry = self.registry;
        if options.tools.is_empty() {
            return Ok(registry.detected());
        }
        let mut selected = Vec::new();
        for name in &options.tools {
            selected.push(registry.get(name)?);
        }
        Ok(selected)
    }
}

fn partition<T>(items: impl Iterator<Item = T>, scope: impl Fn(&T) -> Scope) -> Partition<T> {
    let mut parts = Partition {
        global: Vec::new(),
        local: Vec::new(),
    };
    for item in items {
        match scope(&item) {
            Scope::Local => parts.local.push(item),
            Scope::Global | Scope::All => parts.global.push(item),
        }
    }
    parts
}

fn partition_docs(docs: &BTreeMap<String, Document>, scope: Scope) -> Partition<Document> {
    partition(
        docs.values().filter(|d| scope.includes(d.scope)).cloned(),
        |d| d.scope,
    )
}

/// State for reconciling one adapter.
struct TargetRun<'r> {
    adapter: &'r dyn Adapter,
    options: &'r SyncOptions,
    project_dir: Option<&'r Path>,
    ledger: &'r mut LedgerStore,
    report: &'r mut SyncReport,
}

/// One file or directory a resource kind is written to.
struct Target {
    kind: TargetKind,
    resource: ResourceKind,
    path: PathBuf,
    ledger_key: String,
    /// The desired set covers only part of what this target holds.
    partial: bool,
    warnings: Vec<String>,
}

impl TargetRun<'_> {
    fn global_in_scope(&self) -> bool {
        self.options.scope.includes(Scope::Global)
    }

    fn local_in_scope(&self) -> bool {
        self.options.scope.includes(Scope::Local)
    }

    fn servers(&mut self, servers: &Partition<Server>) {
        let adapter = self.adapter;
        let Some(writer) = adapter.as_servers() else {
            return;
        };
        let tool = adapter.name();
        let clean = self.options.clean;

        let (mut global, mut global_warnings) = supported_servers(adapter, &servers.global);
        let (local, local_warnings) = supported_servers(adapter, &servers.local);

        let workspace = adapter.as_workspace().zip(self.project_dir);
        if workspace.is_none() {
            global_warnings.extend(local_warnings.iter().cloned());
            if !local.is_empty() {
                global_warnings.push(format!(
                    "{} has no workspace config for this project; writing {} local server(s) globally",
                    tool,
                    local.len()
                ));
            }
            global.extend(local.iter().cloned());
        }

        // Without a workspace file, global and local servers share one target.
        let run_global = self.global_in_scope() || workspace.is_none();
        if run_global {
            let desired = keyed(global);
            let target = Target {
                kind: TargetKind::Global,
                resource: ResourceKind::Servers,
                path: adapter.config_path(),
                ledger_key: ManagedLedger::key(tool, ResourceKind::Servers, None),
                partial: workspace.is_none() && self.options.scope != Scope::All,
                warnings: global_warnings,
            };
            self.run(
                target,
                desired.keys().cloned().collect(),
                || Ok(names(writer.read_servers()?)),
                |diff| writer.write_servers(&values(&desired), &diff.keep(clean)),
            );
        }

        if let Some((workspace, dir)) = workspace
            && self.local_in_scope()
        {
            let desired = keyed(local);
            let target = Target {
                kind: TargetKind::Workspace,
                resource: ResourceKind::Servers,
                path: workspace.workspace_config_path(dir),
                ledger_key: ManagedLedger::key(tool, ResourceKind::Servers, Some(dir)),
                partial: false,
                warnings: local_warnings,
            };
            self.run(
                target,
                desired.keys().cloned().collect(),
                || Ok(names(workspace.read_workspace_servers(dir)?)),
                |diff| {
                    workspace.write_workspace_servers(dir, &values(&desired), &diff.keep(clean))
                },
            );
        }
    }

    fn documents(&mut self, kind: ResourceKind, docs: &Partition<Document>) {
        let adapter = self.adapter;
        let tool = adapter.name();
        if !adapter.supports(kind) {
            return;
        }
        let clean = self.options.clean;

        // (workspace dir, desired docs, partial, warnings)
        let mut targets: Vec<(Option<&Path>, Vec<Document>, bool, Vec<String>)> = Vec::new();
        match self.project_dir {
            Some(dir) => {
                if self.global_in_scope() {
                    targets.push((None, docs.global.clone(), false, Vec::new()));
                }
                if self.local_in_scope() {
                    targets.push((Some(dir), docs.local.clone(), false, Vec::new()));
                }
            }
            None => {
                let mut warnings = Vec::new();
                if !docs.local.is_empty() {
                    warnings.push(format!(
                        "No project directory; writing {} local {} to the global {} directory",
                        docs.local.len(),
                        kind,
                        tool
                    ));
                }
                let mut all = docs.global.clone();
                all.extend(docs.local.iter().cloned());
                targets.push((None, all, self.options.scope != Scope::All, warnings));
            }
        }

        for (workspace, desired, partial, warnings) in targets {
            let Some(path) = document_dir(adapter, kind, workspace) else {
                continue;
            };
            let desired: BTreeMap<String, Document> =
                desired.into_iter().map(|d| (d.name.clone(), d)).collect();
            let target = Target {
                kind: if workspace.is_some() {
                    TargetKind::Workspace
                } else {
                    TargetKind::Global
                },
                resource: kind,
                path,
                ledger_key: ManagedLedger::key(tool, kind, workspace),
                partial,
                warnings,
            };

            self.run(
                target,
                desired.keys().cloned().collect(),
                || read_documents(adapter, kind, workspace),
                |diff| {
                    // unmanaged files are untouched by the writer; only stale names are passed
                    let stale: Vec<String> = if clean {
                        diff.to_remove.iter().cloned().collect()
                    } else {
                        Vec::new()
                    };
                    write_documents(adapter, kind, workspace, &values(&desired), &stale)
                },
            );
        }
    }

    fn run(
        &mut self,
        target: Target,
        desired: BTreeSet<String>,
        read: impl FnOnce() -> anyhow::Result<BTreeSet<String>>,
        write: impl FnOnce(&Diff) -> anyhow::Result<()>,
    ) {
        let tool = self.adapter.name();
        let Target {
            kind: target_kind,
            resource: kind,
            path,
            ledger_key,
            partial,
            warnings,
        } = target;
        for warning in &warnings {
            warn!(tool, "{}", warning);
        }

        let mut diff = Diff::default();
        let outcome = (|| -> anyhow::Result<()> {
            let current = read()?;
            let managed = self.ledger.get(&ledger_key);
            diff = compute_diff(&desired, &current, &managed);
            if partial {
                diff.retain_removals();
            }
            debug!(
                tool,
                kind = %kind,
                path = %path.display(),
                add = diff.to_add.len(),
                update = diff.to_update.len(),
                remove = diff.to_remove.len(),
                retained = diff.retained.len(),
                unmanaged = diff.unmanaged.len(),
                "Computed diff"
            );
            if self.options.dry_run {
                return Ok(());
            }
            if !diff.is_noop() {
                write(&diff)?;
            }
            let next = diff.next_ledger(self.options.clean);
            if next != managed {
                self.ledger.update(&ledger_key, next)?;
            }
            Ok(())
        })();

        let error = match outcome {
            Ok(()) => None,
            Err(e) => {
                let message = format!("{:#}", e);
                warn!(tool, kind = %kind, error = %message, "Sync target failed");
                Some(message)
            }
        };
        self.report.record(TargetResult {
            tool: tool.to_string(),
            kind,
            target: target_kind,
            path,
            diff,
            error,
            warnings,
        });
    }
}

/// Servers the tool can run, plus one warning per dropped server.
fn supported_servers(adapter: &dyn Adapter, servers: &[Server]) -> (Vec<Server>, Vec<String>) {
    let mut kept = Vec::new();
    let mut warnings = Vec::new();
    for server in servers {
        if adapter.supports_transport(server.transport) {
            kept.push(server.clone());
        } else {
            warnings.push(format!(
                "{} does not support {} transport; skipping '{}'",
                adapter.name(),
                server.transport,
                server.name
            ));
        }
    }
    (kept, warnings)
}

fn keyed(servers: Vec<Server>) -> BTreeMap<String, Server> {
    servers
        .into_iter()
        .map(|s| (s.key().to_string(), s))
        .collect()
}

fn names(servers: Vec<Server>) -> BTreeSet<String> {
    servers.into_iter().map(|s| s.name).collect()
}

fn values<T: Clone>(map: &BTreeMap<String, T>) -> Vec<T> {
    map.values().cloned().collect()
}

fn document_dir(adapter: &dyn Adapter, kind: ResourceKind, workspace: Option<&Path>) -> Option<PathBuf> {
    match kind {
        ResourceKind::Commands => adapter.as_commands().map(|a| a.commands_dir(workspace)),
        ResourceKind::Rules => adapter.as_rules().map(|a| a.rules_dir(workspace)),
        ResourceKind::Skills => adapter.as_skills().map(|a| a.skills_dir(workspace)),
        ResourceKind::Servers => None,
    }
}

fn read_documents(
    adapter: &dyn Adapter,
    kind: ResourceKind,
    workspace: Option<&Path>,
) -> anyhow::Result<BTreeSet<String>> {
    let docs = match kind {
        ResourceKind::Commands => adapter.as_commands().map(|a| a.read_commands(workspace)),
        ResourceKind::Rules => adapter.as_rules().map(|a| a.read_rules(workspace)),
        ResourceKind::Skills => adapter.as_skills().map(|a| a.read_skills(workspace)),
        ResourceKind::Servers => None,
    };
    match docs {
        Some(docs) => Ok(docs?.into_keys().collect()),
        None => anyhow::bail!("{} does not implement {}", adapter.name(), kind),
    }
}

fn write_documents(
    adapter: &dyn Adapter,
    kind: ResourceKind,
    workspace: Option<&Path>,
    docs: &[Document],
    stale: &[String],
) -> anyhow::Result<()> {
    let result = match kind {
        ResourceKind::Commands => adapter
            .as_commands()
            .map(|a| a.write_commands(workspace, docs, stale)),
        ResourceKind::Rules => adapter
            .as_rules()
            .map(|a| a.write_rules(workspace, docs, stale)),
        ResourceKind::Skills => adapter
            .as_skills()
            .map(|a| a.write_skills(workspace, docs, stale)),
        ResourceKind::Servers => None,
    };
    match result {
        Some(result) => result,
        None => anyhow::bail!("{} does not implement {}", adapter.name(), kind),
    }
}
