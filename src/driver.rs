use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::DiGraph;

use crate::checker::{DocumentRef, ProjectInfo, SymbolRef, Typechecker};
use crate::config::{Config, MonikerMode};
use crate::emit::Emitter;
use crate::error::{Result, WaypostError};
use crate::graph::{Builder, ToolInfo};
use crate::indexer::{ProjectIndexer, WorkspaceContext};
use crate::manager::DataManager;
use crate::moniker::{ExportResolver, ImportResolver, SCHEME};
use crate::report::{ProjectStatus, Reporter};
use crate::source;

/// Orders projects topologically, runs the project indexer over each with
/// shared data-manager and moniker-resolver state, and flushes on
/// completion.
pub struct Driver<'a, T: Typechecker> {
    checker: &'a T,
    config: &'a Config,
    reporter: Box<dyn Reporter>,
    cancel: Arc<AtomicBool>,
    tool_args: Vec<String>,
}

impl<'a, T: Typechecker> Driver<'a, T> {
    pub fn new(checker: &'a T, config: &'a Config, reporter: Box<dyn Reporter>) -> Self {
        Self {
            checker,
            config,
            reporter,
            cancel: Arc::new(AtomicBool::new(false)),
            tool_args: Vec::new(),
        }
    }

    /// Cooperative cancellation flag, checked at project boundaries only. A
    /// cancelled pipeline still flushes open state and emits `end`, so the
    /// dump stays well-formed.
    pub fn with_cancellation(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_tool_args(mut self, args: Vec<String>) -> Self {
        self.tool_args = args;
        self
    }

    pub fn run(mut self, emitter: Box<dyn Emitter>) -> Result<()> {
        self.config.validate()?;

        let root = absolutize(&self.config.workspace_root)?;
        let workspace = WorkspaceContext::new(
            root.clone(),
            self.config.moniker == MonikerMode::Strict,
            self.checker.language(),
        )?;

        let order = self.topological_order()?;
        let (typed_by, implementors) = reverse_maps(self.checker);

        let builder = Builder::new(self.config.id, self.config.no_contents);
        let mut manager = DataManager::new(self.config.moniker, builder, emitter);

        manager.start()?;
        manager.emit_meta_data(
            workspace.root_url.as_str(),
            ToolInfo {
                name: "waypost".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
                args: self.tool_args.clone(),
            },
        )?;
        let repository = source::resolve_repository(
            &root,
            self.config.source.as_ref(),
            self.config.probe_repository,
        );
        manager.emit_source(workspace.root_url.as_str(), repository)?;
        manager.emit_capabilities()?;

        let mut imports = ImportResolver::new(SCHEME);
        let declaring_paths: Vec<PathBuf> = (0..self.checker.symbol_count())
            .filter_map(|index| {
                self.checker
                    .declaring_path(SymbolRef(index as u32))
                    .map(|path| workspace.absolute(path))
            })
            .collect();
        imports.seed(declaring_paths.iter().map(PathBuf::as_path));

        self.reporter.begin();
        let mut consumed: HashSet<DocumentRef> = HashSet::new();
        let mut documents_done = 0usize;
        for (position, &project_index) in order.iter().enumerate() {
            if self.cancel.load(Ordering::Relaxed) {
                tracing::info!("cancellation requested; emitting a partial dump");
                break;
            }
            let project = &self.checker.projects()[project_index];
            let manifest = manifest_binding(self.config, project, &workspace);
            let exports = match &manifest {
                Some(path) => Some(ExportResolver::new(
                    path,
                    &workspace.absolute(&project.root),
                )?),
                None => None,
            };

            let started = Instant::now();
            let stats = {
                let mut indexer = ProjectIndexer::new(
                    self.checker,
                    &mut manager,
                    &mut imports,
                    exports.as_ref(),
                    manifest.as_deref(),
                    self.reporter.as_mut(),
                    &workspace,
                    &typed_by,
                    &implementors,
                );
                let name_override = if position == 0 {
                    self.config.project_name.as_deref()
                } else {
                    None
                };
                indexer.index(project_index, name_override, &mut consumed, &mut documents_done)?
            };
            self.reporter.report_status(&ProjectStatus {
                project: project.name.clone(),
                symbols: stats.symbols,
                documents: stats.documents,
                elapsed_ms: started.elapsed().as_millis(),
            });
        }

        manager.close_pipeline()?;
        manager.end()?;
        self.reporter.end();
        Ok(())
    }

    /// Projects ordered so that every declared reference precedes its
    /// dependents. A cycle is a fatal configuration error naming the
    /// participating projects.
    fn topological_order(&self) -> Result<Vec<usize>> {
        let projects = self.checker.projects();
        if self.config.no_project_references || projects.len() <= 1 {
            return Ok((0..projects.len()).collect());
        }
        let index_by_name: HashMap<&str, usize> = projects
            .iter()
            .enumerate()
            .map(|(index, project)| (project.name.as_str(), index))
            .collect();

        let mut graph: DiGraph<usize, ()> = DiGraph::new();
        let nodes: Vec<_> = (0..projects.len()).map(|i| graph.add_node(i)).collect();
        for (index, project) in projects.iter().enumerate() {
            for reference in &project.references {
                if let Some(&target) = index_by_name.get(reference.as_str()) {
                    graph.add_edge(nodes[target], nodes[index], ());
                }
            }
        }

        match toposort(&graph, None) {
            Ok(sorted) => Ok(sorted.into_iter().map(|node| graph[node]).collect()),
            Err(cycle) => {
                let members = tarjan_scc(&graph)
                    .into_iter()
                    .find(|component| component.contains(&cycle.node_id()))
                    .unwrap_or_else(|| vec![cycle.node_id()]);
                let names: Vec<&str> = members
                    .iter()
                    .map(|&node| projects[graph[node]].name.as_str())
                    .collect();
                Err(WaypostError::ProjectCycle(names.join(", ")))
            }
        }
    }
}

/// The manifest bound to a project: a `publishedPackages` match wins, then
/// the single `package` option, then the snapshot's own binding. Relative
/// manifest paths are anchored at the workspace root.
fn manifest_binding(
    config: &Config,
    project: &ProjectInfo,
    workspace: &WorkspaceContext,
) -> Option<PathBuf> {
    if let Some(published) = config
        .published_packages
        .iter()
        .find(|published| published.project == project.name)
    {
        return Some(workspace.absolute(&published.manifest));
    }
    if let Some(package) = &config.package {
        return Some(workspace.absolute(package));
    }
    project
        .manifest
        .as_ref()
        .map(|manifest| workspace.absolute(manifest))
}

fn absolutize(path: &std::path::Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Reverse maps feeding the deferred type-definition and implementation
/// results: type -> symbols typed as it, interface -> its implementors.
type SymbolMap = HashMap<SymbolRef, Vec<SymbolRef>>;

fn reverse_maps<T: Typechecker>(checker: &T) -> (SymbolMap, SymbolMap) {
    let mut typed_by: SymbolMap = HashMap::new();
    let mut implementors: SymbolMap = HashMap::new();
    for index in 0..checker.symbol_count() {
        let symbol = SymbolRef(index as u32);
        let info = checker.symbol(symbol);
        if let Some(type_of) = info.type_of {
            typed_by.entry(type_of).or_default().push(symbol);
        }
        for interface in &info.implements {
            implementors.entry(*interface).or_default().push(symbol);
        }
    }
    (typed_by, implementors)
}
