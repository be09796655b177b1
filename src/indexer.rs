use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use url::Url;

use crate::checker::{DocumentRef, Occurrence, OccurrenceKind, SymbolRef, Typechecker};
use crate::error::{Result, WaypostError};
use crate::graph::Id;
use crate::manager::{AliasOutcome, DataManager, SymbolStub};
use crate::moniker::{local_moniker, ExportResolver, ImportResolver};
use crate::report::{InternalSymbol, Reporter};

/// Workspace-wide context shared by every project walk.
pub struct WorkspaceContext {
    pub root: PathBuf,
    pub root_url: Url,
    pub strict: bool,
    pub language: String,
}

impl WorkspaceContext {
    pub fn new(root: PathBuf, strict: bool, language: &str) -> Result<Self> {
        let root_url = Url::from_directory_path(&root).map_err(|_| {
            WaypostError::Configuration(format!(
                "workspace root must be an absolute path: {}",
                root.display()
            ))
        })?;
        Ok(Self {
            root,
            root_url,
            strict,
            language: language.to_string(),
        })
    }

    /// Absolute path of a (usually workspace-relative) snapshot path.
    pub fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn document_uri(&self, path: &Path) -> Result<String> {
        if path.is_absolute() {
            return Url::from_file_path(path)
                .map(|url| url.to_string())
                .map_err(|_| {
                    WaypostError::Configuration(format!("invalid document path: {}", path.display()))
                });
        }
        let relative: Vec<String> = path
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        self.root_url
            .join(&relative.join("/"))
            .map(|url| url.to_string())
            .map_err(|e| {
                WaypostError::Configuration(format!("invalid document path {}: {e}", path.display()))
            })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectStats {
    pub documents: usize,
    pub symbols: usize,
}

#[derive(Clone)]
struct EnsuredSymbol {
    identity: String,
    result_set: Id,
}

/// Walks one compilation unit: opens its documents, visits every occurrence
/// the façade reports, resolves monikers, and deposits facts into the data
/// manager.
pub struct ProjectIndexer<'a, T: Typechecker> {
    checker: &'a T,
    manager: &'a mut DataManager,
    imports: &'a mut ImportResolver,
    exports: Option<&'a ExportResolver>,
    own_manifest: Option<&'a Path>,
    reporter: &'a mut dyn Reporter,
    workspace: &'a WorkspaceContext,
    typed_by: &'a HashMap<SymbolRef, Vec<SymbolRef>>,
    implementors: &'a HashMap<SymbolRef, Vec<SymbolRef>>,
    ensured: HashMap<SymbolRef, EnsuredSymbol>,
}

impl<'a, T: Typechecker> ProjectIndexer<'a, T> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        checker: &'a T,
        manager: &'a mut DataManager,
        imports: &'a mut ImportResolver,
        exports: Option<&'a ExportResolver>,
        own_manifest: Option<&'a Path>,
        reporter: &'a mut dyn Reporter,
        workspace: &'a WorkspaceContext,
        typed_by: &'a HashMap<SymbolRef, Vec<SymbolRef>>,
        implementors: &'a HashMap<SymbolRef, Vec<SymbolRef>>,
    ) -> Self {
        Self {
            checker,
            manager,
            imports,
            exports,
            own_manifest,
            reporter,
            workspace,
            typed_by,
            implementors,
            ensured: HashMap::new(),
        }
    }

    /// Indexes one project: documents in declaration order, then the
    /// aliasing relationships declared in them, then the project close.
    pub fn index(
        &mut self,
        project_index: usize,
        name_override: Option<&str>,
        consumed: &mut HashSet<DocumentRef>,
        documents_done: &mut usize,
    ) -> Result<ProjectStats> {
        let project = &self.checker.projects()[project_index];
        let symbols_before = self.manager.symbols_created();

        let resource = self
            .workspace
            .document_uri(&project.root)
            .unwrap_or_else(|_| self.workspace.root_url.to_string());
        let project_id = self.manager.begin_project(
            &self.workspace.language,
            Some(name_override.unwrap_or(&project.name)),
            Some(&resource),
        )?;

        let mut stats = ProjectStats::default();
        for document in &project.documents {
            if !consumed.insert(*document) {
                // Already walked by a dependent project indexed earlier; its
                // ranges reach the shared result sets through `next` edges.
                continue;
            }
            self.walk_document(&project_id, *document)?;
            stats.documents += 1;
            *documents_done += 1;
            self.reporter.report_progress(*documents_done);
        }

        self.manager.close_project(&project_id)?;
        stats.symbols = self.manager.symbols_created() - symbols_before;
        Ok(stats)
    }

    fn walk_document(&mut self, project_id: &Id, document: DocumentRef) -> Result<()> {
        let info = self.checker.document(document);
        let uri = self.workspace.document_uri(&info.path)?;
        if self.manager.is_document_closed(&uri) {
            return Ok(());
        }
        self.manager
            .open_document(&uri, &info.language_id, info.contents.as_deref())?;
        // Aliases declared here are linked before the occurrences are
        // deposited, so the aliased symbol's results absorb them.
        self.record_aliases(&info.path, &uri)?;
        for occurrence in &info.occurrences {
            self.visit_occurrence(&uri, occurrence)?;
        }
        self.manager.close_document(&uri, project_id)
    }

    fn visit_occurrence(&mut self, uri: &str, occurrence: &Occurrence) -> Result<()> {
        let symbol = self.ensure(occurrence.symbol, uri)?;
        let range = self
            .manager
            .emit_range(uri, &occurrence.span, &symbol.result_set)?;

        match occurrence.kind {
            OccurrenceKind::Declaration | OccurrenceKind::Definition => {
                self.manager
                    .record_definition(&symbol.identity, uri, &range)?;
                let info = self.checker.symbol(occurrence.symbol);
                if let Some(hover) = &info.hover {
                    self.manager
                        .record_hover(&symbol.identity, hover, &self.workspace.language)?;
                }
                self.forward_links(occurrence.symbol, uri, &range)?;
            }
            OccurrenceKind::Reference | OccurrenceKind::TypeReference => {
                let external = self
                    .manager
                    .record_reference(&symbol.identity, uri, &range)?;
                if external {
                    self.handle_external_local_reference(occurrence.symbol, &symbol, uri)?;
                }
            }
        }
        Ok(())
    }

    /// A definition of `symbol` just produced `range`: feed the deferred
    /// type-definition and implementation results that depend on it.
    fn forward_links(&mut self, symbol: SymbolRef, uri: &str, range: &Id) -> Result<()> {
        if let Some(dependents) = self.typed_by.get(&symbol) {
            for dependent in dependents {
                let key = self.checker.identity(*dependent);
                if self.manager.has_symbol(key) {
                    self.manager.record_type_definition(key, uri, range)?;
                }
            }
        }
        for interface in &self.checker.symbol(symbol).implements {
            let key = self.checker.identity(*interface);
            if self.manager.has_symbol(key) {
                self.manager.record_implementation(key, uri, range)?;
            }
        }
        Ok(())
    }

    /// Requests-or-creates the symbol's record. Re-ensures when a released
    /// document-local record is referenced again (free mode).
    fn ensure(&mut self, symbol: SymbolRef, referencing_uri: &str) -> Result<EnsuredSymbol> {
        if let Some(cached) = self.ensured.get(&symbol) {
            if self.manager.has_symbol(&cached.identity) {
                return Ok(cached.clone());
            }
        }
        let identity = self.checker.identity(symbol).to_string();
        if self.manager.has_symbol(&identity) {
            // Known from an earlier project; attach this project's view of
            // the symbol as an import moniker when one resolves.
            let result_set = self.ensure_known(&identity, symbol)?;
            let ensured = EnsuredSymbol {
                identity,
                result_set,
            };
            self.ensured.insert(symbol, ensured.clone());
            return Ok(ensured);
        }

        let info = self.checker.symbol(symbol);
        let symbol_path = self.checker.symbol_path(symbol);
        let declaring = self.checker.declaring_path(symbol).map(|p| self.workspace.absolute(p));

        if declaring.is_none() && self.workspace.strict {
            tracing::warn!(
                "symbol `{symbol_path}` has no declarations and no import moniker; linking to a synthetic local result set"
            );
        }

        let moniker = declaring.as_deref().and_then(|path| {
            self.imports
                .resolve(path, symbol_path, self.own_manifest)
                .or_else(|| {
                    self.exports
                        .and_then(|exports| exports.resolve(path, symbol_path, info.exported))
                })
        });

        let owner = match info.declarations.first() {
            Some(declaration) => {
                let path = &self.checker.document(declaration.document).path;
                Some(self.workspace.document_uri(path)?)
            }
            None => Some(referencing_uri.to_string()),
        };

        let stub = SymbolStub {
            identity: identity.clone(),
            owner,
            cross_document: info.cross_document,
            moniker,
        };
        let result_set = self.manager.ensure_symbol(&stub)?;
        self.backfill_links(symbol, &identity)?;

        let ensured = EnsuredSymbol {
            identity,
            result_set,
        };
        self.ensured.insert(symbol, ensured.clone());
        Ok(ensured)
    }

    /// A record created by an earlier project: resolve the importing side's
    /// moniker against this project's manifest.
    fn ensure_known(&mut self, identity: &str, symbol: SymbolRef) -> Result<Id> {
        let symbol_path = self.checker.symbol_path(symbol);
        let declaring = self.checker.declaring_path(symbol).map(|p| self.workspace.absolute(p));
        if let Some(path) = declaring.as_deref() {
            if let Some(moniker) = self.imports.resolve(path, symbol_path, self.own_manifest) {
                self.manager.attach_moniker(identity, &moniker)?;
            }
        }
        let stub = SymbolStub {
            identity: identity.to_string(),
            owner: None,
            cross_document: false,
            moniker: None,
        };
        // The record exists, so this only reads the result set id back.
        self.manager.ensure_symbol(&stub)
    }

    /// A symbol ensured late: pull already-recorded definition ranges into
    /// its deferred type-definition and implementation results, as long as
    /// their documents are still open.
    fn backfill_links(&mut self, symbol: SymbolRef, identity: &str) -> Result<()> {
        if let Some(type_of) = self.checker.symbol(symbol).type_of {
            let type_key = self.checker.identity(type_of);
            for (uri, range) in self.manager.definition_ranges(type_key) {
                if self.manager.is_document_open(&uri) {
                    self.manager.record_type_definition(identity, &uri, &range)?;
                }
            }
        }
        if let Some(implementors) = self.implementors.get(&symbol) {
            for implementor in implementors {
                let implementor_key = self.checker.identity(*implementor);
                for (uri, range) in self.manager.definition_ranges(implementor_key) {
                    if self.manager.is_document_open(&uri) {
                        self.manager.record_implementation(identity, &uri, &range)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Document-local symbol referenced outside its owning document: attach
    /// the deterministic fallback moniker, and report it in strict mode.
    fn handle_external_local_reference(
        &mut self,
        symbol: SymbolRef,
        ensured: &EnsuredSymbol,
        referencing_uri: &str,
    ) -> Result<()> {
        let moniker = local_moniker(crate::moniker::SCHEME, &ensured.identity);
        self.manager.attach_moniker(&ensured.identity, &moniker)?;

        if self.workspace.strict {
            let info = self.checker.symbol(symbol);
            let declarations = info
                .declarations
                .iter()
                .map(|declaration| {
                    self.workspace
                        .document_uri(&self.checker.document(declaration.document).path)
                })
                .collect::<Result<Vec<_>>>()?;
            let display_name = info
                .name
                .clone()
                .unwrap_or_else(|| self.checker.symbol_path(symbol).to_string());
            self.reporter.report_internal_symbol(&InternalSymbol {
                identity: ensured.identity.clone(),
                name: display_name,
                declarations,
                reference: referencing_uri.to_string(),
            });
        }
        Ok(())
    }

    /// Aliases whose alias side is declared in this document, recorded in
    /// the façade's observation order.
    fn record_aliases(&mut self, path: &Path, uri: &str) -> Result<()> {
        let aliases: Vec<_> = self
            .checker
            .aliases()
            .iter()
            .filter(|pair| {
                self.checker
                    .declaring_path(pair.alias)
                    .is_some_and(|declaring| declaring == path)
            })
            .copied()
            .collect();
        for pair in aliases {
            let alias = self.ensure(pair.alias, uri)?;
            let target = self.ensure(pair.target, uri)?;
            match self.manager.alias(&alias.identity, &target.identity)? {
                AliasOutcome::Linked | AliasOutcome::Duplicate => {}
                AliasOutcome::CycleRefused => {
                    tracing::warn!(
                        "aliasing cycle refused: `{}` -> `{}`",
                        alias.identity,
                        target.identity
                    );
                }
            }
        }
        Ok(())
    }
}
