use std::collections::{HashMap, HashSet};

use crate::checker::Span;
use crate::config::MonikerMode;
use crate::emit::Emitter;
use crate::error::{Result, WaypostError};
use crate::graph::{
    Builder, Entry, EventKind, EventScope, Hover, Id, ItemProperty, MarkedString, MonikerKind,
    Repository, ToolInfo,
};
use crate::moniker::{MonikerSpec, PackageSpec};

/// How long document-local symbol state is retained. `Free` releases it on
/// document close, `Keep` on project close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RetentionMode {
    Free,
    Keep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Partition {
    Global,
    DocumentLocal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NavKind {
    Definition,
    References,
    TypeDefinition,
    Implementation,
}

/// What the indexer knows about a symbol when it first asks for a record.
#[derive(Debug, Clone)]
pub struct SymbolStub {
    pub identity: String,
    /// URI of the declaring document, when it lies inside the workspace.
    pub owner: Option<String>,
    pub cross_document: bool,
    pub moniker: Option<MonikerSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasOutcome {
    Linked,
    Duplicate,
    CycleRefused,
}

/// Per-symbol record: the result set anchor, the deferred result vertices,
/// and the defining ranges seen so far.
struct SymbolData {
    result_set: Id,
    partition: Partition,
    owner: Option<String>,
    definition_result: Option<Id>,
    reference_result: Option<Id>,
    type_definition_result: Option<Id>,
    implementation_result: Option<Id>,
    hover_result: Option<Id>,
    definition_ranges: Vec<(String, Id)>,
}

impl SymbolData {
    fn nav(&self, kind: NavKind) -> &Option<Id> {
        match kind {
            NavKind::Definition => &self.definition_result,
            NavKind::References => &self.reference_result,
            NavKind::TypeDefinition => &self.type_definition_result,
            NavKind::Implementation => &self.implementation_result,
        }
    }

    fn set_nav(&mut self, kind: NavKind, id: Id) {
        match kind {
            NavKind::Definition => self.definition_result = Some(id),
            NavKind::References => self.reference_result = Some(id),
            NavKind::TypeDefinition => self.type_definition_result = Some(id),
            NavKind::Implementation => self.implementation_result = Some(id),
        }
    }
}

struct PendingGroup {
    result: Id,
    property: Option<ItemProperty>,
    ranges: Vec<Id>,
}

struct DocumentData {
    id: Id,
    ranges: Vec<Id>,
    pending: Vec<PendingGroup>,
    pending_index: HashMap<(Id, Option<ItemProperty>), usize>,
    closed: bool,
}

/// Lifetime controller for deferred per-symbol and per-document data. Sole
/// mutator of symbol records; everything downstream of the project indexer
/// flows through here into the builder and the emitter.
pub struct DataManager {
    mode: RetentionMode,
    builder: Builder,
    emitter: Box<dyn Emitter>,
    symbols: HashMap<String, SymbolData>,
    documents: HashMap<String, DocumentData>,
    moniker_vertices: HashMap<(String, String, MonikerKind), Id>,
    package_vertices: HashMap<(String, String, String), Id>,
    attached_monikers: HashSet<(Id, Id)>,
    next_links: HashSet<(Id, Id)>,
    next_target: HashMap<Id, Id>,
    alias_targets: HashMap<String, String>,
    symbols_created: usize,
}

impl DataManager {
    pub fn new(mode: MonikerMode, builder: Builder, emitter: Box<dyn Emitter>) -> Self {
        Self {
            mode: match mode {
                MonikerMode::Strict => RetentionMode::Free,
                MonikerMode::Lenient => RetentionMode::Keep,
            },
            builder,
            emitter,
            symbols: HashMap::new(),
            documents: HashMap::new(),
            moniker_vertices: HashMap::new(),
            package_vertices: HashMap::new(),
            attached_monikers: HashSet::new(),
            next_links: HashSet::new(),
            next_target: HashMap::new(),
            alias_targets: HashMap::new(),
            symbols_created: 0,
        }
    }

    /// Navigational results of an alias live on the aliased symbol; follow
    /// the alias chain to the record that owns them, stopping short of any
    /// link whose record has already been released.
    fn resolve_alias(&self, identity: &str) -> String {
        let mut current = identity;
        while let Some(target) = self.alias_targets.get(current) {
            if !self.symbols.contains_key(target.as_str()) {
                break;
            }
            current = target;
        }
        current.to_string()
    }

    fn emit(&mut self, entry: &Entry) -> Result<()> {
        self.emitter.emit(entry)
    }

    fn symbol(&self, identity: &str) -> Result<&SymbolData> {
        self.symbols.get(identity).ok_or_else(|| {
            WaypostError::Snapshot(format!("no open record for symbol `{identity}`"))
        })
    }

    pub fn start(&mut self) -> Result<()> {
        self.emitter.start()
    }

    pub fn end(&mut self) -> Result<()> {
        self.emitter.end()
    }

    // --- Dump header ---

    pub fn emit_meta_data(&mut self, project_root: &str, tool_info: ToolInfo) -> Result<()> {
        let entry = self.builder.meta_data(project_root, tool_info);
        self.emit(&entry)
    }

    pub fn emit_source(
        &mut self,
        workspace_root: &str,
        repository: Option<Repository>,
    ) -> Result<()> {
        let entry = self.builder.source(workspace_root, repository);
        self.emit(&entry)
    }

    pub fn emit_capabilities(&mut self) -> Result<()> {
        let entry = self.builder.capabilities();
        self.emit(&entry)
    }

    // --- Project and document lifecycle ---

    pub fn begin_project(
        &mut self,
        kind: &str,
        name: Option<&str>,
        resource: Option<&str>,
    ) -> Result<Id> {
        let entry = self.builder.project(kind, name, resource);
        let id = entry.id.clone();
        self.emit(&entry)?;
        let event = self
            .builder
            .event(EventKind::Begin, EventScope::Project, id.clone());
        self.emit(&event)?;
        Ok(id)
    }

    pub fn close_project(&mut self, project: &Id) -> Result<()> {
        // Document-local records never survive their project; globals stay
        // open for later projects.
        self.symbols
            .retain(|_, data| data.partition == Partition::Global);
        let event = self
            .builder
            .event(EventKind::End, EventScope::Project, project.clone());
        self.emit(&event)
    }

    /// Documents are re-entrant across projects but emitted once per URI.
    pub fn open_document(
        &mut self,
        uri: &str,
        language_id: &str,
        contents: Option<&str>,
    ) -> Result<Id> {
        if let Some(existing) = self.documents.get(uri) {
            return Ok(existing.id.clone());
        }
        let entry = self.builder.document(uri, language_id, contents);
        let id = entry.id.clone();
        self.emit(&entry)?;
        let event = self
            .builder
            .event(EventKind::Begin, EventScope::Document, id.clone());
        self.emit(&event)?;
        self.documents.insert(
            uri.to_string(),
            DocumentData {
                id: id.clone(),
                ranges: Vec::new(),
                pending: Vec::new(),
                pending_index: HashMap::new(),
                closed: false,
            },
        );
        Ok(id)
    }

    pub fn is_document_closed(&self, uri: &str) -> bool {
        self.documents.get(uri).is_some_and(|d| d.closed)
    }

    pub fn is_document_open(&self, uri: &str) -> bool {
        self.documents.get(uri).is_some_and(|d| !d.closed)
    }

    /// Flushes every pending item edge scoped to this document, emits its
    /// `contains` edges and its `end` event, and retires document-local
    /// symbols it owns (in `free` mode).
    pub fn close_document(&mut self, uri: &str, project: &Id) -> Result<()> {
        let (id, ranges, pending) = {
            let document = self.documents.get_mut(uri).ok_or_else(|| {
                WaypostError::Snapshot(format!("closing unopened document {uri}"))
            })?;
            if document.closed {
                return Ok(());
            }
            document.closed = true;
            document.pending_index.clear();
            (
                document.id.clone(),
                std::mem::take(&mut document.ranges),
                std::mem::take(&mut document.pending),
            )
        };

        for group in pending {
            let edge = self
                .builder
                .item(group.result, group.ranges, id.clone(), group.property);
            self.emit(&edge)?;
        }
        if !ranges.is_empty() {
            let edge = self.builder.contains(id.clone(), ranges);
            self.emit(&edge)?;
        }
        let edge = self.builder.contains(project.clone(), vec![id.clone()]);
        self.emit(&edge)?;
        let event = self.builder.event(EventKind::End, EventScope::Document, id);
        self.emit(&event)?;

        if self.mode == RetentionMode::Free {
            self.symbols.retain(|_, data| {
                data.partition == Partition::Global || data.owner.as_deref() != Some(uri)
            });
        }
        Ok(())
    }

    pub fn close_pipeline(&mut self) -> Result<()> {
        for (uri, document) in &self.documents {
            if !document.closed {
                tracing::warn!("document {uri} was never closed");
            }
        }
        self.symbols.clear();
        Ok(())
    }

    // --- Symbols ---

    pub fn has_symbol(&self, identity: &str) -> bool {
        self.symbols.contains_key(identity)
    }

    pub fn symbols_created(&self) -> usize {
        self.symbols_created
    }

    /// Allocates the record and emits the result set (plus moniker and
    /// package information) the first time a symbol is needed. The partition
    /// tag is fixed here: export/import monikers and cross-document scopes
    /// are global, everything else is document-local.
    pub fn ensure_symbol(&mut self, stub: &SymbolStub) -> Result<Id> {
        if let Some(existing) = self.symbols.get(&stub.identity) {
            return Ok(existing.result_set.clone());
        }
        let entry = self.builder.result_set();
        let result_set = entry.id.clone();
        self.emit(&entry)?;

        let global = stub.cross_document
            || stub
                .moniker
                .as_ref()
                .is_some_and(|m| m.kind != MonikerKind::Local);
        self.symbols.insert(
            stub.identity.clone(),
            SymbolData {
                result_set: result_set.clone(),
                partition: if global {
                    Partition::Global
                } else {
                    Partition::DocumentLocal
                },
                owner: stub.owner.clone(),
                definition_result: None,
                reference_result: None,
                type_definition_result: None,
                implementation_result: None,
                hover_result: None,
                definition_ranges: Vec::new(),
            },
        );
        self.symbols_created += 1;

        if let Some(spec) = &stub.moniker {
            self.attach_moniker(&stub.identity, spec)?;
        }
        Ok(result_set)
    }

    /// Attaches a moniker to an existing record. The moniker vertex is
    /// interned by (scheme, identifier, kind); the package information
    /// vertex by (name, version, manager).
    pub fn attach_moniker(&mut self, identity: &str, spec: &MonikerSpec) -> Result<()> {
        let result_set = self.symbol(identity)?.result_set.clone();
        let key = (spec.scheme.clone(), spec.identifier.clone(), spec.kind);
        let (vertex, created) = match self.moniker_vertices.get(&key) {
            Some(id) => (id.clone(), false),
            None => {
                let entry =
                    self.builder
                        .moniker(&spec.scheme, &spec.identifier, spec.kind, spec.unique);
                let id = entry.id.clone();
                self.emit(&entry)?;
                self.moniker_vertices.insert(key, id.clone());
                (id, true)
            }
        };
        if self
            .attached_monikers
            .insert((result_set.clone(), vertex.clone()))
        {
            let edge = self.builder.moniker_edge(result_set, vertex.clone());
            self.emit(&edge)?;
        }
        if created {
            if let Some(package) = &spec.package {
                let package_vertex = self.ensure_package(package)?;
                let edge = self.builder.package_information_edge(vertex, package_vertex);
                self.emit(&edge)?;
            }
        }
        Ok(())
    }

    fn ensure_package(&mut self, package: &PackageSpec) -> Result<Id> {
        let key = (
            package.name.clone(),
            package.version.clone(),
            package.manager.clone(),
        );
        if let Some(existing) = self.package_vertices.get(&key) {
            return Ok(existing.clone());
        }
        let entry = self.builder.package_information(
            &package.name,
            &package.manager,
            &package.version,
            package.repository.clone(),
        );
        let id = entry.id.clone();
        self.emit(&entry)?;
        self.package_vertices.insert(key, id.clone());
        Ok(id)
    }

    // --- Occurrences ---

    /// Emits a range vertex and its `next` edge, and registers the range
    /// with its containing document.
    pub fn emit_range(&mut self, uri: &str, span: &Span, result_set: &Id) -> Result<Id> {
        let entry = self.builder.range(span.start, span.end);
        let id = entry.id.clone();
        self.emit(&entry)?;
        let next = self.builder.next(id.clone(), result_set.clone());
        self.emit(&next)?;
        let document = self
            .documents
            .get_mut(uri)
            .ok_or_else(|| WaypostError::Snapshot(format!("range in unopened document {uri}")))?;
        document.ranges.push(id.clone());
        Ok(id)
    }

    fn nav_result(&mut self, identity: &str, kind: NavKind) -> Result<Id> {
        let (existing, result_set) = {
            let data = self.symbol(identity)?;
            (data.nav(kind).clone(), data.result_set.clone())
        };
        if let Some(id) = existing {
            return Ok(id);
        }
        let vertex = match kind {
            NavKind::Definition => self.builder.definition_result(),
            NavKind::References => self.builder.reference_result(),
            NavKind::TypeDefinition => self.builder.type_definition_result(),
            NavKind::Implementation => self.builder.implementation_result(),
        };
        let id = vertex.id.clone();
        self.emit(&vertex)?;
        let edge = match kind {
            NavKind::Definition => self.builder.definition_edge(result_set, id.clone()),
            NavKind::References => self.builder.references_edge(result_set, id.clone()),
            NavKind::TypeDefinition => self.builder.type_definition_edge(result_set, id.clone()),
            NavKind::Implementation => self.builder.implementation_edge(result_set, id.clone()),
        };
        self.emit(&edge)?;
        if let Some(data) = self.symbols.get_mut(identity) {
            data.set_nav(kind, id.clone());
        }
        Ok(id)
    }

    fn pend_item(
        &mut self,
        uri: &str,
        result: &Id,
        property: Option<ItemProperty>,
        range: &Id,
    ) -> Result<()> {
        let document = self
            .documents
            .get_mut(uri)
            .ok_or_else(|| WaypostError::Snapshot(format!("item in unopened document {uri}")))?;
        let key = (result.clone(), property);
        let index = match document.pending_index.get(&key) {
            Some(index) => *index,
            None => {
                document.pending.push(PendingGroup {
                    result: result.clone(),
                    property,
                    ranges: Vec::new(),
                });
                let index = document.pending.len() - 1;
                document.pending_index.insert(key, index);
                index
            }
        };
        document.pending[index].ranges.push(range.clone());
        Ok(())
    }

    pub fn record_definition(&mut self, identity: &str, uri: &str, range: &Id) -> Result<()> {
        let identity = self.resolve_alias(identity);
        let definition = self.nav_result(&identity, NavKind::Definition)?;
        self.pend_item(uri, &definition, None, range)?;
        let references = self.nav_result(&identity, NavKind::References)?;
        self.pend_item(uri, &references, Some(ItemProperty::Definitions), range)?;
        if let Some(data) = self.symbols.get_mut(&identity) {
            data.definition_ranges.push((uri.to_string(), range.clone()));
        }
        Ok(())
    }

    /// Returns true when a document-local symbol was referenced from outside
    /// its owning document, so the caller can attach a fallback moniker and
    /// report the locality violation.
    pub fn record_reference(&mut self, identity: &str, uri: &str, range: &Id) -> Result<bool> {
        let identity = self.resolve_alias(identity);
        let references = self.nav_result(&identity, NavKind::References)?;
        self.pend_item(uri, &references, Some(ItemProperty::References), range)?;
        let data = self.symbol(&identity)?;
        Ok(data.partition == Partition::DocumentLocal
            && data.owner.as_deref().is_some_and(|owner| owner != uri))
    }

    pub fn record_type_definition(&mut self, identity: &str, uri: &str, range: &Id) -> Result<()> {
        let identity = self.resolve_alias(identity);
        let result = self.nav_result(&identity, NavKind::TypeDefinition)?;
        self.pend_item(uri, &result, None, range)
    }

    pub fn record_implementation(&mut self, identity: &str, uri: &str, range: &Id) -> Result<()> {
        let identity = self.resolve_alias(identity);
        let result = self.nav_result(&identity, NavKind::Implementation)?;
        self.pend_item(uri, &result, None, range)
    }

    pub fn record_hover(&mut self, identity: &str, text: &str, language: &str) -> Result<()> {
        let identity = self.resolve_alias(identity);
        let identity = identity.as_str();
        let (already, result_set) = {
            let data = self.symbol(identity)?;
            (data.hover_result.is_some(), data.result_set.clone())
        };
        if already {
            return Ok(());
        }
        let hover = Hover {
            contents: vec![MarkedString::Code {
                language: language.to_string(),
                value: text.to_string(),
            }],
        };
        let vertex = self.builder.hover_result(hover);
        let id = vertex.id.clone();
        self.emit(&vertex)?;
        let edge = self.builder.hover_edge(result_set, id.clone());
        self.emit(&edge)?;
        if let Some(data) = self.symbols.get_mut(identity) {
            data.hover_result = Some(id);
        }
        Ok(())
    }

    /// The defining ranges recorded so far, as (document URI, range id).
    pub fn definition_ranges(&self, identity: &str) -> Vec<(String, Id)> {
        self.symbols
            .get(&self.resolve_alias(identity))
            .map(|data| data.definition_ranges.clone())
            .unwrap_or_default()
    }

    // --- Aliases ---

    /// Links `alias`'s result set to `target`'s via `next`. Recording the
    /// same pair twice is a no-op; a link that would close a cycle is
    /// refused.
    pub fn alias(&mut self, alias_identity: &str, target_identity: &str) -> Result<AliasOutcome> {
        let alias_set = self.symbol(alias_identity)?.result_set.clone();
        let target_set = self.symbol(target_identity)?.result_set.clone();
        if self
            .next_links
            .contains(&(alias_set.clone(), target_set.clone()))
        {
            return Ok(AliasOutcome::Duplicate);
        }
        let mut cursor = Some(target_set.clone());
        while let Some(current) = cursor {
            if current == alias_set {
                return Ok(AliasOutcome::CycleRefused);
            }
            cursor = self.next_target.get(&current).cloned();
        }
        let edge = self.builder.next(alias_set.clone(), target_set.clone());
        self.emit(&edge)?;
        self.next_links.insert((alias_set.clone(), target_set.clone()));
        self.next_target.insert(alias_set, target_set);
        self.alias_targets
            .insert(alias_identity.to_string(), target_identity.to_string());
        Ok(AliasOutcome::Linked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IdKind;
    use crate::emit::LineEmitter;
    use crate::graph::UniquenessLevel;
    use crate::test_utils::SharedSink;

    fn manager(mode: MonikerMode) -> (DataManager, SharedSink) {
        let sink = SharedSink::default();
        let emitter = Box::new(LineEmitter::new(Box::new(sink.clone())));
        let builder = Builder::new(IdKind::Number, false);
        (DataManager::new(mode, builder, emitter), sink)
    }

    fn stub(identity: &str) -> SymbolStub {
        SymbolStub {
            identity: identity.to_string(),
            owner: None,
            cross_document: false,
            moniker: None,
        }
    }

    fn export_stub(identity: &str, identifier: &str) -> SymbolStub {
        SymbolStub {
            identity: identity.to_string(),
            owner: None,
            cross_document: false,
            moniker: Some(MonikerSpec {
                scheme: "npm".to_string(),
                identifier: identifier.to_string(),
                kind: MonikerKind::Export,
                unique: UniquenessLevel::Scheme,
                package: Some(PackageSpec {
                    name: "lib".to_string(),
                    manager: "npm".to_string(),
                    version: "1.0.0".to_string(),
                    repository: None,
                }),
            }),
        }
    }

    #[test]
    fn test_alias_is_idempotent() {
        let (mut manager, sink) = manager(MonikerMode::Lenient);
        manager.ensure_symbol(&stub("a:x")).unwrap();
        manager.ensure_symbol(&stub("b:y")).unwrap();
        assert_eq!(manager.alias("a:x", "b:y").unwrap(), AliasOutcome::Linked);
        assert_eq!(
            manager.alias("a:x", "b:y").unwrap(),
            AliasOutcome::Duplicate
        );
        let next_edges = sink
            .contents()
            .lines()
            .filter(|line| line.contains("\"next\""))
            .count();
        assert_eq!(next_edges, 1);
    }

    #[test]
    fn test_alias_cycle_is_refused() {
        let (mut manager, _sink) = manager(MonikerMode::Lenient);
        manager.ensure_symbol(&stub("a:x")).unwrap();
        manager.ensure_symbol(&stub("b:y")).unwrap();
        manager.ensure_symbol(&stub("c:z")).unwrap();
        assert_eq!(manager.alias("a:x", "b:y").unwrap(), AliasOutcome::Linked);
        assert_eq!(manager.alias("b:y", "c:z").unwrap(), AliasOutcome::Linked);
        assert_eq!(
            manager.alias("c:z", "a:x").unwrap(),
            AliasOutcome::CycleRefused
        );
    }

    #[test]
    fn test_package_information_is_deduplicated() {
        let (mut manager, sink) = manager(MonikerMode::Lenient);
        manager
            .ensure_symbol(&export_stub("lib:index:A", "lib:index:A"))
            .unwrap();
        manager
            .ensure_symbol(&export_stub("lib:index:B", "lib:index:B"))
            .unwrap();
        let packages = sink
            .contents()
            .lines()
            .filter(|line| line.contains("\"packageInformation\"") && line.contains("\"vertex\""))
            .count();
        assert_eq!(packages, 1);
    }

    #[test]
    fn test_free_mode_releases_locals_on_document_close() {
        let (mut manager, _sink) = manager(MonikerMode::Strict);
        let project = manager.begin_project("typescript", Some("p"), None).unwrap();
        manager
            .open_document("file:///w/a.ts", "typescript", None)
            .unwrap();
        let local = SymbolStub {
            owner: Some("file:///w/a.ts".to_string()),
            ..stub("a:x")
        };
        manager.ensure_symbol(&local).unwrap();
        assert!(manager.has_symbol("a:x"));
        manager.close_document("file:///w/a.ts", &project).unwrap();
        assert!(!manager.has_symbol("a:x"));
    }

    #[test]
    fn test_keep_mode_retains_locals_until_project_close() {
        let (mut manager, _sink) = manager(MonikerMode::Lenient);
        let project = manager.begin_project("typescript", Some("p"), None).unwrap();
        manager
            .open_document("file:///w/a.ts", "typescript", None)
            .unwrap();
        let local = SymbolStub {
            owner: Some("file:///w/a.ts".to_string()),
            ..stub("a:x")
        };
        manager.ensure_symbol(&local).unwrap();
        manager.close_document("file:///w/a.ts", &project).unwrap();
        assert!(manager.has_symbol("a:x"));
        manager.close_project(&project).unwrap();
        assert!(!manager.has_symbol("a:x"));
    }

    #[test]
    fn test_items_flush_at_document_close() {
        let (mut manager, sink) = manager(MonikerMode::Lenient);
        let project = manager.begin_project("typescript", Some("p"), None).unwrap();
        let uri = "file:///w/a.ts";
        manager.open_document(uri, "typescript", None).unwrap();
        let result_set = manager.ensure_symbol(&stub("a:f")).unwrap();
        let span = Span {
            start: crate::graph::Position { line: 0, character: 9 },
            end: crate::graph::Position { line: 0, character: 10 },
        };
        let range = manager.emit_range(uri, &span, &result_set).unwrap();
        manager.record_definition("a:f", uri, &range).unwrap();

        assert!(!sink.contents().contains("\"item\""));
        manager.close_document(uri, &project).unwrap();
        let output = sink.contents();
        assert!(output.contains("\"item\""));
        assert!(output.contains("\"definitions\""));
    }
}
