use uuid::Uuid;

use crate::config::IdKind;
use crate::graph::element::{
    Edge, Entry, EventKind, EventScope, Hover, Id, ItemProperty, MonikerKind, Payload, Position,
    Repository, ToolInfo, UniquenessLevel, Vertex,
};

/// The sole source of graph element IDs.
#[derive(Debug)]
pub enum IdGenerator {
    /// Sequential integers starting at 1.
    Counter(u64),
    /// Random UUIDv4 strings.
    Uuid,
}

impl IdGenerator {
    pub fn new(kind: IdKind) -> Self {
        match kind {
            IdKind::Number => IdGenerator::Counter(0),
            IdKind::Uuid => IdGenerator::Uuid,
        }
    }

    pub fn next(&mut self) -> Id {
        match self {
            IdGenerator::Counter(last) => {
                *last += 1;
                Id::Number(*last)
            }
            IdGenerator::Uuid => Id::Uuid(Uuid::new_v4().to_string()),
        }
    }
}

/// Stateless element factory: every constructor draws one fresh ID and
/// returns a value, with no other side effects. Document contents pass
/// through only when the caller did not request `no_contents`.
pub struct Builder {
    ids: IdGenerator,
    emit_contents: bool,
}

impl Builder {
    pub fn new(id_kind: IdKind, no_contents: bool) -> Self {
        Self {
            ids: IdGenerator::new(id_kind),
            emit_contents: !no_contents,
        }
    }

    fn entry(&mut self, payload: Payload) -> Entry {
        Entry {
            id: self.ids.next(),
            payload,
        }
    }

    fn vertex(&mut self, vertex: Vertex) -> Entry {
        self.entry(Payload::Vertex(vertex))
    }

    fn edge(&mut self, edge: Edge) -> Entry {
        self.entry(Payload::Edge(edge))
    }

    // --- Vertices ---

    pub fn meta_data(&mut self, project_root: &str, tool_info: ToolInfo) -> Entry {
        self.vertex(Vertex::MetaData {
            version: "0.6.0".to_string(),
            project_root: project_root.to_string(),
            position_encoding: "utf-16".to_string(),
            tool_info,
        })
    }

    pub fn source(&mut self, workspace_root: &str, repository: Option<Repository>) -> Entry {
        self.vertex(Vertex::Source {
            workspace_root: workspace_root.to_string(),
            repository,
        })
    }

    pub fn capabilities(&mut self) -> Entry {
        self.vertex(Vertex::Capabilities {
            hover_provider: true,
            declaration_provider: false,
            definition_provider: true,
            type_definition_provider: true,
            references_provider: true,
            implementation_provider: true,
        })
    }

    pub fn event(&mut self, kind: EventKind, scope: EventScope, data: Id) -> Entry {
        self.vertex(Vertex::Event { kind, scope, data })
    }

    pub fn project(&mut self, kind: &str, name: Option<&str>, resource: Option<&str>) -> Entry {
        self.vertex(Vertex::Project {
            kind: kind.to_string(),
            name: name.map(str::to_string),
            resource: resource.map(str::to_string),
        })
    }

    pub fn document(&mut self, uri: &str, language_id: &str, contents: Option<&str>) -> Entry {
        self.vertex(Vertex::Document {
            uri: uri.to_string(),
            language_id: language_id.to_string(),
            contents: if self.emit_contents {
                contents.map(str::to_string)
            } else {
                None
            },
        })
    }

    pub fn range(&mut self, start: Position, end: Position) -> Entry {
        self.vertex(Vertex::Range { start, end })
    }

    pub fn result_set(&mut self) -> Entry {
        self.vertex(Vertex::ResultSet {})
    }

    pub fn moniker(
        &mut self,
        scheme: &str,
        identifier: &str,
        kind: MonikerKind,
        unique: UniquenessLevel,
    ) -> Entry {
        self.vertex(Vertex::Moniker {
            scheme: scheme.to_string(),
            identifier: identifier.to_string(),
            kind,
            unique,
        })
    }

    pub fn package_information(
        &mut self,
        name: &str,
        manager: &str,
        version: &str,
        repository: Option<Repository>,
    ) -> Entry {
        self.vertex(Vertex::PackageInformation {
            name: name.to_string(),
            manager: manager.to_string(),
            version: version.to_string(),
            repository,
        })
    }

    pub fn definition_result(&mut self) -> Entry {
        self.vertex(Vertex::DefinitionResult {})
    }

    pub fn reference_result(&mut self) -> Entry {
        self.vertex(Vertex::ReferenceResult {})
    }

    pub fn type_definition_result(&mut self) -> Entry {
        self.vertex(Vertex::TypeDefinitionResult {})
    }

    pub fn implementation_result(&mut self) -> Entry {
        self.vertex(Vertex::ImplementationResult {})
    }

    pub fn hover_result(&mut self, hover: Hover) -> Entry {
        self.vertex(Vertex::HoverResult { result: hover })
    }

    // --- Edges ---

    pub fn contains(&mut self, out_v: Id, in_vs: Vec<Id>) -> Entry {
        self.edge(Edge::Contains { out_v, in_vs })
    }

    pub fn next(&mut self, out_v: Id, in_v: Id) -> Entry {
        self.edge(Edge::Next { out_v, in_v })
    }

    pub fn item(
        &mut self,
        out_v: Id,
        in_vs: Vec<Id>,
        shard: Id,
        property: Option<ItemProperty>,
    ) -> Entry {
        self.edge(Edge::Item {
            out_v,
            in_vs,
            shard,
            property,
        })
    }

    pub fn moniker_edge(&mut self, out_v: Id, in_v: Id) -> Entry {
        self.edge(Edge::Moniker { out_v, in_v })
    }

    pub fn package_information_edge(&mut self, out_v: Id, in_v: Id) -> Entry {
        self.edge(Edge::PackageInformation { out_v, in_v })
    }

    pub fn definition_edge(&mut self, out_v: Id, in_v: Id) -> Entry {
        self.edge(Edge::Definition { out_v, in_v })
    }

    pub fn references_edge(&mut self, out_v: Id, in_v: Id) -> Entry {
        self.edge(Edge::References { out_v, in_v })
    }

    pub fn type_definition_edge(&mut self, out_v: Id, in_v: Id) -> Entry {
        self.edge(Edge::TypeDefinition { out_v, in_v })
    }

    pub fn implementation_edge(&mut self, out_v: Id, in_v: Id) -> Entry {
        self.edge(Edge::Implementation { out_v, in_v })
    }

    pub fn hover_edge(&mut self, out_v: Id, in_v: Id) -> Entry {
        self.edge(Edge::Hover { out_v, in_v })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_ids_start_at_one() {
        let mut ids = IdGenerator::new(IdKind::Number);
        assert_eq!(ids.next(), Id::Number(1));
        assert_eq!(ids.next(), Id::Number(2));
    }

    #[test]
    fn test_uuid_ids_are_distinct() {
        let mut ids = IdGenerator::new(IdKind::Uuid);
        let a = ids.next();
        let b = ids.next();
        assert_ne!(a, b);
    }

    #[test]
    fn test_no_contents_drops_document_text() {
        let mut builder = Builder::new(IdKind::Number, true);
        let doc = builder.document("file:///w/a.ts", "typescript", Some("const a = 1;"));
        match doc.payload {
            Payload::Vertex(Vertex::Document { contents, .. }) => assert!(contents.is_none()),
            other => panic!("unexpected payload: {other:?}"),
        }
    }
}
