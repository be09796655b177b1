use serde::{Deserialize, Serialize};

/// Graph element identifier. The generation policy (sequential numbers or
/// UUIDv4 strings) is chosen at startup; consumers must treat both shapes as
/// opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    Number(u64),
    Uuid(String),
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Id::Number(n) => write!(f, "{n}"),
            Id::Uuid(s) => write!(f, "{s}"),
        }
    }
}

/// A single element of the dump: a vertex or an edge, with its identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub id: Id,
    #[serde(flatten)]
    pub payload: Payload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Payload {
    Vertex(Vertex),
    Edge(Edge),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Begin,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventScope {
    Project,
    Document,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonikerKind {
    Import,
    Export,
    Local,
}

/// How widely a moniker identifier is unique (LSIF 0.6 `unique` field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UniquenessLevel {
    Document,
    Project,
    Group,
    Scheme,
    Global,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MarkedString {
    Plain(String),
    Code { language: String, value: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hover {
    pub contents: Vec<MarkedString>,
}

/// The closed set of vertex variants the pipeline produces. `label`
/// discriminates the payload on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "label", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Vertex {
    MetaData {
        version: String,
        project_root: String,
        position_encoding: String,
        tool_info: ToolInfo,
    },
    Source {
        workspace_root: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        repository: Option<Repository>,
    },
    Capabilities {
        hover_provider: bool,
        declaration_provider: bool,
        definition_provider: bool,
        type_definition_provider: bool,
        references_provider: bool,
        implementation_provider: bool,
    },
    #[serde(rename = "$event")]
    Event {
        kind: EventKind,
        scope: EventScope,
        data: Id,
    },
    Project {
        kind: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        resource: Option<String>,
    },
    Document {
        uri: String,
        language_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        contents: Option<String>,
    },
    Range {
        start: Position,
        end: Position,
    },
    ResultSet {},
    Moniker {
        scheme: String,
        identifier: String,
        kind: MonikerKind,
        unique: UniquenessLevel,
    },
    PackageInformation {
        name: String,
        manager: String,
        version: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        repository: Option<Repository>,
    },
    DefinitionResult {},
    ReferenceResult {},
    TypeDefinitionResult {},
    ImplementationResult {},
    HoverResult {
        result: Hover,
    },
}

impl Vertex {
    pub fn label(&self) -> &'static str {
        match self {
            Vertex::MetaData { .. } => "metaData",
            Vertex::Source { .. } => "source",
            Vertex::Capabilities { .. } => "capabilities",
            Vertex::Event { .. } => "$event",
            Vertex::Project { .. } => "project",
            Vertex::Document { .. } => "document",
            Vertex::Range { .. } => "range",
            Vertex::ResultSet {} => "resultSet",
            Vertex::Moniker { .. } => "moniker",
            Vertex::PackageInformation { .. } => "packageInformation",
            Vertex::DefinitionResult {} => "definitionResult",
            Vertex::ReferenceResult {} => "referenceResult",
            Vertex::TypeDefinitionResult {} => "typeDefinitionResult",
            Vertex::ImplementationResult {} => "implementationResult",
            Vertex::HoverResult { .. } => "hoverResult",
        }
    }
}

/// The scoping property of an `item` edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemProperty {
    Declarations,
    Definitions,
    References,
    ReferenceResults,
}

/// The closed set of edge variants. Every edge names already-emitted
/// endpoints; 1:n edges carry `inVs`, 1:1 edges carry `inV`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "label", rename_all_fields = "camelCase")]
pub enum Edge {
    #[serde(rename = "contains")]
    Contains { out_v: Id, in_vs: Vec<Id> },
    #[serde(rename = "next")]
    Next { out_v: Id, in_v: Id },
    #[serde(rename = "item")]
    Item {
        out_v: Id,
        in_vs: Vec<Id>,
        shard: Id,
        #[serde(skip_serializing_if = "Option::is_none")]
        property: Option<ItemProperty>,
    },
    #[serde(rename = "moniker")]
    Moniker { out_v: Id, in_v: Id },
    #[serde(rename = "packageInformation")]
    PackageInformation { out_v: Id, in_v: Id },
    #[serde(rename = "textDocument/definition")]
    Definition { out_v: Id, in_v: Id },
    #[serde(rename = "textDocument/references")]
    References { out_v: Id, in_v: Id },
    #[serde(rename = "textDocument/typeDefinition")]
    TypeDefinition { out_v: Id, in_v: Id },
    #[serde(rename = "textDocument/implementation")]
    Implementation { out_v: Id, in_v: Id },
    #[serde(rename = "textDocument/hover")]
    Hover { out_v: Id, in_v: Id },
}

impl Edge {
    pub fn label(&self) -> &'static str {
        match self {
            Edge::Contains { .. } => "contains",
            Edge::Next { .. } => "next",
            Edge::Item { .. } => "item",
            Edge::Moniker { .. } => "moniker",
            Edge::PackageInformation { .. } => "packageInformation",
            Edge::Definition { .. } => "textDocument/definition",
            Edge::References { .. } => "textDocument/references",
            Edge::TypeDefinition { .. } => "textDocument/typeDefinition",
            Edge::Implementation { .. } => "textDocument/implementation",
            Edge::Hover { .. } => "textDocument/hover",
        }
    }

    pub fn out_v(&self) -> &Id {
        match self {
            Edge::Contains { out_v, .. }
            | Edge::Next { out_v, .. }
            | Edge::Item { out_v, .. }
            | Edge::Moniker { out_v, .. }
            | Edge::PackageInformation { out_v, .. }
            | Edge::Definition { out_v, .. }
            | Edge::References { out_v, .. }
            | Edge::TypeDefinition { out_v, .. }
            | Edge::Implementation { out_v, .. }
            | Edge::Hover { out_v, .. } => out_v,
        }
    }

    pub fn in_vs(&self) -> Vec<&Id> {
        match self {
            Edge::Contains { in_vs, .. } | Edge::Item { in_vs, .. } => in_vs.iter().collect(),
            Edge::Next { in_v, .. }
            | Edge::Moniker { in_v, .. }
            | Edge::PackageInformation { in_v, .. }
            | Edge::Definition { in_v, .. }
            | Edge::References { in_v, .. }
            | Edge::TypeDefinition { in_v, .. }
            | Edge::Implementation { in_v, .. }
            | Edge::Hover { in_v, .. } => vec![in_v],
        }
    }

    /// The shard document for `item` edges.
    pub fn shard(&self) -> Option<&Id> {
        match self {
            Edge::Item { shard, .. } => Some(shard),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_wire_shape() {
        let entry = Entry {
            id: Id::Number(1),
            payload: Payload::Vertex(Vertex::MetaData {
                version: "0.6.0".to_string(),
                project_root: "file:///workspace".to_string(),
                position_encoding: "utf-16".to_string(),
                tool_info: ToolInfo {
                    name: "waypost".to_string(),
                    version: None,
                    args: Vec::new(),
                },
            }),
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["id"], 1);
        assert_eq!(value["type"], "vertex");
        assert_eq!(value["label"], "metaData");
        assert_eq!(value["positionEncoding"], "utf-16");
    }

    #[test]
    fn test_edge_wire_shape() {
        let entry = Entry {
            id: Id::Number(7),
            payload: Payload::Edge(Edge::Item {
                out_v: Id::Number(3),
                in_vs: vec![Id::Number(4), Id::Number(5)],
                shard: Id::Number(2),
                property: Some(ItemProperty::References),
            }),
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["type"], "edge");
        assert_eq!(value["label"], "item");
        assert_eq!(value["outV"], 3);
        assert_eq!(value["inVs"], serde_json::json!([4, 5]));
        assert_eq!(value["property"], "references");
    }

    #[test]
    fn test_entry_round_trips_through_json() {
        let entry = Entry {
            id: Id::Uuid("3d1b3bcb-7a5e-4a04-a6ab-9a7fcd4c2a8d".to_string()),
            payload: Payload::Edge(Edge::Next {
                out_v: Id::Number(10),
                in_v: Id::Number(11),
            }),
        };
        let text = serde_json::to_string(&entry).unwrap();
        let back: Entry = serde_json::from_str(&text).unwrap();
        match back.payload {
            Payload::Edge(Edge::Next { out_v, in_v }) => {
                assert_eq!(out_v, Id::Number(10));
                assert_eq!(in_v, Id::Number(11));
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }
}
