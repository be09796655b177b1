pub mod snapshot;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::graph::Position;

pub use snapshot::Snapshot;

/// Handle to a symbol inside the type-checker façade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolRef(pub u32);

/// Handle to a document inside the type-checker façade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentRef(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

/// How an occurrence relates to its symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OccurrenceKind {
    Declaration,
    Definition,
    Reference,
    TypeReference,
}

/// One syntactic occurrence of a symbol in a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Occurrence {
    pub span: Span,
    pub symbol: SymbolRef,
    pub kind: OccurrenceKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Declaration {
    pub document: DocumentRef,
    pub span: Span,
}

/// One compilation unit as the type checker sees it. Paths are relative to
/// the workspace root.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInfo {
    pub name: String,
    pub root: PathBuf,
    #[serde(default)]
    pub manifest: Option<PathBuf>,
    #[serde(default)]
    pub references: Vec<String>,
    pub documents: Vec<DocumentRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentInfo {
    pub path: PathBuf,
    #[serde(default = "default_language_id")]
    pub language_id: String,
    #[serde(default)]
    pub contents: Option<String>,
    #[serde(default)]
    pub occurrences: Vec<Occurrence>,
}

fn default_language_id() -> String {
    "typescript".to_string()
}

/// Everything the façade reports about one symbol. `name` is `None` for
/// anonymous scopes; the snapshot loader assigns them `[N]` segments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub parent: Option<SymbolRef>,
    #[serde(default)]
    pub declarations: Vec<Declaration>,
    /// Declaration file inside a dependency package, for symbols that
    /// originate outside the workspace's own documents.
    #[serde(default)]
    pub external_file: Option<PathBuf>,
    #[serde(default)]
    pub hover: Option<String>,
    #[serde(default)]
    pub exported: bool,
    /// True when the declaring scope transcends a single document.
    #[serde(default)]
    pub cross_document: bool,
    /// The symbol this one is typed as, feeding type-definition results.
    #[serde(default)]
    pub type_of: Option<SymbolRef>,
    /// Interfaces this symbol implements, feeding implementation results.
    #[serde(default)]
    pub implements: Vec<SymbolRef>,
}

/// An aliasing relationship: `alias` denotes `target`'s declaration
/// (re-export, `export =`, assignment).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AliasPair {
    pub alias: SymbolRef,
    pub target: SymbolRef,
}

/// Read-only façade over an already-resolved program. Shared across the
/// whole pipeline; never re-entered during a project walk.
pub trait Typechecker {
    fn language(&self) -> &str;
    fn projects(&self) -> &[ProjectInfo];
    fn document(&self, document: DocumentRef) -> &DocumentInfo;
    fn symbol(&self, symbol: SymbolRef) -> &SymbolInfo;
    fn symbol_count(&self) -> usize;
    /// The dotted symbol path through the parent chain (`a.b.[0].c`), used
    /// in moniker identifiers.
    fn symbol_path(&self, symbol: SymbolRef) -> &str;
    /// The canonical identity: declaring module plus symbol path, unique per
    /// symbol and stable across runs. Doubles as the identifier of fallback
    /// `local` monikers.
    fn identity(&self, symbol: SymbolRef) -> &str;
    fn aliases(&self) -> &[AliasPair];

    /// Path of the canonical declaration: the first in-workspace declaration
    /// site, or the external dependency file.
    fn declaring_path(&self, symbol: SymbolRef) -> Option<&Path> {
        let info = self.symbol(symbol);
        if let Some(declaration) = info.declarations.first() {
            Some(&self.document(declaration.document).path)
        } else {
            info.external_file.as_deref()
        }
    }
}
