use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::checker::{
    AliasPair, DocumentInfo, DocumentRef, ProjectInfo, SymbolInfo, SymbolRef, Typechecker,
};
use crate::error::{Result, WaypostError};

/// The shipped `Typechecker` implementation: a workspace snapshot exported
/// by a compiler frontend, deserialized from JSON. Loading validates every
/// cross-reference and precomputes the canonical identity of each symbol.
pub struct Snapshot {
    language: String,
    projects: Vec<ProjectInfo>,
    documents: Vec<DocumentInfo>,
    symbols: Vec<SymbolInfo>,
    aliases: Vec<AliasPair>,
    symbol_paths: Vec<String>,
    identities: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotData {
    #[serde(default = "default_language")]
    language: String,
    projects: Vec<ProjectInfo>,
    documents: Vec<DocumentInfo>,
    symbols: Vec<SymbolInfo>,
    #[serde(default)]
    aliases: Vec<AliasPair>,
}

fn default_language() -> String {
    "typescript".to_string()
}

impl Snapshot {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let data: SnapshotData = serde_json::from_str(&raw)
            .map_err(|e| WaypostError::Snapshot(format!("{}: {e}", path.display())))?;
        Self::from_data(data)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let data: SnapshotData =
            serde_json::from_str(raw).map_err(|e| WaypostError::Snapshot(e.to_string()))?;
        Self::from_data(data)
    }

    /// Builds a snapshot from already-assembled parts. Used by frontends
    /// linking against the library and by the test suites.
    pub fn new(
        language: &str,
        projects: Vec<ProjectInfo>,
        documents: Vec<DocumentInfo>,
        symbols: Vec<SymbolInfo>,
        aliases: Vec<AliasPair>,
    ) -> Result<Self> {
        Self::from_data(SnapshotData {
            language: language.to_string(),
            projects,
            documents,
            symbols,
            aliases,
        })
    }

    fn from_data(data: SnapshotData) -> Result<Self> {
        let SnapshotData {
            language,
            projects,
            documents,
            mut symbols,
            aliases,
        } = data;

        validate_refs(&projects, &documents, &symbols, &aliases)?;
        assign_anonymous_names(&mut symbols);
        let symbol_paths = compute_symbol_paths(&symbols)?;
        let identities = compute_identities(&symbols, &documents, &symbol_paths);

        Ok(Self {
            language,
            projects,
            documents,
            symbols,
            aliases,
            symbol_paths,
            identities,
        })
    }
}

fn validate_refs(
    projects: &[ProjectInfo],
    documents: &[DocumentInfo],
    symbols: &[SymbolInfo],
    aliases: &[AliasPair],
) -> Result<()> {
    let document_ok = |d: DocumentRef| (d.0 as usize) < documents.len();
    let symbol_ok = |s: SymbolRef| (s.0 as usize) < symbols.len();

    for project in projects {
        for document in &project.documents {
            if !document_ok(*document) {
                return Err(WaypostError::Snapshot(format!(
                    "project `{}` references unknown document {}",
                    project.name, document.0
                )));
            }
        }
        for reference in &project.references {
            if !projects.iter().any(|p| &p.name == reference) {
                return Err(WaypostError::Snapshot(format!(
                    "project `{}` references unknown project `{reference}`",
                    project.name
                )));
            }
        }
    }
    for document in documents {
        for occurrence in &document.occurrences {
            if !symbol_ok(occurrence.symbol) {
                return Err(WaypostError::Snapshot(format!(
                    "document `{}` references unknown symbol {}",
                    document.path.display(),
                    occurrence.symbol.0
                )));
            }
        }
    }
    for (index, symbol) in symbols.iter().enumerate() {
        if let Some(parent) = symbol.parent {
            if !symbol_ok(parent) {
                return Err(WaypostError::Snapshot(format!(
                    "symbol {index} has unknown parent {}",
                    parent.0
                )));
            }
        }
        for declaration in &symbol.declarations {
            if !document_ok(declaration.document) {
                return Err(WaypostError::Snapshot(format!(
                    "symbol {index} declared in unknown document {}",
                    declaration.document.0
                )));
            }
        }
        if let Some(type_of) = symbol.type_of {
            if !symbol_ok(type_of) {
                return Err(WaypostError::Snapshot(format!(
                    "symbol {index} typed as unknown symbol {}",
                    type_of.0
                )));
            }
        }
        for implemented in &symbol.implements {
            if !symbol_ok(*implemented) {
                return Err(WaypostError::Snapshot(format!(
                    "symbol {index} implements unknown symbol {}",
                    implemented.0
                )));
            }
        }
    }
    for pair in aliases {
        if !symbol_ok(pair.alias) || !symbol_ok(pair.target) {
            return Err(WaypostError::Snapshot(
                "alias pair references unknown symbol".to_string(),
            ));
        }
    }
    Ok(())
}

/// Anonymous scopes get synthetic `[N]` segments, numbered per parent in
/// declaration order. The numbering is stable across runs for a fixed
/// snapshot.
fn assign_anonymous_names(symbols: &mut [SymbolInfo]) {
    use std::collections::HashMap;
    let mut counters: HashMap<Option<SymbolRef>, u32> = HashMap::new();
    for symbol in symbols.iter_mut() {
        if symbol.name.is_none() {
            let counter = counters.entry(symbol.parent).or_insert(0);
            symbol.name = Some(format!("[{counter}]"));
            *counter += 1;
        }
    }
}

fn compute_symbol_paths(symbols: &[SymbolInfo]) -> Result<Vec<String>> {
    let mut paths: Vec<Option<String>> = vec![None; symbols.len()];
    for index in 0..symbols.len() {
        build_symbol_path(symbols, index, &mut paths)?;
    }
    Ok(paths.into_iter().map(Option::unwrap).collect())
}

fn build_symbol_path(
    symbols: &[SymbolInfo],
    index: usize,
    paths: &mut [Option<String>],
) -> Result<String> {
    if let Some(ready) = &paths[index] {
        return Ok(ready.clone());
    }
    let mut segments = Vec::new();
    let mut current = index;
    loop {
        if segments.len() > symbols.len() {
            return Err(WaypostError::Snapshot(format!(
                "cycle in symbol parent chain at symbol {index}"
            )));
        }
        let symbol = &symbols[current];
        segments.push(symbol.name.clone().unwrap_or_default());
        match symbol.parent {
            Some(parent) => {
                if let Some(ready) = &paths[parent.0 as usize] {
                    segments.push(ready.clone());
                    break;
                }
                current = parent.0 as usize;
            }
            None => break,
        }
    }
    segments.reverse();
    let path = segments.join(".");
    paths[index] = Some(path.clone());
    Ok(path)
}

/// The declaring module of a symbol: its declaration file path without the
/// source extension, with forward slashes.
fn module_of(symbols: &[SymbolInfo], documents: &[DocumentInfo], index: usize) -> Option<String> {
    let symbol = &symbols[index];
    let path = match symbol.declarations.first() {
        Some(declaration) => &documents[declaration.document.0 as usize].path,
        None => symbol.external_file.as_deref()?,
    };
    let mut parts: Vec<String> = path
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    let last = parts.pop()?;
    parts.push(crate::moniker::strip_source_extension(&last).to_string());
    Some(parts.join("/"))
}

/// Canonical identities: `<module>:<symbol path>`, disambiguated with the
/// first declaration position when two distinct symbols collide (a re-export
/// alias shares name and module with its target). First-come claims the
/// plain form, so the assignment is stable across runs.
fn compute_identities(
    symbols: &[SymbolInfo],
    documents: &[DocumentInfo],
    symbol_paths: &[String],
) -> Vec<String> {
    use std::collections::HashMap;
    let mut claimed: HashMap<String, usize> = HashMap::new();
    let mut identities = Vec::with_capacity(symbols.len());
    for index in 0..symbols.len() {
        let module = module_of(symbols, documents, index)
            .unwrap_or_else(|| format!("[unresolved-{index}]"));
        let mut identity = format!("{module}:{}", symbol_paths[index]);
        if claimed.contains_key(&identity) {
            match symbols[index].declarations.first() {
                Some(declaration) => {
                    identity.push_str(&format!(
                        "@{}:{}",
                        declaration.span.start.line, declaration.span.start.character
                    ));
                }
                None => identity.push_str(&format!("#{index}")),
            }
        }
        claimed.insert(identity.clone(), index);
        identities.push(identity);
    }
    identities
}

impl Typechecker for Snapshot {
    fn language(&self) -> &str {
        &self.language
    }

    fn projects(&self) -> &[ProjectInfo] {
        &self.projects
    }

    fn document(&self, document: DocumentRef) -> &DocumentInfo {
        &self.documents[document.0 as usize]
    }

    fn symbol(&self, symbol: SymbolRef) -> &SymbolInfo {
        &self.symbols[symbol.0 as usize]
    }

    fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    fn symbol_path(&self, symbol: SymbolRef) -> &str {
        &self.symbol_paths[symbol.0 as usize]
    }

    fn identity(&self, symbol: SymbolRef) -> &str {
        &self.identities[symbol.0 as usize]
    }

    fn aliases(&self) -> &[AliasPair] {
        &self.aliases
    }
}
