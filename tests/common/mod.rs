#![allow(dead_code)]

use std::cell::RefCell;
use std::io::Write;
use std::path::PathBuf;
use std::rc::Rc;

use waypost::checker::{
    AliasPair, Declaration, DocumentInfo, DocumentRef, Occurrence, OccurrenceKind, ProjectInfo,
    Snapshot, Span, SymbolInfo, SymbolRef,
};
use waypost::config::Config;
use waypost::driver::Driver;
use waypost::emit::LineEmitter;
use waypost::graph::{Edge, Entry, Id, Payload, Position, Vertex};
use waypost::report::{NullReporter, Reporter};

/// Write adapter sharing its buffer with the test body.
#[derive(Clone, Default)]
pub struct SharedSink(Rc<RefCell<Vec<u8>>>);

impl Write for SharedSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl SharedSink {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).unwrap()
    }
}

// --- Snapshot construction ---

pub fn span(line: u32, start: u32, end: u32) -> Span {
    Span {
        start: Position {
            line,
            character: start,
        },
        end: Position {
            line,
            character: end,
        },
    }
}

pub fn symbol(name: &str) -> SymbolInfo {
    SymbolInfo {
        name: Some(name.to_string()),
        parent: None,
        declarations: Vec::new(),
        external_file: None,
        hover: None,
        exported: false,
        cross_document: false,
        type_of: None,
        implements: Vec::new(),
    }
}

pub fn declared(mut info: SymbolInfo, document: u32, at: Span) -> SymbolInfo {
    info.declarations.push(Declaration {
        document: DocumentRef(document),
        span: at,
    });
    info
}

pub fn occurrence(symbol: u32, kind: OccurrenceKind, at: Span) -> Occurrence {
    Occurrence {
        span: at,
        symbol: SymbolRef(symbol),
        kind,
    }
}

pub fn document(path: &str, occurrences: Vec<Occurrence>) -> DocumentInfo {
    DocumentInfo {
        path: PathBuf::from(path),
        language_id: "typescript".to_string(),
        contents: None,
        occurrences,
    }
}

pub fn project(name: &str, root: &str, documents: &[u32], references: &[&str]) -> ProjectInfo {
    ProjectInfo {
        name: name.to_string(),
        root: PathBuf::from(root),
        manifest: None,
        references: references.iter().map(|r| r.to_string()).collect(),
        documents: documents.iter().map(|d| DocumentRef(*d)).collect(),
    }
}

pub fn alias(alias: u32, target: u32) -> AliasPair {
    AliasPair {
        alias: SymbolRef(alias),
        target: SymbolRef(target),
    }
}

// --- Pipeline execution ---

pub fn run_raw(snapshot: &Snapshot, config: &Config) -> String {
    run_raw_with_reporter(snapshot, config, Box::new(NullReporter))
}

pub fn run_raw_with_reporter(
    snapshot: &Snapshot,
    config: &Config,
    reporter: Box<dyn Reporter>,
) -> String {
    // Anchor default-rooted runs in a fresh directory so no manifest above
    // the checkout leaks into moniker resolution.
    let mut config = config.clone();
    let _anchor = if config.workspace_root == PathBuf::from(".") {
        let dir = tempfile::tempdir().unwrap();
        config.workspace_root = dir.path().to_path_buf();
        Some(dir)
    } else {
        None
    };
    let sink = SharedSink::default();
    let emitter = Box::new(LineEmitter::new(Box::new(sink.clone())));
    Driver::new(snapshot, &config, reporter)
        .run(emitter)
        .expect("pipeline failed");
    sink.contents()
}

pub fn run(snapshot: &Snapshot, config: &Config) -> Vec<Entry> {
    parse_dump(&run_raw(snapshot, config))
}

pub fn run_with_reporter(
    snapshot: &Snapshot,
    config: &Config,
    reporter: Box<dyn Reporter>,
) -> Vec<Entry> {
    parse_dump(&run_raw_with_reporter(snapshot, config, reporter))
}

pub fn parse_dump(raw: &str) -> Vec<Entry> {
    raw.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).expect("unparseable dump line"))
        .collect()
}

// --- Dump queries ---

pub fn label(entry: &Entry) -> &'static str {
    match &entry.payload {
        Payload::Vertex(vertex) => vertex.label(),
        Payload::Edge(edge) => edge.label(),
    }
}

pub fn vertices<'e>(entries: &'e [Entry], wanted: &str) -> Vec<&'e Entry> {
    entries
        .iter()
        .filter(|entry| matches!(&entry.payload, Payload::Vertex(_)) && label(entry) == wanted)
        .collect()
}

pub fn edges<'e>(entries: &'e [Entry], wanted: &str) -> Vec<&'e Edge> {
    entries
        .iter()
        .filter_map(|entry| match &entry.payload {
            Payload::Edge(edge) if edge.label() == wanted => Some(edge),
            _ => None,
        })
        .collect()
}

/// The document vertex id for a URI ending in `suffix`.
pub fn document_id(entries: &[Entry], suffix: &str) -> Id {
    entries
        .iter()
        .find_map(|entry| match &entry.payload {
            Payload::Vertex(Vertex::Document { uri, .. }) if uri.ends_with(suffix) => {
                Some(entry.id.clone())
            }
            _ => None,
        })
        .unwrap_or_else(|| panic!("no document with suffix {suffix}"))
}
