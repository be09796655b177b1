use std::collections::{HashMap, HashSet};

use crate::error::{Result, WaypostError};
use crate::graph::{Edge, Entry, EventKind, EventScope, Id, Payload, Vertex};

/// Outcome of a single-pass dump validation.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub elements: usize,
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Parses a dump in either framing (JSON array or one value per line) and
/// checks the stream properties consumers rely on: unique ids,
/// edge-before-use, one navigational edge per label, range containment, and
/// document closure.
pub fn validate_dump(raw: &str) -> Result<ValidationReport> {
    let entries = parse_entries(raw)?;
    let mut validator = Validator::default();
    for entry in &entries {
        validator.process(entry);
    }
    Ok(validator.finish(entries.len()))
}

fn parse_entries(raw: &str) -> Result<Vec<Entry>> {
    if raw.trim_start().starts_with('[') {
        return Ok(serde_json::from_str(raw)?);
    }
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            serde_json::from_str(line)
                .map_err(|e| WaypostError::InvalidDump(format!("unparseable element: {e}")))
        })
        .collect()
}

#[derive(Default)]
struct Validator {
    vertex_labels: HashMap<Id, &'static str>,
    edge_ids: HashSet<Id>,
    nav_edges: HashSet<(Id, &'static str)>,
    range_next: HashMap<Id, usize>,
    range_contained: HashMap<Id, usize>,
    closed_documents: HashSet<Id>,
    head_labels: Vec<&'static str>,
    errors: Vec<String>,
}

const NAVIGATIONAL: &[&str] = &[
    "textDocument/definition",
    "textDocument/references",
    "textDocument/typeDefinition",
    "textDocument/implementation",
    "textDocument/hover",
];

impl Validator {
    fn known(&self, id: &Id) -> bool {
        self.vertex_labels.contains_key(id) || self.edge_ids.contains(id)
    }

    fn process(&mut self, entry: &Entry) {
        if self.head_labels.len() < 3 {
            self.head_labels.push(match &entry.payload {
                Payload::Vertex(vertex) => vertex.label(),
                Payload::Edge(edge) => edge.label(),
            });
        }
        match &entry.payload {
            Payload::Vertex(vertex) => self.process_vertex(&entry.id, vertex),
            Payload::Edge(edge) => self.process_edge(&entry.id, edge),
        }
    }

    fn process_vertex(&mut self, id: &Id, vertex: &Vertex) {
        if self.known(id) {
            self.errors.push(format!("duplicate id {id}"));
            return;
        }
        if let Vertex::Event { kind, scope, data } = vertex {
            if !self.known(data) {
                self.errors
                    .push(format!("event {id} references unknown element {data}"));
            }
            if *kind == EventKind::End && *scope == EventScope::Document {
                self.closed_documents.insert(data.clone());
            }
        }
        self.vertex_labels.insert(id.clone(), vertex.label());
    }

    fn process_edge(&mut self, id: &Id, edge: &Edge) {
        if self.known(id) {
            self.errors.push(format!("duplicate id {id}"));
            return;
        }
        self.edge_ids.insert(id.clone());

        let out_v = edge.out_v();
        if !self.vertex_labels.contains_key(out_v) {
            self.errors
                .push(format!("edge {id} uses unemitted outV {out_v}"));
        }
        for in_v in edge.in_vs() {
            if !self.vertex_labels.contains_key(in_v) {
                self.errors
                    .push(format!("edge {id} uses unemitted inV {in_v}"));
            }
        }

        let label = edge.label();
        if NAVIGATIONAL.contains(&label)
            && !self.nav_edges.insert((out_v.clone(), label))
        {
            self.errors.push(format!(
                "result set {out_v} has two outgoing `{label}` edges"
            ));
        }

        match edge {
            Edge::Next { out_v, in_v } => {
                if self.vertex_labels.get(out_v) == Some(&"range") {
                    *self.range_next.entry(out_v.clone()).or_insert(0) += 1;
                    if self.vertex_labels.get(in_v) != Some(&"resultSet") {
                        self.errors.push(format!(
                            "range {out_v} has a next edge to a non-result-set {in_v}"
                        ));
                    }
                }
            }
            Edge::Contains { out_v, in_vs } => {
                if self.vertex_labels.get(out_v) == Some(&"document") {
                    if self.closed_documents.contains(out_v) {
                        self.errors.push(format!(
                            "contains edge {id} emitted after document {out_v} ended"
                        ));
                    }
                    for in_v in in_vs {
                        *self.range_contained.entry(in_v.clone()).or_insert(0) += 1;
                    }
                }
            }
            Edge::Item { shard, .. } => {
                if self.closed_documents.contains(shard) {
                    self.errors.push(format!(
                        "item edge {id} emitted after its shard document {shard} ended"
                    ));
                }
            }
            _ => {}
        }
    }

    fn finish(mut self, elements: usize) -> ValidationReport {
        match self.head_labels.as_slice() {
            ["metaData", "source", "capabilities", ..] => {}
            head => self.errors.push(format!(
                "dump must start with metaData, source, capabilities; found {head:?}"
            )),
        }
        for (id, label) in &self.vertex_labels {
            if *label != "range" {
                continue;
            }
            match self.range_contained.get(id).copied().unwrap_or(0) {
                1 => {}
                n => self
                    .errors
                    .push(format!("range {id} contained by {n} documents")),
            }
            match self.range_next.get(id).copied().unwrap_or(0) {
                1 => {}
                n => self.errors.push(format!("range {id} has {n} next edges")),
            }
        }
        for (id, label) in &self.vertex_labels {
            if *label == "document" && !self.closed_documents.contains(id) {
                self.errors.push(format!("document {id} was never closed"));
            }
        }
        ValidationReport {
            elements,
            errors: self.errors,
        }
    }
}
