use std::io::Write;

use serde_json::{json, Value};

use crate::emit::Emitter;
use crate::error::Result;
use crate::graph::{Entry, Payload};

/// vis.js network data. Vertices become nodes, edges become one vis edge per
/// `inV`. The whole graph is buffered and written on `end`; the streaming
/// memory bound applies to the line/json formats, not to visualization
/// output.
pub struct VisEmitter {
    sink: Box<dyn Write>,
    nodes: Vec<Value>,
    edges: Vec<Value>,
}

impl VisEmitter {
    pub fn new(sink: Box<dyn Write>) -> Self {
        Self {
            sink,
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }
}

impl Emitter for VisEmitter {
    fn emit(&mut self, entry: &Entry) -> Result<()> {
        match &entry.payload {
            Payload::Vertex(vertex) => {
                self.nodes.push(json!({
                    "id": entry.id,
                    "label": vertex.label(),
                }));
            }
            Payload::Edge(edge) => {
                for in_v in edge.in_vs() {
                    self.edges.push(json!({
                        "from": edge.out_v(),
                        "to": in_v,
                        "label": edge.label(),
                    }));
                }
            }
        }
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        let graph = json!({
            "nodes": self.nodes,
            "edges": self.edges,
        });
        serde_json::to_writer(&mut self.sink, &graph)?;
        self.sink.write_all(b"\n")?;
        self.sink.flush()?;
        Ok(())
    }
}
