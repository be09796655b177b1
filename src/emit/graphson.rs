use std::io::Write;

use serde_json::{json, Map, Value};

use crate::emit::Emitter;
use crate::error::Result;
use crate::graph::{Entry, Payload};

/// GraphSON records for graph-database ingestion: one JSON value per line,
/// vertices carrying their LSIF payload as properties, multi-target edges
/// expanded to one record per `inV`.
pub struct GraphSonEmitter {
    sink: Box<dyn Write>,
}

impl GraphSonEmitter {
    pub fn new(sink: Box<dyn Write>) -> Self {
        Self { sink }
    }

    fn write(&mut self, value: &Value) -> Result<()> {
        serde_json::to_writer(&mut self.sink, value)?;
        self.sink.write_all(b"\n")?;
        Ok(())
    }
}

/// GraphSON wraps each property value in a single-element list of
/// `{id, value}` records.
fn properties(entry: &Entry) -> Result<Map<String, Value>> {
    let raw = serde_json::to_value(entry)?;
    let mut out = Map::new();
    if let Value::Object(fields) = raw {
        for (key, value) in fields {
            if key == "id" || key == "type" || key == "label" {
                continue;
            }
            out.insert(key, json!([{ "id": entry.id, "value": value }]));
        }
    }
    Ok(out)
}

impl Emitter for GraphSonEmitter {
    fn emit(&mut self, entry: &Entry) -> Result<()> {
        match &entry.payload {
            Payload::Vertex(vertex) => {
                let record = json!({
                    "id": entry.id,
                    "label": vertex.label(),
                    "type": "vertex",
                    "properties": Value::Object(properties(entry)?),
                });
                self.write(&record)?;
            }
            Payload::Edge(edge) => {
                for in_v in edge.in_vs() {
                    let record = json!({
                        "id": entry.id,
                        "label": edge.label(),
                        "type": "edge",
                        "outV": edge.out_v(),
                        "inV": in_v,
                    });
                    self.write(&record)?;
                }
            }
        }
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.sink.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, Id, Vertex};
    use crate::test_utils::SharedSink;

    #[test]
    fn test_vertex_record_shape() {
        let sink = SharedSink::default();
        let mut emitter = GraphSonEmitter::new(Box::new(sink.clone()));
        emitter
            .emit(&Entry {
                id: Id::Number(1),
                payload: Payload::Vertex(Vertex::Document {
                    uri: "file:///w/a.ts".to_string(),
                    language_id: "typescript".to_string(),
                    contents: None,
                }),
            })
            .unwrap();
        emitter.end().unwrap();

        let record: Value = serde_json::from_str(sink.contents().lines().next().unwrap()).unwrap();
        assert_eq!(record["type"], "vertex");
        assert_eq!(record["label"], "document");
        assert_eq!(record["properties"]["uri"][0]["value"], "file:///w/a.ts");
    }

    #[test]
    fn test_edge_record_per_target() {
        let sink = SharedSink::default();
        let mut emitter = GraphSonEmitter::new(Box::new(sink.clone()));
        emitter
            .emit(&Entry {
                id: Id::Number(9),
                payload: Payload::Edge(Edge::Contains {
                    out_v: Id::Number(1),
                    in_vs: vec![Id::Number(2), Id::Number(3)],
                }),
            })
            .unwrap();
        emitter.end().unwrap();
        assert_eq!(sink.contents().lines().count(), 2);
    }
}
