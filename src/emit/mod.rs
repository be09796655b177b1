mod graphson;
mod json;
mod line;
mod vis;

use std::io::Write;

use crate::config::OutputFormat;
use crate::error::Result;
use crate::graph::Entry;

pub use graphson::GraphSonEmitter;
pub use json::JsonEmitter;
pub use line::LineEmitter;
pub use vis::VisEmitter;

/// Framed, append-only writer over a byte sink. `start` and `end` bracket the
/// stream; `emit` appends one element in call order. Once an element is
/// emitted it is never modified or retracted.
pub trait Emitter {
    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    fn emit(&mut self, entry: &Entry) -> Result<()>;

    fn end(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Selects the emitter for the configured output format. The indexing core is
/// oblivious to which one is in play.
pub fn create_emitter(format: OutputFormat, sink: Box<dyn Write>) -> Box<dyn Emitter> {
    match format {
        OutputFormat::Line => Box::new(LineEmitter::new(sink)),
        OutputFormat::Json => Box::new(JsonEmitter::new(sink)),
        OutputFormat::Vis => Box::new(VisEmitter::new(sink)),
        OutputFormat::GraphSon => Box::new(GraphSonEmitter::new(sink)),
    }
}
