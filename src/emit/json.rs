use std::io::Write;

use crate::emit::Emitter;
use crate::error::Result;
use crate::graph::Entry;

/// A single top-level JSON array of elements.
pub struct JsonEmitter {
    sink: Box<dyn Write>,
    first: bool,
}

impl JsonEmitter {
    pub fn new(sink: Box<dyn Write>) -> Self {
        Self { sink, first: true }
    }
}

impl Emitter for JsonEmitter {
    fn start(&mut self) -> Result<()> {
        self.sink.write_all(b"[\n")?;
        Ok(())
    }

    fn emit(&mut self, entry: &Entry) -> Result<()> {
        if self.first {
            self.first = false;
        } else {
            self.sink.write_all(b",\n")?;
        }
        serde_json::to_writer(&mut self.sink, entry)?;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.sink.write_all(b"\n]\n")?;
        self.sink.flush()?;
        Ok(())
    }
}
