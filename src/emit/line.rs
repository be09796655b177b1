use std::io::Write;

use crate::emit::Emitter;
use crate::error::Result;
use crate::graph::Entry;

/// One JSON value per line.
pub struct LineEmitter {
    sink: Box<dyn Write>,
}

impl LineEmitter {
    pub fn new(sink: Box<dyn Write>) -> Self {
        Self { sink }
    }
}

impl Emitter for LineEmitter {
    fn emit(&mut self, entry: &Entry) -> Result<()> {
        serde_json::to_writer(&mut self.sink, entry)?;
        self.sink.write_all(b"\n")?;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.sink.flush()?;
        Ok(())
    }
}
