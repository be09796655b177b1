use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;

/// Per-project summary handed to `report_status`.
#[derive(Debug, Clone)]
pub struct ProjectStatus {
    pub project: String,
    pub symbols: usize,
    pub documents: usize,
    pub elapsed_ms: u128,
}

/// Diagnostic payload for a symbol classified document-local but referenced
/// from another document.
#[derive(Debug, Clone)]
pub struct InternalSymbol {
    pub identity: String,
    pub name: String,
    pub declarations: Vec<String>,
    pub reference: String,
}

/// Progress and diagnostics sink. Reporters never write to the dump's sink;
/// stdout stays reserved for the element stream.
pub trait Reporter {
    fn begin(&mut self) {}
    fn end(&mut self) {}
    /// Cumulative document count tick.
    fn report_progress(&mut self, _documents: usize) {}
    fn report_status(&mut self, _status: &ProjectStatus) {}
    fn report_internal_symbol(&mut self, _symbol: &InternalSymbol) {}
}

pub struct NullReporter;

impl Reporter for NullReporter {}

/// Writes the progress trace to an arbitrary stream, stderr by default.
pub struct StreamReporter {
    out: Box<dyn Write>,
}

impl StreamReporter {
    pub fn stderr() -> Self {
        Self {
            out: Box::new(std::io::stderr()),
        }
    }

    pub fn new(out: Box<dyn Write>) -> Self {
        Self { out }
    }
}

impl Reporter for StreamReporter {
    fn begin(&mut self) {
        let _ = writeln!(self.out, "indexing started");
    }

    fn end(&mut self) {
        let _ = writeln!(self.out, "indexing finished");
        let _ = self.out.flush();
    }

    fn report_progress(&mut self, documents: usize) {
        let _ = writeln!(self.out, "documents processed: {documents}");
    }

    fn report_status(&mut self, status: &ProjectStatus) {
        let _ = writeln!(
            self.out,
            "project {}: {} symbols, {} documents, {} ms",
            status.project, status.symbols, status.documents, status.elapsed_ms
        );
    }

    fn report_internal_symbol(&mut self, symbol: &InternalSymbol) {
        let _ = writeln!(
            self.out,
            "symbol `{}` ({}) treated as internal although referenced from {}; declared at: {}",
            symbol.name,
            symbol.identity,
            symbol.reference,
            symbol.declarations.join(", ")
        );
    }
}

/// Appends the progress trace to a file.
pub struct FileReporter {
    inner: StreamReporter,
}

impl FileReporter {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            inner: StreamReporter::new(Box::new(BufWriter::new(file))),
        })
    }
}

impl Reporter for FileReporter {
    fn begin(&mut self) {
        self.inner.begin();
    }

    fn end(&mut self) {
        self.inner.end();
    }

    fn report_progress(&mut self, documents: usize) {
        self.inner.report_progress(documents);
    }

    fn report_status(&mut self, status: &ProjectStatus) {
        self.inner.report_status(status);
    }

    fn report_internal_symbol(&mut self, symbol: &InternalSymbol) {
        self.inner.report_internal_symbol(symbol);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_reporter_writes_trace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.log");
        {
            let mut reporter = FileReporter::create(&path).unwrap();
            reporter.begin();
            reporter.report_progress(2);
            reporter.report_status(&ProjectStatus {
                project: "app".to_string(),
                symbols: 5,
                documents: 2,
                elapsed_ms: 1,
            });
            reporter.end();
        }
        let trace = std::fs::read_to_string(&path).unwrap();
        assert!(trace.contains("documents processed: 2"));
        assert!(trace.contains("project app: 5 symbols"));
    }
}
