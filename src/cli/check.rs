use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::{Result, WaypostError};
use crate::validate::validate_dump;

pub fn run(dump: &Path) -> Result<()> {
    let raw = fs::read_to_string(dump)?;
    let report = validate_dump(&raw)?;
    if report.is_ok() {
        info!("{}: {} elements, no violations", dump.display(), report.elements);
        return Ok(());
    }
    for error in &report.errors {
        eprintln!("{}: {error}", dump.display());
    }
    Err(WaypostError::InvalidDump(format!(
        "{} violation(s) in {} elements",
        report.errors.len(),
        report.elements
    )))
}
