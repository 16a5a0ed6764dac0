//! Reading contacts from files or stdin.

use anyhow::Context;
use leadsync_core::Record;
use std::io::Read;
use std::path::Path;

/// Reads `path`, or stdin when `path` is `-`.
pub fn read_source(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read stdin")?;
        Ok(buffer)
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))
    }
}

/// Parses a JSON array of contacts.
///
/// A contact without an `email` key fails the whole batch: it is a malformed
/// request, not a record to reject.
pub fn parse_records(json: &str) -> anyhow::Result<Vec<Record>> {
    serde_json::from_str(json)
        .context("Input must be a JSON array of contacts, each with an \"email\" field")
}

/// Parses a single contact object.
pub fn parse_record(json: &str) -> anyhow::Result<Record> {
    serde_json::from_str(json).context("Input must be a JSON contact with an \"email\" field")
}
