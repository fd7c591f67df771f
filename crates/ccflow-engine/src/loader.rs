use std::fs;
use std::path::Path;

use ccflow_types::Result;

use crate::schema::RawRecord;

/// Record kinds that are bookkeeping noise, not conversation.
const SKIPPED_KINDS: &[&str] = &["file-history-snapshot", "progress"];

/// Parse newline-delimited records from raw transcript text.
///
/// Malformed lines get a stderr warning with their 1-based line number and
/// are skipped; a broken line never aborts the load. Input order is
/// preserved as the traversal backbone.
pub fn parse_records(text: &str) -> Vec<RawRecord> {
    let mut records = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<RawRecord>(line) {
            Ok(record) => {
                if !SKIPPED_KINDS.contains(&record.kind.as_str()) {
                    records.push(record);
                }
            }
            Err(err) => {
                eprintln!(
                    "Warning: skipping malformed record at line {}: {}",
                    idx + 1,
                    err
                );
            }
        }
    }
    records
}

/// Load records from a JSONL transcript file.
pub fn load_records(path: &Path) -> Result<Vec<RawRecord>> {
    let text = fs::read_to_string(path)?;
    Ok(parse_records(&text))
}
