//! JSONL interchange format for entries.

use anyhow::Result;

use crate::models::Entry;

/// Serialize entries as newline-delimited JSON, one object per entry in
/// input order. Every line, including the last, ends with `\n`.
pub fn convert_entries_to_jsonl(entries: &[Entry]) -> Result<String> {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&serde_json::to_string(entry)?);
        out.push('\n');
    }
    Ok(out)
}

/// Parse JSONL produced by [`convert_entries_to_jsonl`]. Blank lines are
/// ignored.
pub fn parse_jsonl_entries(jsonl: &str) -> Result<Vec<Entry>> {
    jsonl
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| Ok(serde_json::from_str(line)?))
        .collect()
}
