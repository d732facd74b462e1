use std::collections::HashSet;

use anyhow::{Context, Result};
use log::warn;

use crate::models::ScanRecord;

/// Serialize the history, newest first, as a JSON array of records.
pub fn encode(records: &[ScanRecord]) -> Result<String> {
    serde_json::to_string(records).context("failed to encode scan history")
}

/// Parse a stored snapshot. Any malformed record rejects the whole snapshot;
/// repeated ids keep their first occurrence.
pub fn decode(raw: &str) -> Result<Vec<ScanRecord>> {
    let records: Vec<ScanRecord> =
        serde_json::from_str(raw).context("failed to decode scan history")?;

    let mut seen = HashSet::with_capacity(records.len());
    let total = records.len();
    let unique: Vec<ScanRecord> = records
        .into_iter()
        .filter(|record| seen.insert(record.id.clone()))
        .collect();

    if unique.len() != total {
        warn!(
            "Dropped {} duplicate scan record(s) from stored history",
            total - unique.len()
        );
    }

    Ok(unique)
}
