//! Writers for the collected records.
//!
//! The survey hands records over in discovery order. The JSON file is written
//! in that order; the CSV is written in ranked order (most reactions first).

use crate::error::OutputError;
use crate::types::AggregatedRecord;
use std::path::Path;

const GITHUB_PREFIX: &str = "https://github.com/";

/// Sorts records by total reaction count, descending. Ties keep discovery order.
pub fn rank_by_total(mut records: Vec<AggregatedRecord>) -> Vec<AggregatedRecord> {
    records.sort_by(|a, b| b.total_count.cmp(&a.total_count));
    records
}

/// Two-space indented JSON array with a trailing newline.
pub fn to_json(records: &[AggregatedRecord]) -> Result<String, OutputError> {
    let mut json = serde_json::to_string_pretty(records)?;
    json.push('\n');
    Ok(json)
}

/// One `count,url` line per record.
pub fn to_csv(records: &[AggregatedRecord]) -> String {
    records
        .iter()
        .map(|r| format!("{},{}\n", r.total_count, r.url))
        .collect()
}

pub async fn write_json(path: &Path, records: &[AggregatedRecord]) -> Result<(), OutputError> {
    write(path, to_json(records)?).await
}

pub async fn write_csv(path: &Path, records: &[AggregatedRecord]) -> Result<(), OutputError> {
    write(path, to_csv(records)).await
}

async fn write(path: &Path, contents: String) -> Result<(), OutputError> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|source| OutputError::Io {
            path: path.display().to_string(),
            source,
        })
}

/// Short `owner/repo#number` form of a GitHub issue URL.
///
/// URLs that are not GitHub issue or pull request links come back unchanged.
pub fn pretty_reference(url: &str) -> String {
    let Some(rest) = url.strip_prefix(GITHUB_PREFIX) else {
        return url.to_string();
    };

    match rest.split('/').collect::<Vec<_>>().as_slice() {
        [owner, repo, _, number] => format!("{owner}/{repo}#{number}"),
        _ => url.to_string(),
    }
}
