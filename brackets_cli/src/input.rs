//! Entrant and result files.

use anyhow::{Context, Error};
use brackets::bracket::{MatchId, MatchUpdate};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One line of a results file
///
/// ```json
/// { "match": 0, "opponent1": { "score": 2 }, "opponent2": { "score": 1 } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultEntry {
    #[serde(rename = "match")]
    pub match_id: MatchId,
    #[serde(flatten)]
    pub update: MatchUpdate,
}

/// Read entrant names, one per line
///
/// Blank lines and lines starting with `#` are skipped.
pub fn read_participants(path: &Path) -> Result<Vec<String>, Error> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read participants from {}", path.display()))?;
    Ok(parse_participants(&text))
}

fn parse_participants(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Read a JSON array of results
pub fn read_results(path: &Path) -> Result<Vec<ResultEntry>, Error> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read results from {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Malformed results file {}", path.display()))
}
