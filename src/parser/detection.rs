//! Content shape detection for pasted text and subscription bodies

use std::collections::HashSet;

use tracing::trace;

/// Splits content into trimmed, non-blank, distinct lines
///
/// Exact duplicates are dropped; the first occurrence keeps its position.
pub fn distinct_lines(content: &str) -> Vec<&str> {
    let mut seen = HashSet::new();
    let lines: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| seen.insert(*line))
        .collect();
    trace!("Split content into {} distinct lines", lines.len());
    lines
}

/// First non-blank line, trimmed
pub fn first_line(content: &str) -> Option<&str> {
    content.lines().map(str::trim).find(|line| !line.is_empty())
}

/// Checks if content is a single JSON object
pub fn is_json_object(content: &str) -> bool {
    let trimmed = content.trim();
    if !trimmed.starts_with('{') {
        return false;
    }
    matches!(
        serde_json::from_str::<serde_json::Value>(trimmed),
        Ok(serde_json::Value::Object(_))
    )
}
