//! JSON record input.
//!
//! Accepts either a JSON array of objects or JSON Lines (one object per
//! non-blank line). Field values must be JSON scalars.

use crate::error::InputError;
use crate::record::Record;

/// Parse records from JSON array or JSON Lines text.
pub fn parse_records(text: &str) -> Result<Vec<Record>, InputError> {
    if text.trim_start().starts_with('[') {
        return serde_json::from_str(text).map_err(|source| InputError::Malformed {
            line: source.line(),
            source,
        });
    }

    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line).map_err(|source| InputError::Malformed {
                line: idx + 1,
                source,
            })
        })
        .collect()
}
