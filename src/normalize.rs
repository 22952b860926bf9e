//! Response normalization
//!
//! Models often wrap structured output in a markdown code fence. These helpers
//! strip the fence, parse the remainder as JSON, and optionally check it
//! against a typed shape.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ChunkdError, Result};

/// Longest excerpt of the offending text kept in error messages
const EXCERPT_LEN: usize = 200;

/// Remove surrounding whitespace and an optional ```` ``` ```` / ```` ```json ```` fence.
pub fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();

    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the language tag line, if any
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };

    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Strip fences and parse as JSON.
pub fn normalize(raw: &str) -> Result<Value> {
    let cleaned = strip_fences(raw);
    serde_json::from_str(cleaned)
        .map_err(|e| ChunkdError::MalformedResponse(format!("{} in {:?}", e, excerpt(cleaned))))
}

/// Strip fences, parse, and convert into `T`.
///
/// Unparseable text is `MalformedResponse`; valid JSON of the wrong shape is
/// `ShapeMismatch`.
pub fn normalize_as<T: DeserializeOwned>(raw: &str) -> Result<T> {
    let value = normalize(raw)?;
    serde_json::from_value(value).map_err(|e| ChunkdError::ShapeMismatch(e.to_string()))
}

fn excerpt(text: &str) -> String {
    match text.char_indices().nth(EXCERPT_LEN) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
