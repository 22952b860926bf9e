//! Response shape adapters for the generateContent protocol
//!
//! The generated text has lived at different paths across API versions:
//! `candidates[0].content.parts[*].text` in current releases and a flat
//! `candidates[0].content` string in older ones.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where to look for the generated text in a response body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseShape {
    /// Try `parts`, then `flat`
    #[default]
    Auto,
    /// `candidates[0].content.parts[*].text`, concatenated
    Parts,
    /// `candidates[0].content` as a string
    Flat,
}

impl ResponseShape {
    /// Extract the first candidate's text, or None if absent at this shape
    pub fn extract(&self, body: &Value) -> Option<String> {
        match self {
            ResponseShape::Auto => extract_parts(body).or_else(|| extract_flat(body)),
            ResponseShape::Parts => extract_parts(body),
            ResponseShape::Flat => extract_flat(body),
        }
    }
}

fn first_content(body: &Value) -> Option<&Value> {
    body.get("candidates")?.as_array()?.first()?.get("content")
}

fn extract_parts(body: &Value) -> Option<String> {
    let parts = first_content(body)?.get("parts")?.as_array()?;
    let text: String = parts.iter().filter_map(|p| p.get("text").and_then(Value::as_str)).collect();
    if text.is_empty() { None } else { Some(text) }
}

fn extract_flat(body: &Value) -> Option<String> {
    first_content(body)?.as_str().filter(|s| !s.is_empty()).map(str::to_string)
}

/// Reason the request was blocked, if the body says so
pub fn block_reason(body: &Value) -> Option<&str> {
    body.get("promptFeedback")?.get("blockReason")?.as_str()
}
