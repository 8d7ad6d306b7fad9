//! Helpers for parsing structured JSON out of model replies.
//!
//! Models asked for JSON frequently wrap it in a Markdown code fence. The
//! parsers here strip that fence before deserializing, so the stage parsers
//! only deal with their own schema.

use serde::de::DeserializeOwned;

/// Strip a surrounding Markdown code fence, if present.
///
/// Handles ```` ```json ```` and bare ```` ``` ```` fences. Text without a
/// fence is returned trimmed.
#[must_use]
pub fn strip_code_fence(raw: &str) -> &str {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }

    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }

    text.trim()
}

/// Parse a JSON reply after fence stripping.
///
/// # Errors
///
/// Returns the underlying deserialization error when the stripped text is
/// not valid JSON for `T`. Callers apply their own stage-local fallback
/// policy to that failure.
pub fn parse_json_reply<T: DeserializeOwned>(raw: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(strip_code_fence(raw))
}
