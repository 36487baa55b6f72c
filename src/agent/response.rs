//! Recovering JSON payloads from free-form model replies
//!
//! Models wrap their answer in prose or markdown fences. The payload is
//! located by preferring a ```` ```json ```` fence, then any fence, and then
//! taking the first balanced `{ ... }` object inside it.

use serde::de::DeserializeOwned;

use crate::document::{Classification, Extraction};
use super::AgentError;

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

/// Narrow `text` to the contents of its first code fence, if any
fn fenced_region(text: &str) -> &str {
    let start = if let Some(idx) = text.find(JSON_FENCE) {
        idx + JSON_FENCE.len()
    } else if let Some(idx) = text.find(FENCE) {
        idx + FENCE.len()
    } else {
        return text;
    };

    let rest = &text[start..];
    match rest.find(FENCE) {
        Some(end) => &rest[..end],
        None => rest,
    }
}

/// Extract the JSON object embedded in a model reply.
///
/// Returns the first brace-balanced object; braces inside string literals
/// are ignored. An unterminated object yields everything from its opening
/// brace, and text without any `{` is returned as-is (after fence stripping).
pub fn extract_json(text: &str) -> &str {
    let region = fenced_region(text);
    let Some(open) = region.find('{') else {
        return region;
    };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in region[open..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return &region[open..open + offset + 1];
                }
            }
            _ => {}
        }
    }

    &region[open..]
}

fn parse<T: DeserializeOwned>(what: &'static str, text: &str) -> Result<T, AgentError> {
    serde_json::from_str(extract_json(text)).map_err(|source| AgentError::Parse { what, source })
}

/// Parse a classification reply
pub fn parse_classification(text: &str) -> Result<Classification, AgentError> {
    parse("classification", text)
}

/// Parse an extraction reply
pub fn parse_extraction(text: &str) -> Result<Extraction, AgentError> {
    parse("extraction", text)
}
