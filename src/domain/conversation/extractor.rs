//! Parsing of extraction-pass output.
//!
//! Models wrap JSON in prose or code fences more often than not. The parser
//! locates the first balanced JSON object in the raw text, fenced or not,
//! parses only that, and scrubs string values before they reach the lead
//! profile.

use serde_json::Value as JsonValue;
use thiserror::Error;

use super::LeadUpdate;

/// Raw completions beyond this size are rejected outright (100KB).
pub const MAX_RESPONSE_LENGTH: usize = 100_000;

/// Extracted string fields are cut to this many characters.
pub const MAX_FIELD_LENGTH: usize = 2_000;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("Response too long: {actual} bytes exceeds maximum of {max} bytes")]
    TooLong { max: usize, actual: usize },

    #[error("No JSON object found in response")]
    NoJson,

    #[error("JSON parse error: {0}")]
    Parse(String),

    #[error("Expected a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// Turns a model completion into a typed lead update.
#[derive(Debug, Clone, Default)]
pub struct LeadExtractor;

impl LeadExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, response: &str) -> Result<LeadUpdate, ExtractionError> {
        if response.len() > MAX_RESPONSE_LENGTH {
            return Err(ExtractionError::TooLong {
                max: MAX_RESPONSE_LENGTH,
                actual: response.len(),
            });
        }

        let json = locate_json_object(response).ok_or(ExtractionError::NoJson)?;
        let value: JsonValue =
            serde_json::from_str(json).map_err(|e| ExtractionError::Parse(e.to_string()))?;

        if !value.is_object() {
            return Err(ExtractionError::NotAnObject(json_kind(&value)));
        }

        let cleaned = scrub_strings(value);
        serde_json::from_value(cleaned).map_err(|e| ExtractionError::Parse(e.to_string()))
    }
}

/// Returns the first balanced `{...}` block. Code fences get no special
/// treatment; an object inside one is found like any other.
pub fn locate_json_object(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (offset, c) in s[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            _ if in_string => {}
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&s[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

fn scrub_strings(value: JsonValue) -> JsonValue {
    match value {
        JsonValue::String(s) => JsonValue::String(scrub_field(&s)),
        JsonValue::Array(items) => JsonValue::Array(items.into_iter().map(scrub_strings).collect()),
        JsonValue::Object(map) => JsonValue::Object(
            map.into_iter()
                .map(|(k, v)| (k, scrub_strings(v)))
                .collect(),
        ),
        other => other,
    }
}

/// Strips markup and control characters, then truncates. A `<` only
/// opens a tag when a `>` closes it later on.
fn scrub_field(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(c) = rest.chars().next() {
        if c == '<' {
            if let Some(close) = rest.find('>') {
                rest = &rest[close + 1..];
                continue;
            }
        }
        if !(c.is_control() && c != '\n' && c != '\t') {
            out.push(c);
        }
        rest = &rest[c.len_utf8()..];
    }

    let trimmed = out.trim();
    if trimmed.chars().count() > MAX_FIELD_LENGTH {
        trimmed.chars().take(MAX_FIELD_LENGTH).collect()
    } else {
        trimmed.to_string()
    }
}
