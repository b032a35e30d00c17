//! Pull a JSON object out of free-form model output.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{json, Value};
use thiserror::Error;

use crate::models::Record;

pub const PARSE_FAILURE: &str = "Failed to parse AI response";

/// Fenced block, optionally tagged `json`, whose body is an object.
static FENCED_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").unwrap());

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("model output is empty")]
    Empty,

    #[error("no JSON object found in model output")]
    NoJsonObject,

    #[error("invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("JSON value is not an object")]
    NotAnObject,
}

/// Fenced block first, then the span from the first `{` to the last `}`.
///
/// A fence whose body does not parse falls through to the brace span.
pub fn try_extract_json_object(raw: &str) -> Result<Record, ExtractError> {
    if raw.trim().is_empty() {
        return Err(ExtractError::Empty);
    }

    if let Some(body) = FENCED_OBJECT.captures(raw).and_then(|c| c.get(1)) {
        if let Ok(record) = parse_object(body.as_str()) {
            return Ok(record);
        }
    }

    match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if start < end => parse_object(&raw[start..=end]),
        _ => Err(ExtractError::NoJsonObject),
    }
}

/// Never fails: anything [`try_extract_json_object`] rejects becomes the
/// [`sentinel`] mapping carrying the raw text.
pub fn extract_json_object(raw: &str) -> Record {
    match try_extract_json_object(raw) {
        Ok(record) => record,
        Err(e) => {
            tracing::debug!(error = %e, len = raw.len(), "Model output is not a JSON object");
            sentinel(raw)
        }
    }
}

pub fn sentinel(raw: &str) -> Record {
    let mut record = Record::new();
    record.insert("error".to_string(), json!(PARSE_FAILURE));
    record.insert("raw_text".to_string(), json!(raw));
    record
}

/// True for mappings produced by [`sentinel`].
pub fn is_sentinel(record: &Record) -> bool {
    record.get("error").and_then(Value::as_str) == Some(PARSE_FAILURE)
        && record.contains_key("raw_text")
}

fn parse_object(text: &str) -> Result<Record, ExtractError> {
    match serde_json::from_str::<Value>(text)? {
        Value::Object(record) => Ok(record),
        _ => Err(ExtractError::NotAnObject),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn obj(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn test_fenced_json_block() {
        let raw = "Sure! Here is the result:\n```json\n{\"drug_name\": \"Advil\", \"strength\": \"200mg\"}\n```\nLet me know.";
        assert_eq!(
            extract_json_object(raw),
            obj(json!({"drug_name": "Advil", "strength": "200mg"}))
        );
    }

    #[test]
    fn test_untagged_fence_with_nested_object() {
        let raw = "```\n{\"a\": {\"b\": 1}, \"c\": [1, 2]}\n```";
        assert_eq!(
            extract_json_object(raw),
            obj(json!({"a": {"b": 1}, "c": [1, 2]}))
        );
    }

    #[test]
    fn test_fence_wins_over_surrounding_braces() {
        let raw = "note {not json} then ```json\n{\"x\": 1}\n``` and {more}";
        assert_eq!(extract_json_object(raw), obj(json!({"x": 1})));
    }

    #[test]
    fn test_brace_span_without_fence() {
        let raw = "The analysis is {\"final_recommendation\": \"Safe\"} as requested.";
        assert_eq!(
            extract_json_object(raw),
            obj(json!({"final_recommendation": "Safe"}))
        );
    }

    #[test]
    fn test_brace_span_uses_first_open_and_last_close() {
        let raw = "{\"outer\": {\"inner\": true}} trailing";
        assert_eq!(
            extract_json_object(raw),
            obj(json!({"outer": {"inner": true}}))
        );

        // two separate objects: the combined span is not valid JSON
        let raw = "{\"a\": 1} and {\"b\": 2}";
        assert_eq!(extract_json_object(raw), sentinel(raw));
    }

    #[test]
    fn test_broken_fence_falls_back_to_braces() {
        // fence body is truncated, but the whole text still has a valid span
        let raw = "{\"ok\": true, \"note\": \"```json {oops ```\"}";
        assert_eq!(
            extract_json_object(raw),
            obj(json!({"ok": true, "note": "```json {oops ```"}))
        );
    }

    #[test]
    fn test_sentinel_for_unparseable_output() {
        for raw in ["", "   ", "no json here", "} backwards {", "{\"truncated\": "] {
            let record = extract_json_object(raw);
            assert_eq!(record, sentinel(raw));
            assert!(is_sentinel(&record));
            assert_eq!(record["raw_text"], json!(raw));
        }
    }

    #[test]
    fn test_error_kinds() {
        assert!(matches!(try_extract_json_object(" \n"), Err(ExtractError::Empty)));
        assert!(matches!(
            try_extract_json_object("plain text"),
            Err(ExtractError::NoJsonObject)
        ));
        assert!(matches!(
            try_extract_json_object("{nope}"),
            Err(ExtractError::Parse(_))
        ));
    }

    #[test]
    fn test_regular_error_key_is_not_sentinel() {
        let record = obj(json!({"error": "Drug not found in FDA database"}));
        assert!(!is_sentinel(&record));
    }
}
