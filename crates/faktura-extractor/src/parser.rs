//! Recover JSON objects from free-form model output

use crate::types::CritiqueVerdict;
use faktura_domain::{CritiqueAction, Severity};
use serde_json::Value;
use thiserror::Error;

/// Why a JSON object could not be recovered from model output
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JsonError {
    /// No `{...}` span in the text
    #[error("No JSON object detected in model output")]
    NoObject,

    /// A span was found but is not valid JSON
    #[error("JSON parse error: {0}")]
    Parse(String),

    /// The span parsed, but to something other than an object
    #[error("Expected a JSON object")]
    NotAnObject,
}

/// Find the first JSON object embedded in arbitrary text
///
/// Two strategies, in order:
///
/// 1. Walk top-level spans: from a `{`, track nesting depth, string literals
///    and backslash escapes to the matching `}`. The first balanced span that
///    parses as JSON wins. A span that does not parse is skipped whole, so an
///    object nested inside a malformed one is never returned on its own.
/// 2. Greedy fallback: leftmost `{` through rightmost `}`.
///
/// Returns `None` only when the text has no `{` followed by a `}`.
///
/// # Examples
///
/// ```
/// use faktura_extractor::extract_first_object;
///
/// let raw = "Sure! {note: see {below}} Here it is: {\"total\": 100.0, \"memo\": \"a } b\"} Done.";
/// assert_eq!(extract_first_object(raw), Some("{\"total\": 100.0, \"memo\": \"a } b\"}"));
///
/// assert_eq!(extract_first_object("no braces here"), None);
/// ```
pub fn extract_first_object(text: &str) -> Option<&str> {
    let mut cursor = 0;
    while let Some(offset) = text[cursor..].find('{') {
        let start = cursor + offset;
        // An unclosed object swallows the rest of the text
        let Some(end) = balanced_end(&text[start..]) else {
            break;
        };

        let candidate = &text[start..start + end];
        if serde_json::from_str::<Value>(candidate).is_ok() {
            return Some(candidate);
        }
        cursor = start + end;
    }

    greedy_span(text)
}

/// Byte length of the balanced object starting at `s[0] == '{'`
fn balanced_end(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in s.char_indices() {
        if in_string {
            if escape_next {
                escape_next = false;
            } else if ch == '\\' {
                escape_next = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + ch.len_utf8());
                }
            }
            _ => {}
        }
    }

    None
}

fn greedy_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Extract and parse the first JSON object in model output
///
/// Keeps "nothing found" and "found but unparsable" apart so the retry loop
/// can react to each differently.
pub fn parse_object(text: &str) -> Result<Value, JsonError> {
    let span = extract_first_object(text).ok_or(JsonError::NoObject)?;

    let value: Value = serde_json::from_str(span).map_err(|e| JsonError::Parse(e.to_string()))?;

    if !value.is_object() {
        return Err(JsonError::NotAnObject);
    }

    Ok(value)
}

/// Interpret a parsed critique object
///
/// Every field is optional. A missing or non-boolean `valid` counts as
/// `false`, severity falls back to medium, and a missing or unknown action is
/// kept as `None` (which the pipeline treats as a request to fix).
pub fn parse_verdict(value: Value) -> CritiqueVerdict {
    let valid = match value.get("valid") {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    };

    let issues = value
        .get("issues")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    let severity = Severity::parse_or_default(value.get("severity").and_then(Value::as_str));

    let requested_action = value
        .get("action")
        .and_then(Value::as_str)
        .and_then(CritiqueAction::parse);

    let suggested_fix = value
        .get("suggested_fix")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    CritiqueVerdict {
        valid,
        issues,
        severity,
        requested_action,
        suggested_fix,
        raw: value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_object_returned_unchanged() {
        let text = r#"{"invoice_number":"123","total":100.0,"currency":"EUR"}"#;
        assert_eq!(extract_first_object(text), Some(text));
    }

    #[test]
    fn test_object_surrounded_by_prose() {
        let text = "Here is the JSON:\n{\"a\": 1}\nLet me know if you need more.";
        assert_eq!(extract_first_object(text), Some("{\"a\": 1}"));
    }

    #[test]
    fn test_no_braces() {
        assert_eq!(extract_first_object("I cannot help with that."), None);
        assert_eq!(extract_first_object(""), None);
    }

    #[test]
    fn test_only_closing_before_opening() {
        assert_eq!(extract_first_object("} then {"), None);
    }

    #[test]
    fn test_markdown_fenced_object() {
        let text = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(extract_first_object(text), Some("{\"key\": \"value\"}"));
    }

    #[test]
    fn test_braces_inside_strings() {
        let text = r#"{"memo": "use {curly} and \"quoted }\" text", "n": 2}"#;
        assert_eq!(extract_first_object(text), Some(text));
    }

    #[test]
    fn test_prose_braces_before_real_object() {
        let text = "Template {like this} ignored. {\"total\": 5}";
        assert_eq!(extract_first_object(text), Some("{\"total\": 5}"));
    }

    #[test]
    fn test_first_of_two_objects() {
        let text = "{\"a\": 1} and also {\"b\": 2}";
        assert_eq!(extract_first_object(text), Some("{\"a\": 1}"));
    }

    #[test]
    fn test_nested_objects() {
        let text = "x {\"supplier\": {\"name\": \"Acme\"}, \"items\": [{\"q\": 1}]} y";
        assert_eq!(
            extract_first_object(text),
            Some("{\"supplier\": {\"name\": \"Acme\"}, \"items\": [{\"q\": 1}]}")
        );
    }

    #[test]
    fn test_greedy_fallback_when_nothing_balanced_parses() {
        let text = "start {not json} middle {also: not} end";
        assert_eq!(extract_first_object(text), Some("{not json} middle {also: not}"));
    }

    #[test]
    fn test_malformed_outer_object_is_not_replaced_by_nested_one() {
        let text = r#"{"invoice_number": "123", "supplier": {"name": "Acme"}, "total": 100,}"#;
        assert_eq!(extract_first_object(text), Some(text));
        assert!(matches!(parse_object(text), Err(JsonError::Parse(_))));
    }

    #[test]
    fn test_unclosed_outer_object_does_not_yield_nested_one() {
        let text = r#"{"supplier": {"name": "Acme"}, "total": 10"#;
        assert_eq!(extract_first_object(text), Some(r#"{"supplier": {"name": "Acme"}"#));
        assert!(matches!(parse_object(text), Err(JsonError::Parse(_))));
    }

    #[test]
    fn test_skips_malformed_span_then_finds_next_top_level() {
        let text = r#"draft {"a": {"b": 1},} final {"a": {"b": 2}}"#;
        assert_eq!(extract_first_object(text), Some(r#"{"a": {"b": 2}}"#));
    }

    #[test]
    fn test_parse_object_ok() {
        let value = parse_object("Result: {\"a\": [1, 2]}").unwrap();
        assert_eq!(value, json!({"a": [1, 2]}));
    }

    #[test]
    fn test_parse_object_distinguishes_errors() {
        assert_eq!(parse_object("plain prose"), Err(JsonError::NoObject));
        assert!(matches!(parse_object("{broken: json}"), Err(JsonError::Parse(_))));
    }

    #[test]
    fn test_parse_verdict_full() {
        let verdict = parse_verdict(json!({
            "valid": false,
            "issues": ["total mismatch", 42],
            "severity": "high",
            "action": "regenerate",
            "suggested_fix": "recompute totals"
        }));

        assert!(!verdict.valid);
        assert_eq!(verdict.issues, vec!["total mismatch".to_string(), "42".to_string()]);
        assert_eq!(verdict.severity, Severity::High);
        assert_eq!(verdict.requested_action, Some(CritiqueAction::Regenerate));
        assert_eq!(verdict.suggested_fix.as_deref(), Some("recompute totals"));
    }

    #[test]
    fn test_parse_verdict_lenient_defaults() {
        let verdict = parse_verdict(json!({"action": "rewrite", "suggested_fix": "  "}));

        assert!(!verdict.valid);
        assert!(verdict.issues.is_empty());
        assert_eq!(verdict.severity, Severity::Medium);
        assert_eq!(verdict.requested_action, None);
        assert_eq!(verdict.suggested_fix, None);
    }

    #[test]
    fn test_parse_verdict_string_valid() {
        let verdict = parse_verdict(json!({"valid": "TRUE", "action": "accept"}));
        assert!(verdict.valid);
    }
}
