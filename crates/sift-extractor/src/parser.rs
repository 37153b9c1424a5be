//! Parse model output into raw item drafts
//!
//! Model replies are loosely structured: prose around the payload, markdown
//! fences, raw control characters inside strings, a bare object where an
//! array was asked for. Parsing never fails on structure; an unrecoverable
//! reply yields no drafts. It does fail when the prose around the payload,
//! or a provider error body in place of the payload, reports a credential or
//! rate-limit problem.

use crate::error::ExtractorError;
use crate::types::RawDraft;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::{debug, warn};

const CREDENTIAL_MARKERS: &[&str] = &[
    "invalid api key",
    "incorrect api key",
    "invalid_api_key",
    "api key not valid",
    "authentication failed",
    "unauthorized",
    "permission denied",
];

const RATE_LIMIT_MARKERS: &[&str] = &[
    "rate limit",
    "rate_limit",
    "too many requests",
    "quota exceeded",
    "insufficient_quota",
    "resource exhausted",
];

static CONTROL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\x00-\x1f]").expect("valid regex"));

type Strategy = fn(&str) -> Result<Value, serde_json::Error>;

/// Attempts in order; the first success wins
const STRATEGIES: &[(&str, Strategy)] = &[
    ("strict", strict),
    ("collapse_whitespace", collapse_whitespace),
    ("escape_in_strings", escape_in_strings),
    ("escape_all_controls", escape_all_controls),
];

/// Parse a model reply into drafts that carry a title and content
///
/// # Errors
///
/// [`ExtractorError::Credential`] or [`ExtractorError::RateLimited`] when the
/// text outside the JSON payload reports that condition, or when the payload
/// is an error body such as `{"error": {"code": "invalid_api_key"}}`.
/// Malformed payloads are not an error.
///
/// # Examples
///
/// ```
/// use sift_extractor::parser::parse;
///
/// let reply = "Here you go:\n```json\n[{\"title\": \"Ownership\", \"content\": \"Each value has one owner.\"}]\n```";
/// let drafts = parse(reply).unwrap();
/// assert_eq!(drafts[0].title.as_deref(), Some("Ownership"));
/// ```
pub fn parse(raw: &str) -> Result<Vec<RawDraft>, ExtractorError> {
    let array_span = span(raw, '[', ']');
    let object_span = span(raw, '{', '}');

    let payload = match (array_span, object_span) {
        (Some(a), Some(o)) => Some((a.0.min(o.0), a.1.max(o.1))),
        (a, o) => a.or(o),
    };
    detect_provider_error(&outside_text(raw, payload))?;

    // An object enclosing any array is the whole reply, e.g. an error body with details
    let error_body = object_span
        .filter(|o| array_span.map_or(true, |a| o.0 < a.0))
        .and_then(|(s, e)| repair(&raw[s..e]))
        .filter(is_error_body);
    if let Some(body) = error_body {
        detect_provider_error(&body.to_string())?;
    }

    let value = array_span
        .and_then(|(s, e)| repair(&raw[s..e]))
        .filter(holds_objects)
        .or_else(|| object_span.and_then(|(s, e)| repair(&raw[s..e])));

    let Some(value) = value else {
        let e = ExtractorError::ResponseFormat(format!("no parseable JSON in {} chars", raw.len()));
        warn!("{}", e);
        return Ok(Vec::new());
    };

    let mut drafts = Vec::new();
    for (index, element) in coerce_to_items(value).into_iter().enumerate() {
        match serde_json::from_value::<RawDraft>(element) {
            Ok(draft) => match draft.rejection() {
                Some(reason) => warn!("Dropping item {}: {}", index, reason),
                None => drafts.push(draft),
            },
            Err(e) => warn!("Dropping item {}: {}", index, ExtractorError::from(e)),
        }
    }
    Ok(drafts)
}

/// Byte span from the first `open` through the last `close`
fn span(raw: &str, open: char, close: char) -> Option<(usize, usize)> {
    let start = raw.find(open)?;
    let end = raw.rfind(close)? + close.len_utf8();
    (end > start).then_some((start, end))
}

fn outside_text(raw: &str, span: Option<(usize, usize)>) -> String {
    match span {
        Some((start, end)) => format!("{} {}", &raw[..start], &raw[end..]),
        None => raw.to_string(),
    }
}

fn detect_provider_error(text: &str) -> Result<(), ExtractorError> {
    let lower = text.to_lowercase();
    if let Some(marker) = CREDENTIAL_MARKERS.iter().find(|m| lower.contains(*m)) {
        return Err(ExtractorError::Credential(format!("provider reported '{}'", marker)));
    }
    if let Some(marker) = RATE_LIMIT_MARKERS.iter().find(|m| lower.contains(*m)) {
        return Err(ExtractorError::RateLimited(format!("provider reported '{}'", marker)));
    }
    Ok(())
}

fn repair(candidate: &str) -> Option<Value> {
    STRATEGIES.iter().find_map(|(name, strategy)| match strategy(candidate) {
        Ok(value) => {
            if *name != "strict" {
                debug!("Response repaired with '{}'", name);
            }
            Some(value)
        }
        Err(_) => None,
    })
}

/// An object that carries an `error` field or no draft at all
fn is_error_body(value: &Value) -> bool {
    let Value::Object(map) = value else {
        return false;
    };
    if map.contains_key("error") {
        return true;
    }
    let is_draft = map.contains_key("title") || map.contains_key("content");
    let wraps_drafts = map
        .values()
        .any(|v| v.as_array().is_some_and(|items| items.iter().any(Value::is_object)));
    !is_draft && !wraps_drafts
}

fn holds_objects(value: &Value) -> bool {
    value
        .as_array()
        .is_some_and(|items| items.is_empty() || items.iter().any(Value::is_object))
}

/// Turn the parsed payload into a list of candidate items
fn coerce_to_items(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(map) if map.contains_key("title") || map.contains_key("content") => {
            vec![Value::Object(map)]
        }
        // Wrapper objects such as {"items": [...]}
        Value::Object(map) => map
            .into_iter()
            .find_map(|(_, v)| match v {
                Value::Array(items) if items.iter().any(Value::is_object) => Some(items),
                _ => None,
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

fn strict(candidate: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(candidate)
}

fn collapse_whitespace(candidate: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(&collapse_structural_whitespace(candidate))
}

fn escape_in_strings(candidate: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(&escape_string_controls(candidate))
}

fn escape_all_controls(candidate: &str) -> Result<Value, serde_json::Error> {
    let collapsed = collapse_structural_whitespace(candidate.trim());
    let escaped = CONTROL_RE.replace_all(&collapsed, |caps: &regex::Captures| {
        let c = caps[0].chars().next().unwrap_or('\0');
        format!("\\u{:04x}", c as u32)
    });
    serde_json::from_str(&escaped)
}

fn is_structural(c: char) -> bool {
    matches!(c, '[' | ']' | '{' | '}' | ',' | ':')
}

/// Drop whitespace next to structural tokens, leaving string literals alone
fn collapse_structural_whitespace(candidate: &str) -> String {
    let chars: Vec<char> = candidate.chars().collect();
    let mut out = String::with_capacity(candidate.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut after_structural = true;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            out.push(c);
            i += 1;
            continue;
        }

        if c.is_whitespace() {
            let run_end = chars[i..]
                .iter()
                .position(|c| !c.is_whitespace())
                .map_or(chars.len(), |offset| i + offset);
            let before_structural = chars.get(run_end).is_some_and(|c| is_structural(*c));
            if !after_structural && !before_structural {
                out.extend(&chars[i..run_end]);
            }
            i = run_end;
            continue;
        }

        if c == '"' {
            in_string = true;
        }
        after_structural = is_structural(c);
        out.push(c);
        i += 1;
    }
    out
}

/// Escape control characters inside string literals and drop them outside
fn escape_string_controls(candidate: &str) -> String {
    let mut out = String::with_capacity(candidate.len() + 16);
    let mut in_string = false;
    let mut escaped = false;

    for c in candidate.chars() {
        if in_string {
            if escaped {
                escaped = false;
                out.push(c);
                continue;
            }
            match c {
                '\\' => {
                    escaped = true;
                    out.push(c);
                }
                '"' => {
                    in_string = false;
                    out.push(c);
                }
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                '\x0c' => out.push_str("\\f"),
                '\x08' => out.push_str("\\b"),
                _ => out.push(c),
            }
        } else {
            match c {
                '"' => {
                    in_string = true;
                    out.push(c);
                }
                '\n' | '\r' | '\t' | '\x0c' | '\x08' => {}
                _ => out.push(c),
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_json() {
        let response = r#"[
            {
                "title": "Borrow checker",
                "content": "References must not outlive their referent.",
                "confidence": 88,
                "tags": ["rust", "memory"]
            }
        ]"#;

        let drafts = parse(response).unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].title.as_deref(), Some("Borrow checker"));
        assert_eq!(drafts[0].confidence(), Some(88));
        assert_eq!(drafts[0].tags(), vec!["rust", "memory"]);
    }

    #[test]
    fn test_parse_json_with_markdown_wrapper() {
        let response = "```json\n[{\"title\": \"A\", \"content\": \"B\"}]\n```";
        assert_eq!(parse(response).unwrap().len(), 1);
    }

    #[test]
    fn test_prose_around_payload() {
        let response = "Sure! Here are the items:\n[{\"title\": \"A\", \"content\": \"B\"}]\nLet me know.";
        assert_eq!(parse(response).unwrap().len(), 1);
    }

    #[test]
    fn test_raw_newline_inside_string_is_preserved() {
        let response = "[{\"title\": \"Lines\", \"content\": \"line one\nline two\"}]";
        let drafts = parse(response).unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].content.as_deref(), Some("line one\nline two"));
    }

    #[test]
    fn test_raw_tab_inside_string() {
        let response = "[{\"title\": \"T\", \"content\": \"a\tb\"}]";
        let drafts = parse(response).unwrap();
        assert_eq!(drafts[0].content.as_deref(), Some("a\tb"));
    }

    #[test]
    fn test_other_control_character_is_escaped() {
        let response = "[{\"title\": \"T\", \"content\": \"bell\x07here\"}]";
        let drafts = parse(response).unwrap();
        assert_eq!(drafts[0].content.as_deref(), Some("bell\x07here"));
    }

    #[test]
    fn test_single_object_is_coerced() {
        let response = r#"{"title": "Solo", "content": "Only item", "tags": ["x", "y"]}"#;
        let drafts = parse(response).unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].tags(), vec!["x", "y"]);
    }

    #[test]
    fn test_wrapper_object() {
        let response = r#"{"items": [{"title": "A", "content": "B"}, {"title": "C", "content": "D"}]}"#;
        assert_eq!(parse(response).unwrap().len(), 2);
    }

    #[test]
    fn test_unrecoverable_yields_empty() {
        assert!(parse("I could not find any knowledge here.").unwrap().is_empty());
        assert!(parse("[{\"title\": \"A\", \"content\": ").unwrap().is_empty());
    }

    #[test]
    fn test_drops_blank_title_or_content() {
        let response = r#"[
            {"title": "", "content": "no title"},
            {"title": "no content"},
            {"title": "ok", "content": "fine"},
            "not an object"
        ]"#;
        let drafts = parse(response).unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].title.as_deref(), Some("ok"));
    }

    #[test]
    fn test_credential_marker_outside_payload() {
        let err = parse("Error: Invalid API key provided.").unwrap_err();
        assert!(matches!(err, ExtractorError::Credential(_)));
    }

    #[test]
    fn test_rate_limit_marker_outside_payload() {
        let err = parse("429 Too Many Requests, please slow down").unwrap_err();
        assert!(matches!(err, ExtractorError::RateLimited(_)));
    }

    #[test]
    fn test_credential_error_body() {
        let response = r#"{"error": {"message": "Incorrect API key provided: sk-****. You can find your API key at your account page.", "type": "invalid_request_error", "code": "invalid_api_key"}}"#;
        let err = parse(response).unwrap_err();
        assert!(matches!(err, ExtractorError::Credential(_)));
    }

    #[test]
    fn test_rate_limit_error_body() {
        let response = r#"{"error": {"message": "Rate limit reached for requests per min. Please try again in 20s.", "type": "requests", "code": "rate_limit_exceeded"}}"#;
        let err = parse(response).unwrap_err();
        assert!(matches!(err, ExtractorError::RateLimited(_)));
    }

    #[test]
    fn test_error_body_with_detail_array() {
        let response = r#"{"error": {"code": 400, "message": "API key not valid. Please pass a valid API key.", "details": [{"reason": "API_KEY_INVALID"}]}}"#;
        let err = parse(response).unwrap_err();
        assert!(matches!(err, ExtractorError::Credential(_)));
    }

    #[test]
    fn test_unrelated_object_is_not_an_error() {
        assert!(parse(r#"{"note": "nothing to extract"}"#).unwrap().is_empty());
    }

    #[test]
    fn test_whitespace_repair_leaves_strings_alone() {
        let response = "[ {\"title\": \"a : b\", \"content\": \"x , y\"}\u{a0}]";
        let drafts = parse(response).unwrap();
        assert_eq!(drafts[0].title.as_deref(), Some("a : b"));
        assert_eq!(drafts[0].content.as_deref(), Some("x , y"));
    }

    #[test]
    fn test_markers_inside_payload_are_content() {
        let response = r#"[{"title": "Rate limit design", "content": "A rate limit protects an unauthorized caller from flooding."}]"#;
        assert_eq!(parse(response).unwrap().len(), 1);
    }
}
