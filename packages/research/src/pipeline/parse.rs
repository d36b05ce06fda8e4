//! Recovery ladder for summarizer model output.
//!
//! Models asked for `{"points": [...], "category": "..."}` do not always
//! comply. [`parse_summary`] never fails; it walks these steps in order and
//! tags the result with the step that produced it:
//!
//! 1. strip code fences and prose outside the outermost braces, parse as a
//!    JSON object ([`ParseOutcome::Structured`])
//! 2. regex out the `"points"` list and `"category"` string
//!    ([`ParseOutcome::RecoveredPartial`])
//! 3. use the whole response as a single point, category `Uncategorized`
//!    ([`ParseOutcome::RawFallback`])
//!
//! A failed model call never reaches the ladder; the stage records it as
//! [`ParseOutcome::Errored`].

use std::fmt::Display;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::types::summary::{SummaryPayload, DEFAULT_CATEGORY, EMPTY_SUMMARY, UNCATEGORIZED};

/// Summarizer result, tagged by how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "payload", rename_all = "snake_case")]
pub enum ParseOutcome {
    Structured(SummaryPayload),
    RecoveredPartial(SummaryPayload),
    RawFallback(SummaryPayload),
    Errored(SummaryPayload),
}

impl ParseOutcome {
    /// Outcome for a failed model call.
    pub fn errored(error: impl Display) -> Self {
        Self::Errored(SummaryPayload::new(
            vec![format!("Error generating summary: {}", error)],
            DEFAULT_CATEGORY,
        ))
    }

    pub fn payload(&self) -> &SummaryPayload {
        match self {
            Self::Structured(p) | Self::RecoveredPartial(p) | Self::RawFallback(p) | Self::Errored(p) => p,
        }
    }

    pub fn into_payload(self) -> SummaryPayload {
        match self {
            Self::Structured(p) | Self::RecoveredPartial(p) | Self::RawFallback(p) | Self::Errored(p) => p,
        }
    }

    /// Ladder step name (for logging).
    pub fn step(&self) -> &'static str {
        match self {
            Self::Structured(_) => "structured",
            Self::RecoveredPartial(_) => "recovered_partial",
            Self::RawFallback(_) => "raw_fallback",
            Self::Errored(_) => "errored",
        }
    }
}

fn points_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?s)"points":\s*\[(.*?)\]"#).expect("valid regex"))
}

fn category_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""category":\s*"([^"]+)""#).expect("valid regex"))
}

fn trailing_comma_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",\s*\]").expect("valid regex"))
}

/// Interpret a raw summarizer response.
pub fn parse_summary(raw: &str) -> ParseOutcome {
    let cleaned = clean_json(raw);

    if let Some(payload) = parse_object(cleaned) {
        return ParseOutcome::Structured(payload);
    }

    if let Some(payload) = recover_partial(cleaned) {
        return ParseOutcome::RecoveredPartial(payload);
    }

    ParseOutcome::RawFallback(raw_fallback(raw))
}

/// Strip code fences, then cut to the outermost `{ ... }` if there is one.
pub fn clean_json(raw: &str) -> &str {
    let mut s = raw.trim();
    if let Some(rest) = s.strip_prefix("```json") {
        s = rest;
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest;
    }
    if let Some(rest) = s.strip_prefix("```") {
        s = rest;
    }
    let s = s.trim();

    match (s.find('{'), s.rfind('}')) {
        (Some(start), Some(end)) if start < end => &s[start..=end],
        _ => s,
    }
}

fn parse_object(cleaned: &str) -> Option<SummaryPayload> {
    let Value::Object(obj) = serde_json::from_str::<Value>(cleaned).ok()? else {
        return None;
    };

    let points = coerce_points(obj.get("points"));
    let category = match obj.get("category") {
        None | Some(Value::Null) => DEFAULT_CATEGORY.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };

    Some(SummaryPayload::new(points, category))
}

/// List stays a list (items stringified); any other truthy value becomes a
/// single point; falsy values become no points.
fn coerce_points(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().map(stringify).collect(),
        Some(v) if is_truthy(v) => vec![stringify(v)],
        _ => Vec::new(),
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn recover_partial(cleaned: &str) -> Option<SummaryPayload> {
    let inner = points_regex().captures(cleaned)?.get(1)?.as_str();
    let list = format!("[{}]", inner);
    let list = trailing_comma_regex().replace_all(&list, "]");

    let items: Vec<Value> = serde_json::from_str(&list).ok()?;
    if items.is_empty() {
        return None;
    }

    let category = category_regex()
        .captures(cleaned)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

    Some(SummaryPayload::new(items.iter().map(stringify).collect(), category))
}

fn raw_fallback(raw: &str) -> SummaryPayload {
    let mut text = raw.trim();
    if text.starts_with("```") {
        text = text.split_once('\n').map_or(text, |(_, rest)| rest);
    }
    if text.ends_with("```") {
        text = text.rsplit_once('\n').map_or(text, |(head, _)| head);
    }

    let point = if text.trim().is_empty() {
        EMPTY_SUMMARY.to_string()
    } else {
        text.to_string()
    };

    SummaryPayload::new(vec![point], UNCATEGORIZED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_fenced_json_is_structured() {
        let raw = "```json\n{\"points\":[\"a\",\"b\",\"c\"],\"category\":\"News\"}\n```";
        assert_eq!(
            parse_summary(raw),
            ParseOutcome::Structured(SummaryPayload::new(
                vec!["a".into(), "b".into(), "c".into()],
                "News"
            ))
        );
    }

    #[test]
    fn test_prose_around_object_is_structured() {
        let raw = "Here you go:\n{\"points\":[\"x\"],\"category\":\"Tool\"}\nHope this helps!";
        let outcome = parse_summary(raw);
        assert_eq!(outcome.step(), "structured");
        assert_eq!(outcome.payload().category, "Tool");
    }

    #[test]
    fn test_plain_prose_is_raw_fallback() {
        let outcome = parse_summary("The article discusses X.");
        assert_eq!(
            outcome,
            ParseOutcome::RawFallback(SummaryPayload::new(
                vec!["The article discusses X.".into()],
                UNCATEGORIZED
            ))
        );
    }

    #[test]
    fn test_trailing_comma_is_recovered() {
        let raw = r#"{"points": ["one", "two",], "category": "Concept",}"#;
        assert_eq!(
            parse_summary(raw),
            ParseOutcome::RecoveredPartial(SummaryPayload::new(
                vec!["one".into(), "two".into()],
                "Concept"
            ))
        );
    }

    #[test]
    fn test_recovered_without_category_defaults_to_general() {
        let raw = r#"{"points": ["one",] "#;
        let outcome = parse_summary(raw);
        assert_eq!(outcome.step(), "recovered_partial");
        assert_eq!(outcome.payload().category, DEFAULT_CATEGORY);
    }

    #[test]
    fn test_missing_category_defaults_to_general() {
        let outcome = parse_summary(r#"{"points":["a"]}"#);
        assert_eq!(outcome.payload().category, DEFAULT_CATEGORY);
    }

    #[test]
    fn test_coercion() {
        let scalar = parse_summary(r#"{"points":"just one","category":"News"}"#);
        assert_eq!(scalar.payload().points, vec!["just one".to_string()]);

        let empty = parse_summary(r#"{"points":[],"category":"News"}"#);
        assert_eq!(empty.payload().points, vec![EMPTY_SUMMARY.to_string()]);

        let null = parse_summary(r#"{"points":null}"#);
        assert_eq!(null.payload().points, vec![EMPTY_SUMMARY.to_string()]);

        let mixed = parse_summary(r#"{"points":["a", 2, true]}"#);
        assert_eq!(mixed.payload().points, vec!["a".to_string(), "2".into(), "true".into()]);
    }

    #[test]
    fn test_raw_fallback_strips_fences() {
        let outcome = parse_summary("```\nnot json at all\n```");
        assert_eq!(outcome.payload().points, vec!["not json at all".to_string()]);
        assert_eq!(outcome.payload().category, UNCATEGORIZED);
    }

    #[test]
    fn test_errored_message() {
        let outcome = ParseOutcome::errored("rate limited");
        assert_eq!(
            outcome.payload().points,
            vec!["Error generating summary: rate limited".to_string()]
        );
        assert_eq!(outcome.payload().category, DEFAULT_CATEGORY);
    }

    proptest! {
        /// Same input, same outcome, and the payload is never empty.
        #[test]
        fn prop_ladder_is_deterministic(raw in ".{0,200}") {
            let first = parse_summary(&raw);
            let second = parse_summary(&raw);
            prop_assert!(!first.payload().points.is_empty());
            prop_assert_eq!(first, second);
        }
    }
}
