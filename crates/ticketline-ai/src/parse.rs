//! Parsing of raw model output into a [`StructuredSummary`].
//!
//! Two stages, both ending in the same `Result`:
//!
//! 1. **Strict**: the trimmed text is a JSON document.
//! 2. **Recovery**: the first balanced `{...}` substring is a JSON document.
//!    Brace matching skips braces inside string literals, so prose before or
//!    after the object (or a code fence around it) does not matter.
//!
//! The parsed value is then normalized into the five fixed sections. Models
//! drift from the requested shape in a few recurring ways, all accepted here:
//! differently cased or punctuated keys (`initial_issue`, `Follow-Ups`), a
//! section given as a bare string, ticket numbers given as numbers or one
//! comma-separated string, and sections left out entirely.

use serde_json::{Map, Value};
use thiserror::Error;
use ticketline_core::summary::NOT_AVAILABLE;
use ticketline_core::{Section, SectionName, StructuredSummary};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no JSON object in model output: {0}")]
    NoObject(serde_json::Error),

    #[error("extracted object is not valid JSON: {0}")]
    Recovery(serde_json::Error),

    #[error("model output is JSON but not an object")]
    NotAnObject,

    #[error("model output has none of the expected summary sections")]
    MissingSections,
}

/// Parse model output into a summary using strict parsing, then recovery.
pub fn parse_summary(text: &str) -> Result<StructuredSummary, ParseError> {
    let trimmed = text.trim();
    let value = match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => value,
        Err(strict) => {
            let candidate = extract_balanced_object(trimmed).ok_or(ParseError::NoObject(strict))?;
            serde_json::from_str(candidate).map_err(ParseError::Recovery)?
        }
    };
    normalize_summary(value)
}

/// First balanced `{...}` substring of `text`, or `None` if the first opening
/// brace is never closed.
pub fn extract_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
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
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Remove every ```` ```json ```` and ```` ``` ```` marker and trim.
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

/// Map a parsed JSON value onto the five fixed sections.
pub fn normalize_summary(value: Value) -> Result<StructuredSummary, ParseError> {
    let Value::Object(map) = value else {
        return Err(ParseError::NotAnObject);
    };
    if !SectionName::ALL
        .iter()
        .any(|name| lookup(&map, name.as_str()).is_some())
    {
        return Err(ParseError::MissingSections);
    }
    Ok(StructuredSummary::from_sections(|name| {
        lookup(&map, name.as_str())
            .map(normalize_section)
            .unwrap_or_else(|| Section::placeholder(NOT_AVAILABLE))
    }))
}

fn normalize_section(value: &Value) -> Section {
    match value {
        Value::Object(fields) => Section {
            timeframe: lookup(fields, "timeframe")
                .and_then(text_of)
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            ticket_numbers: lookup(fields, "ticket_numbers")
                .map(tickets_of)
                .unwrap_or_default(),
            narrative: lookup(fields, "narrative")
                .and_then(text_of)
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            free_text: false,
        },
        Value::Null => Section::placeholder(NOT_AVAILABLE),
        other => Section::free_text(text_of(other).unwrap_or_else(|| NOT_AVAILABLE.to_string())),
    }
}

/// Value under `key`, matching case-insensitively and ignoring spaces,
/// underscores, and hyphens.
fn lookup<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    if let Some(value) = map.get(key) {
        return Some(value);
    }
    let wanted = canonical_key(key);
    map.iter()
        .find(|(k, _)| canonical_key(k) == wanted)
        .map(|(_, v)| v)
}

fn canonical_key(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(text_of).collect();
            (!parts.is_empty()).then(|| parts.join("\n"))
        }
        other => Some(other.to_string()),
    }
}

fn tickets_of(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Value::Number(n) => vec![n.to_string()],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WELL_FORMED: &str = r#"{
        "Initial Issue": {"timeframe": "2024-01-02 to 2024-01-05", "ticket_numbers": ["T1", "T3"], "narrative": "Outage reported."},
        "Follow-ups": {"timeframe": "2024-01-06", "ticket_numbers": ["T4"], "narrative": "Technician visit."},
        "Developments": {"timeframe": "2024-02", "ticket_numbers": [], "narrative": "Router replaced."},
        "Later Incidents": {"timeframe": "2024-03-01", "ticket_numbers": ["T9"], "narrative": "Intermittent drops."},
        "Recent Events": {"timeframe": "2024-04-10", "ticket_numbers": ["T12"], "narrative": "Stable since."}
    }"#;

    #[test]
    fn strict_parse() {
        let summary = parse_summary(WELL_FORMED).unwrap();
        assert_eq!(summary.initial_issue.ticket_numbers, ["T1", "T3"]);
        assert_eq!(summary.recent_events.narrative, "Stable since.");
    }

    #[test]
    fn recovery_from_surrounding_prose() {
        let text = format!("Sure! Here is the summary:\n{WELL_FORMED}\nLet me know if you need more.");
        let summary = parse_summary(&text).unwrap();
        assert_eq!(summary.follow_ups.timeframe, "2024-01-06");
    }

    #[test]
    fn recovery_from_code_fence() {
        let text = format!("```json\n{WELL_FORMED}\n```");
        assert!(parse_summary(&text).is_ok());
    }

    #[test]
    fn recovery_ignores_braces_in_strings() {
        let text = r#"note: {"Initial Issue": {"timeframe": "N/A", "ticket_numbers": [], "narrative": "user typed } and { and \"quoted\""}} trailing {"#;
        let summary = parse_summary(text).unwrap();
        assert_eq!(
            summary.initial_issue.narrative,
            r#"user typed } and { and "quoted""#
        );
    }

    #[test]
    fn no_object_is_an_error() {
        assert!(matches!(
            parse_summary("I cannot help with that."),
            Err(ParseError::NoObject(_))
        ));
        assert!(matches!(
            parse_summary("{\"Initial Issue\": "),
            Err(ParseError::NoObject(_))
        ));
    }

    #[test]
    fn broken_recovered_object_is_an_error() {
        assert!(matches!(
            parse_summary("prefix {\"Initial Issue\": nope}"),
            Err(ParseError::Recovery(_))
        ));
    }

    #[test]
    fn non_object_json_is_an_error() {
        assert!(matches!(parse_summary("[1, 2]"), Err(ParseError::NotAnObject)));
    }

    #[test]
    fn unrelated_object_is_an_error() {
        assert!(matches!(
            parse_summary(r#"{"summary": "all good"}"#),
            Err(ParseError::MissingSections)
        ));
    }

    #[test]
    fn missing_sections_are_filled() {
        let summary = parse_summary(
            r#"{"Initial Issue": {"timeframe": "2024-01-01", "ticket_numbers": ["T1"], "narrative": "x"}}"#,
        )
        .unwrap();
        assert_eq!(summary.developments, Section::placeholder(NOT_AVAILABLE));
        assert_eq!(summary.initial_issue.timeframe, "2024-01-01");
    }

    #[test]
    fn bare_string_section() {
        let summary = parse_summary(
            r#"{"Initial Issue": "**Timeframe**: 2024-01-01\nLine down", "Recent Events": null}"#,
        )
        .unwrap();
        assert_eq!(summary.initial_issue.timeframe, NOT_AVAILABLE);
        assert!(summary.initial_issue.free_text);
        assert_eq!(
            summary.initial_issue.narrative,
            "**Timeframe**: 2024-01-01\nLine down"
        );
        assert_eq!(summary.recent_events.narrative, NOT_AVAILABLE);
        assert!(!summary.recent_events.free_text);
        assert!(!summary.follow_ups.free_text);
    }

    #[test]
    fn lenient_keys_and_ticket_shapes() {
        let summary = parse_summary(
            r#"{
                "initial_issue": {"Timeframe": "2024-01-01", "Ticket Numbers": [101, "T2", ""], "Narrative": "a"},
                "Follow-Ups": {"timeframe": null, "ticket_numbers": "T3, T4 ,", "narrative": ["b", "c"]},
                "LATER INCIDENTS": {"ticket_numbers": 7}
            }"#,
        )
        .unwrap();
        assert_eq!(summary.initial_issue.ticket_numbers, ["101", "T2"]);
        assert_eq!(summary.initial_issue.narrative, "a");
        assert_eq!(summary.follow_ups.timeframe, NOT_AVAILABLE);
        assert_eq!(summary.follow_ups.ticket_numbers, ["T3", "T4"]);
        assert_eq!(summary.follow_ups.narrative, "b\nc");
        assert_eq!(summary.later_incidents.ticket_numbers, ["7"]);
        assert_eq!(summary.later_incidents.narrative, NOT_AVAILABLE);
    }

    #[test]
    fn strip_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{}\n```  "), "{}");
        assert_eq!(strip_code_fences("{}"), "{}");
    }

    #[test]
    fn balanced_object_extraction() {
        assert_eq!(extract_balanced_object("x {\"a\": {\"b\": 1}} y {}"), Some("{\"a\": {\"b\": 1}}"));
        assert_eq!(extract_balanced_object("no braces"), None);
        assert_eq!(extract_balanced_object("{ never closed"), None);
    }
}
