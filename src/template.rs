//! Contract template model: static prose plus bare-identifier placeholder
//! tokens, with one entry per token recording its description and the
//! verbatim source value it replaced.
//!
//! Parsing is strict. The model's output is either the exact two-key JSON
//! object or it is rejected with a positioned diagnostic; nothing here
//! guesses or repairs beyond what the sanitizer already did.

use std::fmt;
use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// One substitution slot: what the field means, and the exact, complete
/// substring of the source document it replaced (never the preceding label).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceholderEntry {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub original_value: Option<String>,
}

/// A stored template. Immutable once written; regeneration goes through
/// re-extraction, never mutation.
///
/// The serialized form is exactly `{"Template": ..., "Placeholders": {...}}`,
/// with placeholder entries kept in the order the model emitted them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Template {
    #[serde(rename = "Template")]
    pub template_text: String,
    #[serde(rename = "Placeholders")]
    pub placeholders: IndexMap<String, PlaceholderEntry>,
}

fn name_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("^[A-Za-z][A-Za-z0-9_]*$").unwrap())
}

impl Template {
    /// Flag violations of the token/entry consistency rules.
    ///
    /// Whatever the generator returned is ground truth, so violations are
    /// surfaced as warnings and never auto-corrected. Only the entry side is
    /// checkable: a bare identifier in prose with no entry is
    /// indistinguishable from ordinary text.
    pub fn integrity_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        for (name, entry) in &self.placeholders {
            if !name_pattern().is_match(name) {
                warnings.push(format!(
                    "placeholder name '{}' is not a bare identifier ([A-Za-z][A-Za-z0-9_]*)",
                    name
                ));
            }
            if !self.template_text.contains(name.as_str()) {
                warnings.push(format!(
                    "placeholder '{}' never occurs in the template text",
                    name
                ));
            }
            if entry.original_value.is_none() {
                warnings.push(format!("placeholder '{}' has no original value", name));
            }
        }
        warnings
    }
}

/// Where and why a model response failed to parse as a template.
#[derive(Debug)]
pub struct ParseFailure {
    /// Byte offset of the failure within the sanitized response.
    pub offset: usize,
    /// Bounded excerpt of the text around the failure point.
    pub snippet: String,
    pub message: String,
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at byte {} near: {}",
            self.message, self.offset, self.snippet
        )
    }
}

impl std::error::Error for ParseFailure {}

/// Parse a sanitized model response into a [`Template`].
///
/// Syntax is validated before shape, so a malformed document reports the
/// position of the JSON error rather than a type mismatch. Any failure is
/// terminal for the document: no partial recovery is attempted.
pub fn parse_template(sanitized: &str) -> Result<Template, ParseFailure> {
    if sanitized.is_empty() {
        return Err(ParseFailure {
            offset: 0,
            snippet: String::new(),
            message: "model returned no output".to_string(),
        });
    }

    if let Err(e) = serde_json::from_str::<serde_json::Value>(sanitized) {
        return Err(failure_from(sanitized, &e, "invalid JSON"));
    }

    serde_json::from_str::<Template>(sanitized)
        .map_err(|e| failure_from(sanitized, &e, "unexpected JSON shape"))
}

fn failure_from(text: &str, err: &serde_json::Error, what: &str) -> ParseFailure {
    let offset = byte_offset(text, err.line(), err.column());
    ParseFailure {
        offset,
        snippet: snippet_around(text, offset),
        message: format!("{}: {}", what, err),
    }
}

/// Convert serde_json's 1-based line/column into a byte offset.
fn byte_offset(text: &str, line: usize, column: usize) -> usize {
    let mut offset = 0;
    for (i, l) in text.split('\n').enumerate() {
        if i + 1 == line {
            return (offset + column.saturating_sub(1)).min(text.len());
        }
        offset += l.len() + 1;
    }
    text.len()
}

const SNIPPET_RADIUS: usize = 60;

/// A bounded, char-boundary-safe excerpt around an offset.
fn snippet_around(text: &str, offset: usize) -> String {
    let mut start = offset.saturating_sub(SNIPPET_RADIUS);
    while start > 0 && !text.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = (offset + SNIPPET_RADIUS).min(text.len());
    while end < text.len() && !text.is_char_boundary(end) {
        end += 1;
    }
    text[start..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD: &str = r#"{
        "Template": "Effective Date: Agreement_Date. Party: Company_Name.",
        "Placeholders": {
            "Agreement_Date": {"description": "Date the agreement takes effect", "original_value": "Jan 1, 2024"},
            "Company_Name": {"description": "Legal name of the party", "original_value": "Acme"}
        }
    }"#;

    #[test]
    fn parses_two_key_object() {
        let t = parse_template(GOOD).unwrap();
        assert_eq!(
            t.template_text,
            "Effective Date: Agreement_Date. Party: Company_Name."
        );
        assert_eq!(t.placeholders.len(), 2);
        assert_eq!(
            t.placeholders["Agreement_Date"].original_value.as_deref(),
            Some("Jan 1, 2024")
        );
    }

    #[test]
    fn preserves_emission_order() {
        let raw = r#"{"Template": "Zeta Alpha Mid", "Placeholders": {
            "Zeta": {"description": "", "original_value": "z"},
            "Alpha": {"description": "", "original_value": "a"},
            "Mid": {"description": "", "original_value": "m"}
        }}"#;
        let t = parse_template(raw).unwrap();
        let names: Vec<&str> = t.placeholders.keys().map(String::as_str).collect();
        assert_eq!(names, ["Zeta", "Alpha", "Mid"]);
    }

    #[test]
    fn empty_input_is_terminal() {
        let err = parse_template("").unwrap_err();
        assert!(err.message.contains("no output"));
    }

    #[test]
    fn invalid_json_reports_offset_and_snippet() {
        let raw = "{\"Template\": \"x\", \"Placeholders\": {";
        let err = parse_template(raw).unwrap_err();
        assert!(err.message.starts_with("invalid JSON"));
        assert!(err.offset <= raw.len());
        assert!(!err.snippet.is_empty());
    }

    #[test]
    fn missing_key_is_rejected() {
        let err = parse_template(r#"{"Template": "x"}"#).unwrap_err();
        assert!(err.message.starts_with("unexpected JSON shape"));
    }

    #[test]
    fn extra_top_level_key_is_rejected() {
        let raw = r#"{"Template": "x", "Placeholders": {}, "Notes": "y"}"#;
        assert!(parse_template(raw).is_err());
    }

    #[test]
    fn wrong_type_is_rejected() {
        let raw = r#"{"Template": "x", "Placeholders": []}"#;
        assert!(parse_template(raw).is_err());
    }

    #[test]
    fn integrity_flags_unused_and_malformed_entries() {
        let raw = r#"{"Template": "Hello Party_Name.", "Placeholders": {
            "Party_Name": {"description": "", "original_value": "Acme"},
            "Ghost_Field": {"description": "", "original_value": "x"},
            "Bad Name!": {"description": "", "original_value": "y"}
        }}"#;
        let t = parse_template(raw).unwrap();
        let warnings = t.integrity_warnings();
        assert!(warnings.iter().any(|w| w.contains("Ghost_Field")));
        assert!(warnings.iter().any(|w| w.contains("Bad Name!")));
        assert!(!warnings.iter().any(|w| w.contains("'Party_Name'")));
    }

    #[test]
    fn round_trips_persisted_shape() {
        let t = parse_template(GOOD).unwrap();
        let json = serde_json::to_value(&t).unwrap();
        assert!(json.get("Template").is_some());
        assert!(json.get("Placeholders").is_some());
        assert_eq!(json.as_object().unwrap().len(), 2);
    }
}
