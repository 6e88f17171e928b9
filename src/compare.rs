//! Multi-document difference aggregation.
//!
//! One comparison job covers 2-10 documents labelled A, B, C, ... in input
//! order. The backend is asked once for a JSON array of difference objects
//! keyed by those labels; everything after that response is deterministic
//! post-processing: shape recovery, absence-row filtering, and a hard
//! distinction between "compared, zero differences" and "response unusable".

use std::fmt;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

pub const MIN_DOCUMENTS: usize = 2;
pub const MAX_DOCUMENTS: usize = 10;

/// Character budget per document before the aggregate request is built.
pub const MAX_DOCUMENT_CHARS: usize = 30_000;

/// Fixed absence sentinels, compared case-insensitively against trimmed text.
const ABSENCE_SENTINELS: [&str; 3] = ["not specified", "not found", "n/a"];

/// Analysis text the backend emits for rows that matched nothing anywhere.
const ABSENT_EVERYWHERE_ANALYSIS: &str = "not found in any contract.";

/// Position-assigned document label (A, B, C, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DocLabel(char);

impl DocLabel {
    pub fn letter(self) -> char {
        self.0
    }

    /// JSON key carrying this document's detail in a difference object.
    pub fn detail_key(self) -> String {
        format!("contract_{}_detail", self.0.to_ascii_lowercase())
    }
}

impl fmt::Display for DocLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Labels for `count` documents in input order.
pub fn assign_labels(count: usize) -> Vec<DocLabel> {
    (0..count)
        .map(|i| DocLabel((b'A' + i as u8) as char))
        .collect()
}

/// Why a comparison job could not start or proceed.
#[derive(Debug, Error)]
pub enum CompareError {
    #[error("at least {MIN_DOCUMENTS} documents are required for comparison, got {0}")]
    TooFewDocuments(usize),
    #[error("at most {MAX_DOCUMENTS} documents are supported for comparison, got {0}")]
    TooManyDocuments(usize),
    #[error("could not extract text from: {}", failed.join(", "))]
    ExtractionFailed { failed: Vec<String> },
    #[error("generation backend failed: {0}")]
    Backend(String),
}

/// Reject document counts outside the supported range.
pub fn validate_count(count: usize) -> Result<(), CompareError> {
    if count < MIN_DOCUMENTS {
        Err(CompareError::TooFewDocuments(count))
    } else if count > MAX_DOCUMENTS {
        Err(CompareError::TooManyDocuments(count))
    } else {
        Ok(())
    }
}

/// Clip a document to the per-document character budget on a char boundary.
/// Returns the clipped text and whether anything was dropped.
pub fn clip_to_budget(text: &str) -> (&str, bool) {
    if text.len() <= MAX_DOCUMENT_CHARS {
        return (text, false);
    }
    let mut end = MAX_DOCUMENT_CHARS;
    while !text.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    (&text[..end], true)
}

/// One differing aspect across the compared documents. `details` is parallel
/// to the job's label list.
#[derive(Debug, Clone, Serialize)]
pub struct DifferenceRecord {
    pub clause_category: String,
    pub details: Vec<String>,
    pub analysis: String,
}

/// Terminal result of a comparison job.
///
/// An empty `differences` list means the documents were compared and no
/// material differences survived filtering; `NoValidData` means the backend
/// response could not be interpreted at all. Callers must never conflate the
/// two.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ComparisonOutcome {
    Compared { differences: Vec<DifferenceRecord> },
    NoValidData { diagnostic: String },
}

fn is_absence(text: &str) -> bool {
    let t = text.trim().to_lowercase();
    ABSENCE_SENTINELS.iter().any(|s| *s == t)
}

/// Interpret a sanitized backend response for the given labels.
///
/// Accepts a JSON array of difference objects, or a single object that looks
/// like one difference record (it carries the category key), which is wrapped
/// into a one-element array. Anything else is `NoValidData`. Rows where every
/// document's detail is an absence sentinel and the analysis itself is an
/// absence statement are discarded before rendering; each discard is a
/// warning, not an error.
pub fn interpret_response(
    sanitized: &str,
    labels: &[DocLabel],
) -> (ComparisonOutcome, Vec<String>) {
    let mut warnings = Vec::new();

    if sanitized.is_empty() {
        warnings.push("backend returned an empty response; treated as no differences".to_string());
        return (
            ComparisonOutcome::Compared {
                differences: Vec::new(),
            },
            warnings,
        );
    }

    let value: Value = match serde_json::from_str(sanitized) {
        Ok(v) => v,
        Err(e) => {
            warn!("comparison response is not valid JSON: {}", e);
            return (
                ComparisonOutcome::NoValidData {
                    diagnostic: format!(
                        "response is not valid JSON ({}): {}",
                        e,
                        excerpt(sanitized)
                    ),
                },
                warnings,
            );
        }
    };

    let elements = match value {
        Value::Array(items) => items,
        Value::Object(obj) if obj.contains_key("clause_category") => {
            warnings.push("backend returned a single object; wrapped into a one-element array".to_string());
            vec![Value::Object(obj)]
        }
        other => {
            return (
                ComparisonOutcome::NoValidData {
                    diagnostic: format!(
                        "response is {} rather than an array of difference objects",
                        json_kind(&other)
                    ),
                },
                warnings,
            );
        }
    };

    let mut differences = Vec::new();
    let mut discarded = 0usize;

    for element in elements {
        let Some(obj) = element.as_object() else {
            warnings.push("skipped a non-object element in the comparison response".to_string());
            continue;
        };

        let clause_category = str_field(obj, "clause_category");
        let analysis = str_field(obj, "analysis_of_difference");
        let details: Vec<String> = labels
            .iter()
            .map(|label| str_field(obj, &label.detail_key()))
            .collect();

        let all_absent = details.iter().all(|d| is_absence(d));
        let analysis_lower = analysis.trim().to_lowercase();
        if analysis_lower == ABSENT_EVERYWHERE_ANALYSIS
            || (all_absent && is_absence(&analysis))
        {
            discarded += 1;
            continue;
        }

        differences.push(DifferenceRecord {
            clause_category,
            details,
            analysis,
        });
    }

    if discarded > 0 {
        warnings.push(format!(
            "discarded {} row(s) where every document reported the aspect as absent",
            discarded
        ));
    }

    (ComparisonOutcome::Compared { differences }, warnings)
}

fn str_field(obj: &serde_json::Map<String, Value>, key: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .unwrap_or("N/A")
        .to_string()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn excerpt(text: &str) -> String {
    let mut end = text.len().min(200);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_follow_input_order() {
        let labels = assign_labels(3);
        let letters: Vec<char> = labels.iter().map(|l| l.letter()).collect();
        assert_eq!(letters, ['A', 'B', 'C']);
        assert_eq!(labels[1].detail_key(), "contract_b_detail");
    }

    #[test]
    fn count_bounds_are_enforced() {
        assert!(matches!(
            validate_count(1),
            Err(CompareError::TooFewDocuments(1))
        ));
        assert!(matches!(
            validate_count(11),
            Err(CompareError::TooManyDocuments(11))
        ));
        assert!(validate_count(2).is_ok());
        assert!(validate_count(10).is_ok());
    }

    #[test]
    fn clip_respects_char_boundaries() {
        let long = "é".repeat(MAX_DOCUMENT_CHARS); // 2 bytes per char
        let (clipped, truncated) = clip_to_budget(&long);
        assert!(truncated);
        assert!(clipped.len() <= MAX_DOCUMENT_CHARS);
        assert!(clipped.chars().all(|c| c == 'é'));

        let short = "abc";
        assert_eq!(clip_to_budget(short), ("abc", false));
    }

    #[test]
    fn empty_array_is_success_with_zero_differences() {
        let (outcome, _) = interpret_response("[]", &assign_labels(2));
        match outcome {
            ComparisonOutcome::Compared { differences } => assert!(differences.is_empty()),
            other => panic!("expected Compared, got {:?}", other),
        }
    }

    #[test]
    fn garbage_is_no_valid_data_not_empty() {
        let (outcome, _) = interpret_response("I could not compare these.", &assign_labels(2));
        assert!(matches!(outcome, ComparisonOutcome::NoValidData { .. }));

        let (outcome, _) = interpret_response("\"just a string\"", &assign_labels(2));
        assert!(matches!(outcome, ComparisonOutcome::NoValidData { .. }));
    }

    #[test]
    fn single_record_object_is_wrapped() {
        let raw = r#"{"clause_category": "Governing Law",
                      "contract_a_detail": "New York",
                      "contract_b_detail": "Delaware",
                      "analysis_of_difference": "Different fora."}"#;
        let (outcome, warnings) = interpret_response(raw, &assign_labels(2));
        match outcome {
            ComparisonOutcome::Compared { differences } => {
                assert_eq!(differences.len(), 1);
                assert_eq!(differences[0].details, ["New York", "Delaware"]);
            }
            other => panic!("expected Compared, got {:?}", other),
        }
        assert!(warnings.iter().any(|w| w.contains("single object")));
    }

    #[test]
    fn object_without_category_is_no_valid_data() {
        let (outcome, _) = interpret_response(r#"{"error": "oops"}"#, &assign_labels(2));
        assert!(matches!(outcome, ComparisonOutcome::NoValidData { .. }));
    }

    #[test]
    fn all_absent_rows_are_discarded() {
        let raw = r#"[
            {"clause_category": "Force Majeure",
             "contract_a_detail": "Not Found",
             "contract_b_detail": "not found",
             "contract_c_detail": "N/A",
             "analysis_of_difference": "not found in any contract."},
            {"clause_category": "Payment Terms",
             "contract_a_detail": "$5,000 net 30",
             "contract_b_detail": "Not Found",
             "contract_c_detail": "$7,500 net 60",
             "analysis_of_difference": "Amounts and schedules differ."}
        ]"#;
        let (outcome, warnings) = interpret_response(raw, &assign_labels(3));
        match outcome {
            ComparisonOutcome::Compared { differences } => {
                assert_eq!(differences.len(), 1);
                assert_eq!(differences[0].clause_category, "Payment Terms");
            }
            other => panic!("expected Compared, got {:?}", other),
        }
        assert!(warnings.iter().any(|w| w.contains("discarded 1")));
    }

    #[test]
    fn absent_details_with_substantive_analysis_survive() {
        let raw = r#"[{"clause_category": "Indemnity",
                       "contract_a_detail": "Not Found",
                       "contract_b_detail": "Not Found",
                       "analysis_of_difference": "Neither contract indemnifies, which is unusual for this deal size."}]"#;
        let (outcome, _) = interpret_response(raw, &assign_labels(2));
        match outcome {
            ComparisonOutcome::Compared { differences } => assert_eq!(differences.len(), 1),
            other => panic!("expected Compared, got {:?}", other),
        }
    }

    #[test]
    fn missing_detail_keys_default_to_absent_sentinel() {
        let raw = r#"[{"clause_category": "Term",
                       "contract_a_detail": "6 months",
                       "analysis_of_difference": "Only one contract fixes a term."}]"#;
        let (outcome, _) = interpret_response(raw, &assign_labels(2));
        match outcome {
            ComparisonOutcome::Compared { differences } => {
                assert_eq!(differences[0].details, ["6 months", "N/A"]);
            }
            other => panic!("expected Compared, got {:?}", other),
        }
    }

    #[test]
    fn empty_response_counts_as_no_differences() {
        let (outcome, warnings) = interpret_response("", &assign_labels(2));
        assert!(matches!(
            outcome,
            ComparisonOutcome::Compared { ref differences } if differences.is_empty()
        ));
        assert!(warnings.iter().any(|w| w.contains("empty response")));
    }
}
