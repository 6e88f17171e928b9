//! Normalizes raw model output into text a strict JSON parser can accept.
//!
//! Models intermittently wrap structured output in markdown code fences, and
//! truncated responses can lose the closing fence entirely. Complete fence
//! pairs are checked first, most specific to least; if none match, only a
//! matching opening fence is stripped and the remainder is left as-is.

/// Strip markdown code fences from a raw model response.
///
/// Idempotent: already-clean text comes back trimmed but otherwise unchanged.
/// An empty input yields an empty string, which callers must treat as a
/// failure to produce output rather than valid JSON.
pub fn sanitize(raw: &str) -> String {
    let text = raw.replace("\r\n", "\n").replace('\r', "\n");
    let text = text.trim();

    // Complete begins-and-ends fence pairs, most specific first.
    const PAIRS: [(&str, &str); 4] = [
        ("```json\n", "\n```"),
        ("```json", "```"),
        ("```\n", "\n```"),
        ("```", "```"),
    ];
    for (open, close) in PAIRS {
        if text.len() >= open.len() + close.len()
            && text.starts_with(open)
            && text.ends_with(close)
        {
            return text[open.len()..text.len() - close.len()].trim().to_string();
        }
    }

    // No complete pair matched (e.g. closing fence lost to truncation):
    // strip an opening fence prefix only, never fabricate a closing boundary.
    const PREFIXES: [&str; 4] = ["```json\n", "```json", "```\n", "```"];
    for prefix in PREFIXES {
        if let Some(rest) = text.strip_prefix(prefix) {
            return rest.trim().to_string();
        }
    }

    text.to_string()
}
