//! Substitution engine: turns a template plus a value set back into a
//! finished document.
//!
//! Replacement is literal substring substitution, not a templating language.
//! Placeholder names are restricted to a bare identifier alphabet, so literal
//! replacement is sufficient and avoids the metacharacter-escaping bugs of a
//! regex-based engine. Names are processed longest first so a name that is a
//! substring of another can never be consumed by the shorter one's pass.

use std::collections::HashMap;

use tracing::warn;

use crate::template::Template;

/// Caller-supplied replacement values, keyed by placeholder name. Ephemeral:
/// supplied per generation request, never persisted with the template.
pub type SubstitutionValueSet = HashMap<String, String>;

/// A rendered document plus any data-quality warnings accumulated while
/// resolving placeholders.
#[derive(Debug, Clone)]
pub struct Rendered {
    pub text: String,
    pub warnings: Vec<String>,
}

/// Render a template against a value set.
///
/// Resolution per placeholder: a value present in `values` is used verbatim,
/// including the empty string; otherwise the entry's original value;
/// otherwise the placeholder's own name survives as literal text and a
/// warning is recorded. Never fails; missing data downgrades to warnings.
pub fn render(template: &Template, values: &SubstitutionValueSet) -> Rendered {
    let mut names: Vec<&str> = template.placeholders.keys().map(String::as_str).collect();
    // Longest first; equal lengths ordered by name so output is a pure
    // function of the inputs.
    names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    let mut text = template.template_text.clone();
    let mut warnings = Vec::new();

    for name in names {
        let entry = &template.placeholders[name];
        let replacement = match values.get(name) {
            Some(v) => v.as_str(),
            None => match entry.original_value.as_deref() {
                Some(original) => original,
                None => {
                    warn!("No value available for '{}'; token left in output", name);
                    warnings.push(format!(
                        "no value for placeholder '{}'; the bare token was left in the output",
                        name
                    ));
                    name
                }
            },
        };
        text = text.replace(name, replacement);
    }

    Rendered { text, warnings }
}
