//! Prompt construction for the four generation pipelines: template
//! extraction, multi-document comparison, contract refinement, and HTML
//! restyling.

use crate::compare::DocLabel;

const TEMPLATE_EXTRACTION_INSTRUCTIONS: &str = r#"Analyze the ENTIRE contract below and identify every piece of information that is specific to this particular instance of the document: names, dates, addresses, contact details, monetary amounts, durations, scopes of work, notice periods, and any other data that would change if the document were drawn up for different parties or terms.

For each identified piece of information:
1. Create a unique placeholder name using only letters, numbers, and underscores (e.g. Primary_Party_Name, Agreement_Effective_Date). If the information followed a label in the text ("Effective Date: January 1st, 2025"), derive the name from the label.
2. Record the original_value: ONLY the data content, EXACT, VERBATIM, and COMPLETE. If the information was preceded by a label, the label is NOT part of the value ("Effective Date: March 15, 2026" yields exactly "March 15, 2026"). Never truncate, summarize, or insert ellipses, no matter how long the value is.
3. Write a short description of what the field represents.

Then build the Template string: the full original text with ONLY the value parts replaced by their bare placeholder names. Labels that preceded values remain as static text. Preserve all original formatting, indentation, and line breaks.

Return a single valid JSON object with exactly this structure and nothing else (no markdown, no explanations):
{
  "Template": "<full text with placeholders>",
  "Placeholders": {
    "<Placeholder_Name>": {
      "description": "<what this field represents>",
      "original_value": "<exact verbatim value from the source>"
    }
  }
}"#;

/// Prompt asking the backend to turn a contract into a template plus
/// placeholder entries.
pub fn template_extraction(document_text: &str) -> String {
    format!(
        "{}\n\nInput contract:\n{}",
        TEMPLATE_EXTRACTION_INSTRUCTIONS, document_text
    )
}

/// Prompt asking the backend for one aggregate comparison of every labelled
/// document, returned as a JSON array of difference objects.
pub fn comparison(documents: &[(DocLabel, &str)]) -> String {
    let mut detail_keys = String::new();
    for (label, _) in documents {
        detail_keys.push_str(&format!(
            "\"{}\": (string, the relevant detail or excerpt from Contract {} for this aspect; if the aspect is missing there, say \"Not present in Contract {}\")\n",
            label.detail_key(),
            label,
            label
        ));
    }

    let mut sections = String::new();
    for (label, text) in documents {
        sections.push_str(&format!("\nContract {}:\n---\n{}\n---\n", label, text));
    }

    format!(
        r#"You are an expert legal assistant specializing in contract review and comparison. Meticulously review the {count} contracts provided below.

Identify the key clauses, terms, or aspects where there are material differences between any of the contracts: parties, effective dates, duration, governing law, payment terms, scope of work, confidentiality, liability limits, termination, dispute resolution, force majeure, assignment, notice requirements, or any non-standard clause that varies. Do NOT list aspects that are identical or substantially similar across all contracts.

Format your response as a JSON array of objects. Each object represents one identified difference and must have these keys:
"clause_category": (string, e.g. "Effective Date Discrepancy", "Governing Law Variation")
{detail_keys}"analysis_of_difference": (string, a brief explanation of the nature and potential implication of the difference.)

If you find NO material differences, return an empty JSON array: [].
{sections}
JSON output (a valid JSON array only, focusing on differences):"#,
        count = documents.len(),
        detail_keys = detail_keys,
        sections = sections,
    )
}

/// Prompt asking the backend to apply one modification request to an
/// already-generated contract.
pub fn refinement(contract_text: &str, instructions: &str) -> String {
    format!(
        r#"You are an expert contract modification assistant. Modify the contract below according to the user's request while preserving legal coherence, professional language, and the existing structure, numbering, and formatting everywhere the request does not touch.

Current contract:
{}

Modification request:
{}

Respond with ONLY the complete modified contract text. No explanations or commentary."#,
        contract_text, instructions
    )
}

/// Prompt asking the backend to restyle plain contract text as a complete
/// HTML document.
pub fn restyle(contract_text: &str, style_instructions: &str) -> String {
    format!(
        r#"You are an expert document stylist. Reformat the plain text below into a single, complete, well-structured HTML document with headings, paragraphs, emphasis, and lists where the structure calls for them. The document must include <!DOCTYPE html>, <html>, <head> with a <style> section, and <body>.

Styling instructions: {}

Plain text content:
---
{}
---

Respond with ONLY the complete HTML document. No explanations before or after."#,
        style_instructions, contract_text
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::assign_labels;

    #[test]
    fn comparison_prompt_names_every_label() {
        let labels = assign_labels(3);
        let docs: Vec<(DocLabel, &str)> = labels
            .iter()
            .copied()
            .zip(["first text", "second text", "third text"])
            .collect();
        let prompt = comparison(&docs);
        assert!(prompt.contains("contract_a_detail"));
        assert!(prompt.contains("contract_c_detail"));
        assert!(prompt.contains("Contract B:"));
        assert!(prompt.contains("3 contracts"));
    }

    #[test]
    fn extraction_prompt_embeds_the_document() {
        let prompt = template_extraction("THIS AGREEMENT is made on Jan 1.");
        assert!(prompt.contains("THIS AGREEMENT is made on Jan 1."));
        assert!(prompt.contains("\"Template\""));
    }
}
