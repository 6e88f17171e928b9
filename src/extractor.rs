//! Pipeline orchestration: prompt construction, backend calls, response
//! sanitization, and typed parsing for every job kind.
//!
//! Each job is an independent, stateless unit of work over its own inputs.
//! The backend call is the only blocking step. There is no retry here;
//! failures propagate to the caller, which owns any retry policy.

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, error, info};

use crate::compare::{
    self, assign_labels, clip_to_budget, CompareError, ComparisonOutcome, DocLabel,
};
use crate::llm::CompletionBackend;
use crate::prompts;
use crate::sanitize::sanitize;
use crate::template::{parse_template, Template};

/// Terminal result of one template-extraction job.
#[derive(Debug)]
pub enum ExtractionOutcome {
    Parsed(Template),
    /// The backend answered, but the answer was not a usable template. The
    /// raw response is preserved for diagnosis.
    MalformedResponse { diagnostic: String, raw: String },
    BackendFailure { cause: String },
}

/// Result of one comparison job: the labels and names of the documents that
/// made it into the request, the outcome, and accumulated warnings.
#[derive(Debug)]
pub struct ComparisonReport {
    pub labels: Vec<DocLabel>,
    pub document_names: Vec<String>,
    pub outcome: ComparisonOutcome,
    pub warnings: Vec<String>,
}

/// Orchestrates the generation pipelines over a completion backend.
pub struct Extractor {
    backend: Arc<dyn CompletionBackend>,
}

impl Extractor {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self { backend }
    }

    /// Turn one document's text into a template plus placeholder entries.
    pub async fn extract_template(
        &self,
        source_name: &str,
        document_text: &str,
    ) -> ExtractionOutcome {
        info!(
            "Starting template extraction for: {} ({} chars) via {}",
            source_name,
            document_text.len(),
            self.backend.name()
        );

        let prompt = prompts::template_extraction(document_text);
        let raw = match self.backend.complete(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                error!("Backend call failed for {}: {:#}", source_name, e);
                return ExtractionOutcome::BackendFailure {
                    cause: format!("{:#}", e),
                };
            }
        };

        debug!("Raw extraction response: {} chars", raw.len());
        let cleaned = sanitize(&raw);

        match parse_template(&cleaned) {
            Ok(template) => {
                info!(
                    "Template extraction complete: {} ({} placeholders)",
                    source_name,
                    template.placeholders.len()
                );
                ExtractionOutcome::Parsed(template)
            }
            Err(failure) => {
                error!(
                    "Unusable extraction response for {}: {}",
                    source_name, failure
                );
                ExtractionOutcome::MalformedResponse {
                    diagnostic: failure.to_string(),
                    raw,
                }
            }
        }
    }

    /// Compare the given (name, text) documents in one aggregate request.
    ///
    /// Documents whose text is empty or whitespace-only are dropped; if fewer
    /// than two remain the job fails with the dropped names enumerated.
    /// Labels are assigned to the surviving documents in input order.
    pub async fn compare(
        &self,
        documents: &[(String, String)],
    ) -> Result<ComparisonReport, CompareError> {
        compare::validate_count(documents.len())?;

        let mut warnings = Vec::new();
        let mut usable: Vec<(&String, &str)> = Vec::new();
        let mut failed = Vec::new();
        for (name, text) in documents {
            if text.trim().is_empty() {
                failed.push(name.clone());
            } else {
                usable.push((name, text.as_str()));
            }
        }
        if usable.len() < compare::MIN_DOCUMENTS {
            return Err(CompareError::ExtractionFailed { failed });
        }
        for name in &failed {
            warnings.push(format!("document '{}' yielded no text and was skipped", name));
        }

        let labels = assign_labels(usable.len());
        let mut labelled: Vec<(DocLabel, &str)> = Vec::with_capacity(usable.len());
        for (label, (name, text)) in labels.iter().zip(&usable) {
            let (clipped, truncated) = clip_to_budget(text);
            if truncated {
                warnings.push(format!(
                    "document '{}' (Contract {}) truncated to {} characters",
                    name,
                    label,
                    compare::MAX_DOCUMENT_CHARS
                ));
            }
            labelled.push((*label, clipped));
        }

        info!(
            "Requesting aggregate comparison of {} documents via {}",
            labelled.len(),
            self.backend.name()
        );
        let prompt = prompts::comparison(&labelled);
        let raw = self
            .backend
            .complete(&prompt)
            .await
            .map_err(|e| CompareError::Backend(format!("{:#}", e)))?;

        debug!("Raw comparison response: {} chars", raw.len());
        let cleaned = sanitize(&raw);
        let (outcome, mut post_warnings) = compare::interpret_response(&cleaned, &labels);
        if matches!(outcome, ComparisonOutcome::NoValidData { .. }) {
            error!("comparison response unusable; raw response follows: {}", raw);
        }
        warnings.append(&mut post_warnings);

        Ok(ComparisonReport {
            labels,
            document_names: usable.iter().map(|(name, _)| (*name).clone()).collect(),
            outcome,
            warnings,
        })
    }

    /// Apply one free-form modification request to a generated contract.
    pub async fn refine(&self, contract_text: &str, instructions: &str) -> Result<String> {
        let prompt = prompts::refinement(contract_text, instructions);
        let raw = self.backend.complete(&prompt).await?;
        Ok(sanitize(&raw))
    }

    /// Restyle a generated contract as a standalone HTML document. Falls back
    /// to a preformatted wrapper when the backend's answer carries no HTML
    /// envelope.
    pub async fn restyle(&self, contract_text: &str, style_instructions: &str) -> Result<String> {
        let prompt = prompts::restyle(contract_text, style_instructions);
        let raw = self.backend.complete(&prompt).await?;
        let cleaned = sanitize(&raw);

        let lower = cleaned.to_lowercase();
        if lower.contains("<html") && lower.contains("</html>") {
            Ok(cleaned)
        } else {
            error!("restyle response carried no HTML envelope; using fallback rendering");
            Ok(format!(
                "<!DOCTYPE html><html><head><title>Formatted Document</title>\
                 <style>body{{font-family:sans-serif;}} pre{{white-space:pre-wrap;}}</style>\
                 </head><body><pre>{}</pre></body></html>",
                crate::report::escape(contract_text)
            ))
        }
    }
}
