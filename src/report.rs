//! HTML projection of a comparison outcome: one row per surviving
//! difference record, one detail column per document label.

use crate::compare::{ComparisonOutcome, DifferenceRecord, DocLabel};

/// Render a comparison outcome as a standalone HTML document.
///
/// A successful comparison with zero differences gets an explicit
/// "no differences" notice; an uninterpretable backend response gets a
/// processing-error notice. The two never share wording.
pub fn render_report(outcome: &ComparisonOutcome, labels: &[DocLabel]) -> String {
    match outcome {
        ComparisonOutcome::NoValidData { diagnostic } => notice_page(&format!(
            "No comparison data was generated. This could be due to an error in \
             processing or the model not returning valid data. Detail: {}",
            escape(diagnostic)
        )),
        ComparisonOutcome::Compared { differences } if differences.is_empty() => {
            notice_page("No material differences were identified between the documents.")
        }
        ComparisonOutcome::Compared { differences } => table_page(differences, labels),
    }
}

fn notice_page(message: &str) -> String {
    format!(
        "<html><head><title>Contract Comparison Report</title></head>\
         <body><h1>Contract Comparison Report</h1><p>{}</p></body></html>",
        message
    )
}

fn table_page(differences: &[DifferenceRecord], labels: &[DocLabel]) -> String {
    let mut detail_headers = String::new();
    for label in labels {
        detail_headers.push_str(&format!("<th>Contract {} Detail</th>\n", label));
    }

    let mut html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Contract Comparison Report</title>
    <style>
        body {{ font-family: sans-serif; margin: 20px; background-color: #f4f4f9; color: #333; }}
        h1 {{ color: #333; text-align: center; }}
        table {{ width: 100%; border-collapse: collapse; margin-top: 20px; box-shadow: 0 2px 15px rgba(0,0,0,0.1); background-color: #fff; }}
        th, td {{ border: 1px solid #ddd; padding: 12px; text-align: left; vertical-align: top; }}
        th {{ background-color: #007bff; color: white; font-weight: bold; }}
        tr:nth-child(even) {{ background-color: #f9f9f9; }}
        tr:hover {{ background-color: #f1f1f1; }}
        .category {{ font-weight: bold; }}
        .difference {{ color: #d9534f; }}
        .no-difference {{ color: #5cb85c; }}
        .detail-cell {{ white-space: pre-wrap; word-wrap: break-word; }}
    </style>
</head>
<body>
    <h1>Contract Comparison Report - Identified Differences ({} Contracts)</h1>
    <table>
        <thead>
            <tr>
                <th>Differing Aspect / Clause Category</th>
                {}<th>Analysis of Difference</th>
            </tr>
        </thead>
        <tbody>
"#,
        labels.len(),
        detail_headers
    );

    for record in differences {
        let analysis_lower = record.analysis.to_lowercase();
        let analysis_class = if analysis_lower.contains("no significant difference")
            || analysis_lower.contains("similar")
        {
            "no-difference"
        } else {
            "difference"
        };

        let mut detail_cells = String::new();
        for detail in &record.details {
            detail_cells.push_str(&format!(
                "<td class=\"detail-cell\">{}</td>\n",
                escape(detail)
            ));
        }

        html.push_str(&format!(
            "<tr>\n<td class=\"category\">{}</td>\n{}<td class=\"{} detail-cell\">{}</td>\n</tr>\n",
            escape(&record.clause_category),
            detail_cells,
            analysis_class,
            escape(&record.analysis)
        ));
    }

    html.push_str("</tbody>\n</table>\n</body>\n</html>\n");
    html
}

/// Minimal HTML entity escaping for text cells.
pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::assign_labels;

    fn record(category: &str, details: &[&str], analysis: &str) -> DifferenceRecord {
        DifferenceRecord {
            clause_category: category.to_string(),
            details: details.iter().map(|s| s.to_string()).collect(),
            analysis: analysis.to_string(),
        }
    }

    #[test]
    fn zero_differences_and_failure_render_distinct_notices() {
        let labels = assign_labels(2);
        let empty = render_report(
            &ComparisonOutcome::Compared {
                differences: Vec::new(),
            },
            &labels,
        );
        let failed = render_report(
            &ComparisonOutcome::NoValidData {
                diagnostic: "not a JSON array".to_string(),
            },
            &labels,
        );
        assert!(empty.contains("No material differences"));
        assert!(failed.contains("No comparison data was generated"));
        assert_ne!(empty, failed);
    }

    #[test]
    fn one_row_per_record_one_column_per_label() {
        let labels = assign_labels(3);
        let outcome = ComparisonOutcome::Compared {
            differences: vec![
                record("Term", &["6 months", "12 months", "N/A"], "Durations differ."),
                record("Fee", &["$5,000", "$9,000", "$5,000"], "Amounts differ."),
            ],
        };
        let html = render_report(&outcome, &labels);
        assert_eq!(html.matches("<tr>\n<td class=\"category\">").count(), 2);
        assert!(html.contains("Contract A Detail"));
        assert!(html.contains("Contract C Detail"));
        assert!(html.contains("3 Contracts"));
    }

    #[test]
    fn cell_content_is_escaped() {
        let labels = assign_labels(2);
        let outcome = ComparisonOutcome::Compared {
            differences: vec![record(
                "Notices",
                &["<b>mail</b>", "email & fax"],
                "Channels differ.",
            )],
        };
        let html = render_report(&outcome, &labels);
        assert!(html.contains("&lt;b&gt;mail&lt;/b&gt;"));
        assert!(html.contains("email &amp; fax"));
        assert!(!html.contains("<b>mail</b>"));
    }

    #[test]
    fn similar_analysis_gets_the_quiet_class() {
        let labels = assign_labels(2);
        let outcome = ComparisonOutcome::Compared {
            differences: vec![record("Venue", &["NY", "NYC"], "Substantially similar wording.")],
        };
        let html = render_report(&outcome, &labels);
        assert!(html.contains("class=\"no-difference detail-cell\""));
    }
}
