use super::checks::{RelationChecks, RelationOutcome, VerificationReport};
use super::compare::ValueMatch;

fn pass_fail(passed: bool) -> &'static str {
    if passed { "PASS" } else { "FAIL" }
}

pub fn render_markdown(report: &VerificationReport) -> String {
    let mut lines = vec![
        "# Migration Verification Report".to_string(),
        format!("Date: {}", report.generated_at),
        format!("Source: {}", report.source),
        format!("Destination: {}", report.destination),
        String::new(),
    ];

    for relation in &report.relations {
        lines.push(format!("## Table: {}", relation.relation));
        match &relation.outcome {
            RelationOutcome::Checked(checks) => push_checks(&mut lines, checks),
            RelationOutcome::Error { reason } => {
                lines.push(format!("- **Verification**: ERROR ({reason})"));
            }
        }
    }

    lines.push(String::new());
    lines.push(format!("# OVERALL VERIFICATION: {}", report.verdict));
    lines.join("\n")
}

fn push_checks(lines: &mut Vec<String>, checks: &RelationChecks) {
    lines.push(format!(
        "- **Row Count**: {} (Source: {}, Destination: {})",
        pass_fail(checks.row_count_passed()),
        checks.source_rows,
        checks.destination_rows
    ));

    if checks.schema_passed() {
        lines.push("- **Schema (Columns)**: PASS".to_string());
    } else {
        lines.push("- **Schema (Columns)**: FAIL".to_string());
        lines.push(format!("  - Source: {}", column_list(&checks.source_columns)));
        lines.push(format!(
            "  - Destination: {}",
            column_list(&checks.destination_columns)
        ));
    }

    lines.push(match &checks.values {
        ValueMatch::Exact => "- **Data Integrity (Full Match)**: PASS".to_string(),
        ValueMatch::Rounded { exact_matched } => format!(
            "- **Data Integrity (Rounded Float Match)**: PASS (exact tier matched {exact_matched} rows)"
        ),
        ValueMatch::SkippedEmpty => "- **Data Integrity**: SKIPPED (Empty Table)".to_string(),
        ValueMatch::Incomparable => "- **Data Integrity**: FAIL (column sets differ)".to_string(),
        ValueMatch::Mismatch { matched, total } => format!(
            "- **Data Integrity**: FAIL/WARN. Exact match failed. Matched {matched}/{total}."
        ),
    });
}

fn column_list(columns: &[String]) -> String {
    let quoted = columns
        .iter()
        .map(|column| format!("'{column}'"))
        .collect::<Vec<_>>();
    format!("[{}]", quoted.join(", "))
}
