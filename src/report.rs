use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;
use serde::Serialize;

use crate::models::AuditSummary;

/// Name of the summary file for a given report date. The downstream web
/// reader resolves reports by this date stamp.
pub fn report_filename(date: NaiveDate) -> String {
    format!("violations_chain_report_{}.json", date.format("%Y-%m-%d"))
}

pub fn write_summary(summary: &AuditSummary, out_dir: &Path, date: NaiveDate) -> anyhow::Result<PathBuf> {
    let path = out_dir.join(report_filename(date));
    let contents = serde_json::to_string_pretty(summary)?;
    std::fs::write(&path, contents)
        .with_context(|| format!("failed to write report {}", path.display()))?;
    Ok(path)
}

pub fn load_summary(path: &Path) -> anyhow::Result<AuditSummary> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read report {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse report {}", path.display()))
}

pub fn build_markdown(summary: &AuditSummary, date: NaiveDate) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Journal Audit Report");
    let _ = writeln!(
        output,
        "Generated {} for {}",
        date.format("%d.%m.%Y"),
        summary.base_url
    );
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "Journals with violations: {}. Total violations: {}.",
        summary.journals.len(),
        summary.violations_found
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Journals");

    if summary.journals.is_empty() {
        let _ = writeln!(output, "No violations found.");
    } else {
        for entry in summary.journals.iter() {
            let _ = writeln!(
                output,
                "- {} (ID {}): {} violations — {}",
                entry.journal_name,
                entry.journal_id,
                entry.violations_count,
                entry.violation_kinds.join(", ")
            );
        }
    }

    output
}

#[derive(Serialize)]
struct CsvRow<'a> {
    journal_id: &'a str,
    journal_name: &'a str,
    violations_count: usize,
    violation_kind: &'a str,
}

/// Flattens the summary into one CSV row per (journal, violation kind).
/// Returns the number of rows written.
pub fn write_csv<W: std::io::Write>(summary: &AuditSummary, writer: W) -> anyhow::Result<usize> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    let mut rows = 0usize;

    for entry in summary.journals.iter() {
        for kind in entry.violation_kinds.iter() {
            csv_writer.serialize(CsvRow {
                journal_id: &entry.journal_id,
                journal_name: &entry.journal_name,
                violations_count: entry.violations_count,
                violation_kind: kind,
            })?;
            rows += 1;
        }
    }

    csv_writer.flush()?;
    Ok(rows)
}

pub fn export_csv(summary: &AuditSummary, path: &Path) -> anyhow::Result<usize> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    write_csv(summary, file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JournalReportEntry;

    fn sample_summary() -> AuditSummary {
        AuditSummary {
            base_url: "https://journal.example/grade/".to_string(),
            violations_found: 3,
            journals: vec![JournalReportEntry {
                journal_id: "2314390".to_string(),
                journal_name: "7А - Математика".to_string(),
                violations_count: 3,
                violation_kinds: vec![
                    "insufficient_grades".to_string(),
                    "last_grade_2_final_3".to_string(),
                ],
            }],
        }
    }

    fn sample_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
    }

    #[test]
    fn filename_is_date_stamped() {
        assert_eq!(
            report_filename(sample_date()),
            "violations_chain_report_2026-03-14.json"
        );
    }

    #[test]
    fn summary_round_trips_through_json() {
        let summary = sample_summary();
        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"baseURL\""));
        assert!(json.contains("\"violation_kinds\""));

        let parsed: AuditSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.violations_found, 3);
        assert_eq!(parsed.journals[0].journal_id, "2314390");
    }

    #[test]
    fn markdown_lists_each_journal() {
        let markdown = build_markdown(&sample_summary(), sample_date());
        assert!(markdown.contains("# Journal Audit Report"));
        assert!(markdown.contains("Generated 14.03.2026"));
        assert!(markdown.contains("7А - Математика (ID 2314390): 3 violations"));
        assert!(markdown.contains("insufficient_grades, last_grade_2_final_3"));
    }

    #[test]
    fn markdown_handles_a_clean_run() {
        let summary = AuditSummary {
            base_url: String::new(),
            violations_found: 0,
            journals: Vec::new(),
        };
        let markdown = build_markdown(&summary, sample_date());
        assert!(markdown.contains("No violations found."));
    }

    #[test]
    fn csv_emits_one_row_per_violation_kind() {
        let mut buffer = Vec::new();
        let rows = write_csv(&sample_summary(), &mut buffer).unwrap();
        assert_eq!(rows, 2);

        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("journal_id,journal_name,violations_count,violation_kind")
        );
        assert_eq!(
            lines.next(),
            Some("2314390,7А - Математика,3,insufficient_grades")
        );
        assert_eq!(
            lines.next(),
            Some("2314390,7А - Математика,3,last_grade_2_final_3")
        );
    }
}
