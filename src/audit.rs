use tracing::{debug, info, warn};

use crate::checks;
use crate::input::ExtractionDocument;
use crate::models::{
    is_exemption_marker, is_no_grade_marker, AuditSummary, JournalContext, JournalReportEntry,
    JournalViolationReport, StudentRecord, Violation,
};

/// Runs every check against one student row. The consecutive-failure scan
/// always runs; the remaining checks are bypassed when the final grade is the
/// no-grade marker. An exemption marker flips the sufficiency check and
/// suppresses the final-grade comparison.
pub fn evaluate_student(student: &StudentRecord, context: &JournalContext) -> Vec<Violation> {
    let mut violations = Vec::new();

    for subtype in checks::detect_consecutive_failures(&student.cells) {
        violations.push(Violation::ConsecutiveFailures { subtype });
    }

    let final_grade = student.final_grade.as_deref();
    if final_grade.is_some_and(is_no_grade_marker) {
        return violations;
    }

    let is_exempt = final_grade.is_some_and(is_exemption_marker);
    if let Some(violation) =
        checks::check_sufficiency(&student.cells, context.required_grade_count(), is_exempt)
    {
        violations.push(violation);
    }

    if !is_exempt {
        if let Some(violation) =
            checks::check_final_grade(final_grade, student.average_grade, &context.subject_name)
        {
            violations.push(violation);
        }
    }

    if let Some(violation) = checks::check_regression(&student.cells, final_grade) {
        violations.push(violation);
    }

    violations
}

pub fn audit_journal(context: &JournalContext, students: &[StudentRecord]) -> JournalViolationReport {
    let mut report =
        JournalViolationReport::new(context.journal_id.clone(), context.journal_name.clone());

    debug!(
        journal = %context.journal_name,
        lessons = context.lesson_count,
        required_grades = context.required_grade_count(),
        "auditing journal"
    );

    for student in students {
        let violations = evaluate_student(student, context);
        if !violations.is_empty() {
            debug!(
                student = student.name.as_deref().unwrap_or("(без имени)"),
                violations = violations.len(),
                "student has violations"
            );
        }
        for violation in violations {
            report.record(violation);
        }
    }

    report
}

/// Audits every journal in an extraction document and folds the per-journal
/// results into the run summary. Journals the extraction stage failed on are
/// logged and skipped; clean journals are omitted from the report.
pub fn audit_run(document: &ExtractionDocument) -> AuditSummary {
    let mut summary = AuditSummary {
        base_url: document.base_url.clone(),
        violations_found: 0,
        journals: Vec::new(),
    };

    for class in &document.classes {
        info!(class = %class.name, journals = class.journals.len(), "processing class");

        for journal in &class.journals {
            if let Some(error) = &journal.error {
                warn!(
                    journal = %journal.name,
                    journal_id = %journal.id,
                    error = %error,
                    "skipping journal with extraction error"
                );
                continue;
            }

            let context = journal.context(&class.name);
            let students = journal.student_records();
            let report = audit_journal(&context, &students);

            if report.violation_types.is_empty() {
                continue;
            }

            info!(
                journal = %context.journal_name,
                violations = report.violation_count,
                "violations found"
            );
            summary.violations_found += report.violation_count;
            summary.journals.push(JournalReportEntry::from(&report));
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FailureRunKind, GradeCell, GradeValue};

    fn cell(value: &str) -> GradeCell {
        GradeCell {
            value: GradeValue::parse(Some(value)),
            stacked: false,
        }
    }

    fn sample_context(lesson_count: usize) -> JournalContext {
        JournalContext {
            journal_id: "2314390".to_string(),
            journal_name: "7А - Математика".to_string(),
            subject_name: "Математика".to_string(),
            lesson_count,
        }
    }

    fn sample_student(
        cells: Vec<GradeCell>,
        final_grade: Option<&str>,
        average_grade: Option<f64>,
    ) -> StudentRecord {
        StudentRecord {
            name: Some("Иванов И.".to_string()),
            cells,
            final_grade: final_grade.map(str::to_string),
            average_grade,
        }
    }

    #[test]
    fn evaluation_is_idempotent() {
        let context = sample_context(20);
        let student = sample_student(vec![cell("2"), cell("2"), cell("2")], Some("3"), Some(3.0));

        let first = evaluate_student(&student, &context);
        let second = evaluate_student(&student, &context);
        assert_eq!(first, second);
    }

    #[test]
    fn no_grade_marker_bypasses_everything_but_the_failure_scan() {
        let context = sample_context(20);
        let student = sample_student(vec![cell("2"), cell("2"), cell("2")], Some("б/о"), Some(4.7));

        let violations = evaluate_student(&student, &context);
        assert_eq!(
            violations,
            vec![Violation::ConsecutiveFailures {
                subtype: FailureRunKind::Simple
            }]
        );
    }

    #[test]
    fn exemption_marker_flips_sufficiency_and_skips_final_grade() {
        let context = sample_context(10);
        // Average disagrees with any final grade; the check must not run.
        let student = sample_student(
            vec![cell("4"), cell("4"), cell("5"), cell("4")],
            Some("а/з"),
            Some(2.0),
        );

        let violations = evaluate_student(&student, &context);
        assert_eq!(violations, vec![Violation::ExemptWithSufficientGrades]);
    }

    #[test]
    fn long_journal_requires_five_grades() {
        let context = sample_context(20);
        let student = sample_student(
            vec![cell("3"), cell("4"), cell("2")],
            Some("3"),
            Some(3.0),
        );

        let violations = evaluate_student(&student, &context);
        assert_eq!(
            violations,
            vec![
                Violation::InsufficientGrades,
                Violation::GradeRegressionBeforeFinal {
                    final_grade: "3".to_string(),
                },
            ]
        );
    }

    #[test]
    fn run_skips_errored_journals_and_omits_clean_ones() {
        let raw = r#"{
            "baseURL": "https://journal.example/grade/",
            "classes": [
                {
                    "name": "7А",
                    "journals": [
                        {
                            "id": "1",
                            "name": "Математика",
                            "lesson_count": 20,
                            "students": [
                                { "final_grade": "3", "average_grade": 3.0,
                                  "cells": [ { "value": "3" }, { "value": "4" }, { "value": "2" } ] }
                            ]
                        },
                        {
                            "id": "2",
                            "name": "Музыка",
                            "lesson_count": 10,
                            "students": [
                                { "final_grade": "4", "average_grade": 3.5,
                                  "cells": [ { "value": "4" }, { "value": "3" }, { "value": "4" } ] }
                            ]
                        },
                        { "id": "3", "name": "Химия", "error": "не загрузилась страница" }
                    ]
                }
            ]
        }"#;
        let document: ExtractionDocument = serde_json::from_str(raw).unwrap();

        let summary = audit_run(&document);
        assert_eq!(summary.base_url, "https://journal.example/grade/");
        assert_eq!(summary.violations_found, 2);
        assert_eq!(summary.journals.len(), 1);

        let entry = &summary.journals[0];
        assert_eq!(entry.journal_id, "1");
        assert_eq!(entry.journal_name, "7А - Математика");
        assert_eq!(entry.violations_count, 2);
        assert_eq!(
            entry.violation_kinds,
            vec![
                "insufficient_grades".to_string(),
                "last_grade_2_final_3".to_string()
            ]
        );
    }

    #[test]
    fn journal_report_counts_events_and_deduplicates_kinds() {
        let context = sample_context(20);
        let students = vec![
            sample_student(vec![cell("3")], Some("3"), Some(3.0)),
            sample_student(vec![cell("4")], Some("4"), Some(3.7)),
        ];

        let report = audit_journal(&context, &students);
        assert_eq!(report.violation_count, 2);
        assert_eq!(report.violation_types.len(), 1);
        assert!(report
            .violation_types
            .contains(&Violation::InsufficientGrades));
    }
}
