use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Final-grade markers meaning "no grade recorded"; suppresses most
/// per-student checks.
const NO_GRADE_MARKERS: [&str; 2] = ["б/о", "бо"];

/// Final-grade markers meaning the student is formally excused from grading.
const EXEMPTION_MARKERS: [&str; 2] = ["а/з", "аз"];

pub fn is_no_grade_marker(grade: &str) -> bool {
    let lower = grade.trim().to_lowercase();
    NO_GRADE_MARKERS.contains(&lower.as_str())
}

pub fn is_exemption_marker(grade: &str) -> bool {
    let lower = grade.trim().to_lowercase();
    EXEMPTION_MARKERS.contains(&lower.as_str())
}

/// One lesson slot's value as classified by the extraction stage.
/// Non-numeric tags compare by exact string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GradeValue {
    Numeric(u8),
    Special(String),
    Empty,
    Other(String),
}

impl GradeValue {
    pub fn parse(raw: Option<&str>) -> GradeValue {
        let Some(text) = raw else {
            return GradeValue::Empty;
        };
        match text.trim() {
            "" => GradeValue::Empty,
            "2" => GradeValue::Numeric(2),
            "3" => GradeValue::Numeric(3),
            "4" => GradeValue::Numeric(4),
            "5" => GradeValue::Numeric(5),
            special @ ("См" | "НВ") => GradeValue::Special(special.to_string()),
            other => GradeValue::Other(other.to_string()),
        }
    }

    pub fn is_valid_numeric(&self) -> bool {
        matches!(self, GradeValue::Numeric(_))
    }
}

/// A single grade cell. `stacked` marks a slot that displayed more than one
/// underlying mark; it lowers the certainty of a finding, never suppresses it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeCell {
    pub value: GradeValue,
    pub stacked: bool,
}

/// One student's row: cells in lesson (chronological) order, with the name,
/// final-grade and average columns already split out.
#[derive(Debug, Clone)]
pub struct StudentRecord {
    pub name: Option<String>,
    pub cells: Vec<GradeCell>,
    pub final_grade: Option<String>,
    pub average_grade: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct JournalContext {
    pub journal_id: String,
    pub journal_name: String,
    pub subject_name: String,
    pub lesson_count: usize,
}

impl JournalContext {
    /// Minimum number of valid numeric grades expected in this journal.
    pub fn required_grade_count(&self) -> usize {
        if self.lesson_count > 15 {
            5
        } else {
            3
        }
    }
}

/// Classification of a consecutive-failure run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FailureRunKind {
    Simple,
    MultipleGrades,
    SpecialValues,
    Combined,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Violation {
    ConsecutiveFailures { subtype: FailureRunKind },
    InsufficientGrades,
    PossiblyInsufficientGrades,
    ExemptWithSufficientGrades,
    IncorrectFinalGrade { actual: String, expected: String },
    GradeRegressionBeforeFinal { final_grade: String },
}

impl Violation {
    /// Stable label used in the report JSON and exports.
    pub fn kind_label(&self) -> String {
        match self {
            Violation::ConsecutiveFailures { subtype } => match subtype {
                FailureRunKind::Simple => "consecutive_twos".to_string(),
                FailureRunKind::MultipleGrades => "consecutive_twos_multiple_grades".to_string(),
                FailureRunKind::SpecialValues => "consecutive_twos_special_values".to_string(),
                FailureRunKind::Combined => "consecutive_twos_combined".to_string(),
            },
            Violation::InsufficientGrades => "insufficient_grades".to_string(),
            Violation::PossiblyInsufficientGrades => "possibly_insufficient_grades".to_string(),
            Violation::ExemptWithSufficientGrades => "az_with_sufficient_grades".to_string(),
            Violation::IncorrectFinalGrade { actual, expected } => {
                format!("incorrect_final_grade_{actual}_expected_{expected}")
            }
            Violation::GradeRegressionBeforeFinal { final_grade } => {
                format!("last_grade_2_final_{final_grade}")
            }
        }
    }
}

/// Per-journal result of a scan. `violation_count` counts every detection
/// event; `violation_types` is the deduplicated set across students.
#[derive(Debug, Clone)]
pub struct JournalViolationReport {
    pub journal_id: String,
    pub journal_name: String,
    pub violation_types: BTreeSet<Violation>,
    pub violation_count: usize,
}

impl JournalViolationReport {
    pub fn new(journal_id: String, journal_name: String) -> JournalViolationReport {
        JournalViolationReport {
            journal_id,
            journal_name,
            violation_types: BTreeSet::new(),
            violation_count: 0,
        }
    }

    pub fn record(&mut self, violation: Violation) {
        self.violation_count += 1;
        self.violation_types.insert(violation);
    }
}

/// Run-level summary, serialized to the date-stamped report file the web
/// reader consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSummary {
    #[serde(rename = "baseURL", default)]
    pub base_url: String,
    pub violations_found: usize,
    pub journals: Vec<JournalReportEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalReportEntry {
    pub journal_id: String,
    pub journal_name: String,
    pub violations_count: usize,
    pub violation_kinds: Vec<String>,
}

impl From<&JournalViolationReport> for JournalReportEntry {
    fn from(report: &JournalViolationReport) -> JournalReportEntry {
        JournalReportEntry {
            journal_id: report.journal_id.clone(),
            journal_name: report.journal_name.clone(),
            violations_count: report.violation_count,
            violation_kinds: report
                .violation_types
                .iter()
                .map(Violation::kind_label)
                .collect(),
        }
    }
}
