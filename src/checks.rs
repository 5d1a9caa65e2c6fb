use std::collections::BTreeSet;

use crate::models::{
    is_exemption_marker, is_no_grade_marker, FailureRunKind, GradeCell, GradeValue, Violation,
};

/// Subjects graded under the relaxed rounding thresholds.
const SPECIAL_SUBJECTS: [&str; 4] = [
    "изобразительное искусство",
    "музыка",
    "технология",
    "физическая культура",
];

/// Scans the cell sequence for runs of three failing marks and returns the
/// distinct classifications found. Empty cells neither extend nor break a run;
/// any other non-failing value resets it. The counter resets after each
/// detection, so overlapping triples inside one run are not re-reported and
/// repeated classifications collapse into the set.
pub fn detect_consecutive_failures(cells: &[GradeCell]) -> BTreeSet<FailureRunKind> {
    let mut kinds = BTreeSet::new();
    let mut count = 0usize;
    let mut run_start = 0usize;

    for (index, cell) in cells.iter().enumerate() {
        match &cell.value {
            GradeValue::Numeric(2) => {
                if count == 0 {
                    run_start = index;
                }
                count += 1;
                if count == 3 {
                    // The window is the raw index span starting at the first
                    // failing mark; empty cells skipped while counting can
                    // land inside it. Kept as-is for report compatibility.
                    kinds.insert(classify_run(&cells[run_start..run_start + 3]));
                    count = 0;
                }
            }
            GradeValue::Empty => {}
            _ => {
                count = 0;
            }
        }
    }

    kinds
}

fn classify_run(window: &[GradeCell]) -> FailureRunKind {
    let has_stacked = window.iter().any(|cell| cell.stacked);
    let has_special = window
        .iter()
        .any(|cell| matches!(cell.value, GradeValue::Special(_)));

    match (has_stacked, has_special) {
        (true, true) => FailureRunKind::Combined,
        (true, false) => FailureRunKind::MultipleGrades,
        (false, true) => FailureRunKind::SpecialValues,
        (false, false) => FailureRunKind::Simple,
    }
}

/// Compares the count of valid numeric grades against the journal's required
/// minimum. For exempt students the polarity flips: having enough grades while
/// marked exempt is the violation.
pub fn check_sufficiency(
    cells: &[GradeCell],
    required_grade_count: usize,
    is_exempt: bool,
) -> Option<Violation> {
    let mut valid_count = 0usize;
    let mut has_stacked = false;

    for cell in cells {
        if cell.value.is_valid_numeric() {
            valid_count += 1;
            if cell.stacked {
                has_stacked = true;
            }
        }
    }

    if is_exempt {
        if valid_count >= required_grade_count {
            return Some(Violation::ExemptWithSufficientGrades);
        }
        return None;
    }

    if valid_count >= required_grade_count {
        return None;
    }

    // A stacked cell may hide extra marks, so the shortfall is only possible.
    if has_stacked {
        Some(Violation::PossiblyInsufficientGrades)
    } else {
        Some(Violation::InsufficientGrades)
    }
}

pub fn is_special_subject(subject_name: &str) -> bool {
    let lower = subject_name.to_lowercase();
    SPECIAL_SUBJECTS.iter().any(|name| lower.contains(name))
}

pub fn expected_final_grade(average_grade: f64, subject_name: &str) -> &'static str {
    if is_special_subject(subject_name) {
        if average_grade >= 4.5 {
            "5"
        } else if average_grade >= 3.5 {
            "4"
        } else if average_grade >= 2.5 {
            "3"
        } else {
            "2"
        }
    } else if average_grade >= 4.65 {
        "5"
    } else if average_grade >= 3.6 {
        "4"
    } else if average_grade >= 2.6 {
        "3"
    } else {
        "2"
    }
}

/// Checks the recorded final grade against the grade the average implies.
/// Abstains when either input is missing, the average is zero, or the final
/// grade is a no-grade or exemption marker.
pub fn check_final_grade(
    final_grade: Option<&str>,
    average_grade: Option<f64>,
    subject_name: &str,
) -> Option<Violation> {
    let final_grade = final_grade?;
    let average_grade = average_grade?;

    if average_grade == 0.0 {
        return None;
    }
    if is_no_grade_marker(final_grade) || is_exemption_marker(final_grade) {
        return None;
    }

    let expected = expected_final_grade(average_grade, subject_name);
    if final_grade != expected {
        return Some(Violation::IncorrectFinalGrade {
            actual: final_grade.to_string(),
            expected: expected.to_string(),
        });
    }

    None
}

/// Flags a failing last mark immediately preceding a passing final grade.
pub fn check_regression(cells: &[GradeCell], final_grade: Option<&str>) -> Option<Violation> {
    let final_grade = final_grade?;
    let last_valid = cells.iter().rev().find_map(|cell| match cell.value {
        GradeValue::Numeric(value) => Some(value),
        _ => None,
    })?;

    if is_no_grade_marker(final_grade) || is_exemption_marker(final_grade) {
        return None;
    }

    if last_valid == 2 && matches!(final_grade, "3" | "4" | "5") {
        return Some(Violation::GradeRegressionBeforeFinal {
            final_grade: final_grade.to_string(),
        });
    }

    None
}
