use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Deserializer};

use crate::models::{GradeCell, GradeValue, JournalContext, StudentRecord};

/// The document the extraction stage produces: classes, their journals, and
/// per-student rows with already-classified grade cells.
#[derive(Debug, Deserialize)]
pub struct ExtractionDocument {
    #[serde(rename = "baseURL", default)]
    pub base_url: String,
    #[serde(default)]
    pub classes: Vec<ClassEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ClassEntry {
    pub name: String,
    #[serde(default)]
    pub journals: Vec<JournalEntry>,
}

#[derive(Debug, Deserialize)]
pub struct JournalEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub lesson_count: usize,
    /// Set by the extraction stage when it failed to capture this journal.
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub students: Vec<StudentEntry>,
}

#[derive(Debug, Deserialize)]
pub struct StudentEntry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub final_grade: Option<String>,
    #[serde(default, deserialize_with = "flexible_average")]
    pub average_grade: Option<f64>,
    #[serde(default)]
    pub cells: Vec<CellEntry>,
}

#[derive(Debug, Deserialize)]
pub struct CellEntry {
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub stacked: bool,
}

/// Averages arrive either as numbers or as strings with a comma decimal
/// separator. Anything unparseable becomes absent so the final-grade check
/// abstains.
fn flexible_average<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(number)) => number.as_f64(),
        Some(serde_json::Value::String(text)) => text.trim().replace(',', ".").parse().ok(),
        _ => None,
    })
}

impl JournalEntry {
    pub fn context(&self, class_name: &str) -> JournalContext {
        JournalContext {
            journal_id: self.id.clone(),
            journal_name: format!("{} - {}", class_name, self.name),
            subject_name: self.name.clone(),
            lesson_count: self.lesson_count,
        }
    }

    pub fn student_records(&self) -> Vec<StudentRecord> {
        self.students
            .iter()
            .map(|student| StudentRecord {
                name: student.name.clone(),
                cells: student
                    .cells
                    .iter()
                    .map(|cell| GradeCell {
                        value: GradeValue::parse(cell.value.as_deref()),
                        stacked: cell.stacked,
                    })
                    .collect(),
                final_grade: student.final_grade.clone(),
                average_grade: student.average_grade,
            })
            .collect()
    }
}

pub fn load_document(path: &Path) -> anyhow::Result<ExtractionDocument> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read extraction document {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse extraction document {}", path.display()))
}
