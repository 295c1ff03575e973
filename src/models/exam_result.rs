// src/models/exam_result.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'student_exam_results' table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ExamResult {
    pub id: i64,
    pub student_id: i64,
    pub academic_year: String,
    pub exam_name: String,
    pub subject_name: String,
    pub marks_obtained: Option<f64>,
    pub max_marks: Option<f64>,
}

/// One subject mark joined with the student's current profile.
/// This is the flat input of the exam report and the row shape of the CSV export.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ExamResultRow {
    pub id: i64,
    pub student_id: i64,
    pub full_name: String,
    pub roll_number: Option<String>,
    pub current_class: String,
    pub academic_year: String,
    pub exam_name: String,
    pub subject_name: String,
    pub marks_obtained: Option<f64>,
    pub max_marks: Option<f64>,
}

/// One student's summed marks over the qualifying results of a year.
#[derive(Debug, Clone, FromRow)]
pub struct StudentYearTotals {
    pub student_id: i64,
    pub full_name: String,
    pub current_class: String,
    pub roll_number: Option<String>,
    pub total_obtained: f64,
    pub total_max: f64,
}

/// Filters shared by the on-screen report and the CSV export.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ResultFilters {
    pub academic_year: Option<String>,
    pub current_class: Option<String>,
    /// `csv` returns the raw filtered rows as a file.
    pub download: Option<String>,
}

/// DTO for entering one subject mark.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateResultRequest {
    pub student_id: i64,
    #[validate(length(min = 1, max = 20, message = "Academic year is required (max 20 characters)."))]
    pub academic_year: String,
    #[validate(length(min = 1, max = 100, message = "Exam name is required (max 100 characters)."))]
    pub exam_name: String,
    #[validate(length(min = 1, max = 100, message = "Subject name is required (max 100 characters)."))]
    pub subject_name: String,
    #[serde(flatten)]
    #[validate(nested)]
    pub marks: MarksInput,
}

/// DTO for correcting a subject mark. Only the marks can change.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateResultRequest {
    #[serde(flatten)]
    #[validate(nested)]
    pub marks: MarksInput,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct MarksInput {
    #[validate(range(min = 0.0, message = "Marks cannot be negative."))]
    pub marks_obtained: Option<f64>,
    #[validate(range(min = 0.0, message = "Maximum marks cannot be negative."))]
    pub max_marks: Option<f64>,
}
