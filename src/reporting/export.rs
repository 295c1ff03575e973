// src/reporting/export.rs

use chrono::NaiveDateTime;

use crate::models::{exam_result::ExamResultRow, staff::Staff};

pub const RESULTS_CSV_HEADER: [&str; 9] = [
    "User ID",
    "Full Name",
    "Roll Number",
    "Current Class",
    "Academic Year",
    "Exam Name",
    "Subject Name",
    "Marks Obtained",
    "Max Marks",
];

pub const STAFF_CSV_HEADER: [&str; 11] = [
    "User ID",
    "Full Name",
    "Username",
    "Role",
    "Position",
    "Department",
    "Qualification",
    "Phone",
    "Email",
    "Joining Date",
    "Salary",
];

fn opt<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(|v| v.to_string()).unwrap_or_default()
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>, csv::Error> {
    writer.into_inner().map_err(|e| e.into_error().into())
}

/// One line per raw result row, in the order given.
pub fn results_csv(rows: &[ExamResultRow]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(RESULTS_CSV_HEADER)?;

    for row in rows {
        writer.write_record([
            row.student_id.to_string(),
            row.full_name.clone(),
            opt(&row.roll_number),
            row.current_class.clone(),
            row.academic_year.clone(),
            row.exam_name.clone(),
            row.subject_name.clone(),
            opt(&row.marks_obtained),
            opt(&row.max_marks),
        ])?;
    }

    finish(writer)
}

pub fn staff_csv(rows: &[Staff]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(STAFF_CSV_HEADER)?;

    for s in rows {
        writer.write_record([
            s.user_id.to_string(),
            s.full_name.clone(),
            s.username.clone(),
            s.role.clone(),
            s.position.clone(),
            opt(&s.department),
            opt(&s.qualification),
            opt(&s.phone),
            opt(&s.email),
            opt(&s.joining_date),
            opt(&s.salary),
        ])?;
    }

    finish(writer)
}

/// `<prefix>[_<label>-<value>]..._<YYYYMMDD_HHMMSS>.csv`.
/// Filter values are reduced to ASCII letters, digits and dashes.
pub fn export_filename(prefix: &str, filters: &[(&str, Option<&str>)], at: NaiveDateTime) -> String {
    let mut name = prefix.to_string();

    for (label, value) in filters {
        let Some(value) = value else { continue };
        let cleaned: String = value
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
            .collect();
        if !cleaned.is_empty() {
            name.push_str(&format!("_{}-{}", label, cleaned));
        }
    }

    format!("{}_{}.csv", name, at.format("%Y%m%d_%H%M%S"))
}
