// src/reporting/exams.rs

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use crate::{
    error::FieldError,
    models::exam_result::{ExamResultRow, MarksInput},
    reporting::{natural_cmp, percentage},
};

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct AcademicYear(pub String);

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ClassName(pub String);

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ExamName(pub String);

/// Years newest first, each holding its classes.
#[derive(Debug, Default, Serialize)]
pub struct ExamReport {
    pub years: Vec<YearSection>,
}

#[derive(Debug, Serialize)]
pub struct YearSection {
    pub academic_year: AcademicYear,
    pub classes: Vec<ClassSection>,
}

#[derive(Debug, Serialize)]
pub struct ClassSection {
    pub class_name: ClassName,
    pub exams: Vec<ExamTable>,
}

/// One rendered table: a row per student, a column per subject.
#[derive(Debug, Serialize)]
pub struct ExamTable {
    pub exam_name: ExamName,
    /// Union of the subjects seen for this table, alphabetical.
    pub subjects: BTreeSet<String>,
    pub students: Vec<StudentExamSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentExamSummary {
    pub student_id: i64,
    pub full_name: String,
    pub roll_number: Option<String>,
    /// Every recorded mark, including subjects whose `max_marks` is zero or absent.
    pub subject_marks: BTreeMap<String, Option<f64>>,
    pub total_marks_obtained: f64,
    pub total_max_marks: f64,
    pub percentage: f64,
}

impl StudentExamSummary {
    fn new(row: &ExamResultRow) -> Self {
        Self {
            student_id: row.student_id,
            full_name: row.full_name.clone(),
            roll_number: row.roll_number.clone(),
            subject_marks: BTreeMap::new(),
            total_marks_obtained: 0.0,
            total_max_marks: 0.0,
            percentage: 0.0,
        }
    }

    /// Only subjects with `max_marks > 0` count towards the totals.
    fn record(&mut self, subject: &str, marks_obtained: Option<f64>, max_marks: Option<f64>) {
        self.subject_marks.insert(subject.to_string(), marks_obtained);

        let max = max_marks.unwrap_or(0.0);
        if max > 0.0 {
            self.total_marks_obtained += marks_obtained.unwrap_or(0.0);
            self.total_max_marks += max;
        }
    }
}

/// Builds the year -> class -> exam -> student report from flat joined rows.
///
/// Students are filed under their *current* class, looked up once per student,
/// so a student who moved up after an exam appears with their new class.
pub fn build_exam_report(rows: &[ExamResultRow]) -> ExamReport {
    let mut current_class: HashMap<i64, ClassName> = HashMap::new();
    let mut per_student: BTreeMap<(AcademicYear, ExamName, i64), StudentExamSummary> =
        BTreeMap::new();

    for row in rows {
        current_class
            .entry(row.student_id)
            .or_insert_with(|| ClassName(row.current_class.clone()));

        per_student
            .entry((
                AcademicYear(row.academic_year.clone()),
                ExamName(row.exam_name.clone()),
                row.student_id,
            ))
            .or_insert_with(|| StudentExamSummary::new(row))
            .record(&row.subject_name, row.marks_obtained, row.max_marks);
    }

    let mut nested: BTreeMap<AcademicYear, BTreeMap<ClassName, BTreeMap<ExamName, ExamTable>>> =
        BTreeMap::new();

    for ((year, exam, student_id), mut summary) in per_student {
        summary.percentage = percentage(summary.total_marks_obtained, summary.total_max_marks);
        let class = current_class.get(&student_id).cloned().unwrap_or_default();

        let table = nested
            .entry(year)
            .or_default()
            .entry(class)
            .or_default()
            .entry(exam.clone())
            .or_insert_with(|| ExamTable {
                exam_name: exam,
                subjects: BTreeSet::new(),
                students: Vec::new(),
            });

        table.subjects.extend(summary.subject_marks.keys().cloned());
        table.students.push(summary);
    }

    let years = nested
        .into_iter()
        .rev()
        .map(|(academic_year, classes)| YearSection {
            academic_year,
            classes: classes
                .into_iter()
                .map(|(class_name, exams)| ClassSection {
                    class_name,
                    exams: exams
                        .into_values()
                        .map(|mut table| {
                            table.students.sort_by(compare_students);
                            table
                        })
                        .collect(),
                })
                .collect(),
        })
        .collect();

    ExamReport { years }
}

/// Marks may not exceed the maximum of a subject that has one.
pub fn validate_marks(marks: &MarksInput) -> Vec<FieldError> {
    match (marks.marks_obtained, marks.max_marks) {
        (Some(obtained), Some(max)) if max > 0.0 && obtained > max => vec![FieldError::new(
            "marks_obtained",
            "Marks obtained cannot exceed maximum marks.",
        )],
        _ => Vec::new(),
    }
}

/// Full name, then roll number, both in natural order.
fn compare_students(a: &StudentExamSummary, b: &StudentExamSummary) -> std::cmp::Ordering {
    natural_cmp(&a.full_name, &b.full_name)
        .then_with(|| {
            natural_cmp(
                a.roll_number.as_deref().unwrap_or(""),
                b.roll_number.as_deref().unwrap_or(""),
            )
        })
        .then(a.student_id.cmp(&b.student_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(clippy::too_many_arguments)]
    fn row(
        student_id: i64,
        name: &str,
        roll: &str,
        class: &str,
        year: &str,
        exam: &str,
        subject: &str,
        marks: Option<f64>,
        max: Option<f64>,
    ) -> ExamResultRow {
        ExamResultRow {
            id: 0,
            student_id,
            full_name: name.to_string(),
            roll_number: Some(roll.to_string()),
            current_class: class.to_string(),
            academic_year: year.to_string(),
            exam_name: exam.to_string(),
            subject_name: subject.to_string(),
            marks_obtained: marks,
            max_marks: max,
        }
    }

    #[test]
    fn mid_term_totals_and_percentage() {
        let rows = vec![
            row(1, "S", "1", "10", "2024", "Mid-Term", "Math", Some(80.0), Some(100.0)),
            row(1, "S", "1", "10", "2024", "Mid-Term", "Science", Some(45.0), Some(50.0)),
        ];

        let report = build_exam_report(&rows);
        let table = &report.years[0].classes[0].exams[0];
        let s = &table.students[0];

        assert_eq!(s.total_marks_obtained, 125.0);
        assert_eq!(s.total_max_marks, 150.0);
        assert_eq!(s.percentage, 83.33);
        assert_eq!(
            table.subjects.iter().collect::<Vec<_>>(),
            vec!["Math", "Science"]
        );
    }

    #[test]
    fn zero_max_marks_are_shown_but_not_counted() {
        let rows = vec![
            row(1, "S", "1", "10", "2024", "Final", "Art", Some(9.0), Some(0.0)),
            row(1, "S", "1", "10", "2024", "Final", "Music", None, None),
        ];

        let report = build_exam_report(&rows);
        let s = &report.years[0].classes[0].exams[0].students[0];

        assert_eq!(s.subject_marks.get("Art"), Some(&Some(9.0)));
        assert_eq!(s.subject_marks.get("Music"), Some(&None));
        assert_eq!(s.total_marks_obtained, 0.0);
        assert_eq!(s.total_max_marks, 0.0);
        assert_eq!(s.percentage, 0.0);
    }

    #[test]
    fn sorts_years_desc_and_everything_else_asc() {
        let rows = vec![
            row(1, "Ravi", "2", "9", "2023", "Unit Test", "Math", Some(10.0), Some(20.0)),
            row(2, "Anu", "5", "10", "2024", "Mid-Term", "Math", Some(10.0), Some(20.0)),
            row(3, "Anu", "3", "10", "2024", "Mid-Term", "English", Some(15.0), Some(20.0)),
            row(4, "Bala", "1", "10", "2024", "Final", "Math", Some(18.0), Some(20.0)),
            row(5, "Chitra", "4", "11", "2024", "Final", "Math", Some(18.0), Some(20.0)),
        ];

        let report = build_exam_report(&rows);

        let years: Vec<&str> = report.years.iter().map(|y| y.academic_year.0.as_str()).collect();
        assert_eq!(years, vec!["2024", "2023"]);

        let classes: Vec<&str> = report.years[0]
            .classes
            .iter()
            .map(|c| c.class_name.0.as_str())
            .collect();
        assert_eq!(classes, vec!["10", "11"]);

        let exams: Vec<&str> = report.years[0].classes[0]
            .exams
            .iter()
            .map(|e| e.exam_name.0.as_str())
            .collect();
        assert_eq!(exams, vec!["Final", "Mid-Term"]);

        // Two students named Anu: roll number breaks the tie.
        let mid_term = &report.years[0].classes[0].exams[1];
        let rolls: Vec<&str> = mid_term
            .students
            .iter()
            .map(|s| s.roll_number.as_deref().unwrap())
            .collect();
        assert_eq!(rolls, vec!["3", "5"]);
        assert_eq!(
            mid_term.subjects.iter().collect::<Vec<_>>(),
            vec!["English", "Math"]
        );
    }

    #[test]
    fn groups_by_current_class_of_each_student() {
        // Rows for the same student carry the class they are in now,
        // even for last year's exam.
        let rows = vec![
            row(1, "Mira", "1", "10", "2023", "Final", "Math", Some(50.0), Some(100.0)),
            row(1, "Mira", "1", "10", "2024", "Final", "Math", Some(70.0), Some(100.0)),
        ];

        let report = build_exam_report(&rows);
        for year in &report.years {
            assert_eq!(year.classes.len(), 1);
            assert_eq!(year.classes[0].class_name.0, "10");
        }
    }

    #[test]
    fn marks_above_maximum_are_rejected() {
        let over = MarksInput {
            marks_obtained: Some(101.0),
            max_marks: Some(100.0),
        };
        assert_eq!(validate_marks(&over).len(), 1);

        // No maximum recorded: nothing to compare against.
        let open = MarksInput {
            marks_obtained: Some(12.0),
            max_marks: Some(0.0),
        };
        assert!(validate_marks(&open).is_empty());
    }

    #[test]
    fn empty_input_gives_empty_report() {
        assert!(build_exam_report(&[]).years.is_empty());
    }
}
