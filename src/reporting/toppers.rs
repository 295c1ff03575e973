// src/reporting/toppers.rs

use serde::Serialize;

use crate::{models::exam_result::StudentYearTotals, reporting::percentage};

#[derive(Debug, Clone, Serialize)]
pub struct TopperEntry {
    pub rank: usize,
    pub student_id: i64,
    pub full_name: String,
    pub current_class: String,
    pub roll_number: Option<String>,
    pub total_obtained: f64,
    pub total_max: f64,
    pub percentage: f64,
}

/// Toppers of the most recent academic year that has qualifying results.
/// `academic_year` is `None` (and the list empty) when there is no such year.
#[derive(Debug, Default, Serialize)]
pub struct ToppersBoard {
    pub academic_year: Option<String>,
    pub toppers: Vec<TopperEntry>,
}

/// Ranks students by yearly average percentage, best first, keeping at most `limit`.
///
/// Students whose summed `max_marks` is zero never qualify. Equal percentages
/// keep their input order.
pub fn rank_toppers(totals: Vec<StudentYearTotals>, limit: usize) -> Vec<TopperEntry> {
    let mut ranked: Vec<(f64, StudentYearTotals)> = totals
        .into_iter()
        .filter(|t| t.total_max > 0.0)
        .map(|t| (t.total_obtained / t.total_max, t))
        .collect();

    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));
    ranked.truncate(limit);

    ranked
        .into_iter()
        .enumerate()
        .map(|(i, (_, t))| TopperEntry {
            rank: i + 1,
            percentage: percentage(t.total_obtained, t.total_max),
            student_id: t.student_id,
            full_name: t.full_name,
            current_class: t.current_class,
            roll_number: t.roll_number,
            total_obtained: t.total_obtained,
            total_max: t.total_max,
        })
        .collect()
}
