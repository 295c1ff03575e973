// src/render.rs

use maud::{DOCTYPE, Markup, PreEscaped, html};

use crate::{
    handlers::filter_value,
    models::exam_result::ResultFilters,
    reporting::{
        exams::{ExamReport, ExamTable},
        toppers::ToppersBoard,
    },
};

fn marks(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

/// Printable results page: the toppers board followed by one table per exam.
/// The page is fetched with a Bearer token, so it carries no forms or links
/// back into the API; the CSV export is requested from `/api/results` directly.
pub fn render_results_page(report: &ExamReport, board: &ToppersBoard, filters: &ResultFilters) -> Markup {
    let year_filter = filter_value(filters.academic_year.as_deref()).unwrap_or("All years");
    let class_filter = filter_value(filters.current_class.as_deref()).unwrap_or("All classes");

    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { "Exam Results" }
                style { (PreEscaped(CSS)) }
            }
            body {
                div.container {
                    h1 { "Exam Results" }
                    p.filters {
                        "Academic year: " strong { (year_filter) }
                        " | Class: " strong { (class_filter) }
                    }
                    (render_toppers(board))
                    @if report.years.is_empty() {
                        div.empty-state {
                            p { "No results found for the selected filters." }
                        }
                    }
                    @for year in &report.years {
                        section.year {
                            h2 { "Academic Year " (year.academic_year.0) }
                            @for class in &year.classes {
                                div.class-block {
                                    h3 { "Class " (class.class_name.0) }
                                    @for table in &class.exams {
                                        (render_exam_table(table))
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn render_toppers(board: &ToppersBoard) -> Markup {
    html! {
        section.toppers {
            @match &board.academic_year {
                Some(year) => {
                    h2 { "Toppers " (year) }
                    ol {
                        @for t in &board.toppers {
                            li {
                                strong { (t.full_name) }
                                " (Class " (t.current_class) ") "
                                span.percentage { (format!("{:.2}%", t.percentage)) }
                            }
                        }
                    }
                }
                None => {
                    p.muted { "No toppers yet." }
                }
            }
        }
    }
}

fn render_exam_table(table: &ExamTable) -> Markup {
    html! {
        h4 { (table.exam_name.0) }
        table.results {
            thead {
                tr {
                    th { "Roll" }
                    th { "Student" }
                    @for subject in &table.subjects {
                        th { (subject) }
                    }
                    th { "Total" }
                    th { "%" }
                }
            }
            tbody {
                @for s in &table.students {
                    tr {
                        td { (s.roll_number.as_deref().unwrap_or("")) }
                        td { (s.full_name) }
                        @for subject in &table.subjects {
                            td { (marks(s.subject_marks.get(subject).copied().flatten())) }
                        }
                        td { (s.total_marks_obtained) " / " (s.total_max_marks) }
                        td { (format!("{:.2}", s.percentage)) }
                    }
                }
            }
        }
    }
}

const CSS: &str = r#"
body { font-family: -apple-system, BlinkMacSystemFont, sans-serif; color: #222; margin: 0; }
.container { max-width: 1100px; margin: 0 auto; padding: 24px; }
.filters { color: #555; margin-bottom: 16px; }
.toppers { background: #f6f8fa; border-radius: 6px; padding: 12px 16px; margin-bottom: 24px; }
.muted, .empty-state { color: #777; }
table.results { border-collapse: collapse; width: 100%; margin-bottom: 20px; }
table.results th, table.results td { border: 1px solid #ddd; padding: 6px 8px; text-align: left; }
table.results th { background: #f0f0f0; }
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::exam_result::ExamResultRow, reporting::exams::build_exam_report};

    fn row(name: &str, subject: &str, marks: f64) -> ExamResultRow {
        ExamResultRow {
            id: 0,
            student_id: 1,
            full_name: name.to_string(),
            roll_number: Some("7".to_string()),
            current_class: "10".to_string(),
            academic_year: "2024".to_string(),
            exam_name: "Mid-Term".to_string(),
            subject_name: subject.to_string(),
            marks_obtained: Some(marks),
            max_marks: Some(100.0),
        }
    }

    #[test]
    fn student_names_are_escaped() {
        let report = build_exam_report(&[row("<script>alert(1)</script>", "Math", 80.0)]);
        let page = render_results_page(&report, &ToppersBoard::default(), &ResultFilters::default())
            .into_string();

        assert!(!page.contains("<script>alert(1)</script>"));
        assert!(page.contains("&lt;script&gt;"));
    }

    #[test]
    fn renders_subject_columns_and_percentage() {
        let report = build_exam_report(&[row("Asha", "Math", 80.0), row("Asha", "Science", 45.0)]);
        let page = render_results_page(&report, &ToppersBoard::default(), &ResultFilters::default())
            .into_string();

        assert!(page.contains("<th>Math</th>"));
        assert!(page.contains("<th>Science</th>"));
        assert!(page.contains("62.50"));
        assert!(page.contains("No toppers yet."));
    }

    #[test]
    fn empty_report_says_so() {
        let page = render_results_page(
            &ExamReport::default(),
            &ToppersBoard::default(),
            &ResultFilters::default(),
        )
        .into_string();
        assert!(page.contains("No results found"));
    }

    #[test]
    fn page_has_no_api_controls_and_names_the_filters() {
        let filters = ResultFilters {
            academic_year: Some("2024".to_string()),
            current_class: Some("  ".to_string()),
            ..Default::default()
        };
        let page = render_results_page(&ExamReport::default(), &ToppersBoard::default(), &filters)
            .into_string();

        assert!(!page.contains("<form"));
        assert!(!page.contains("formaction"));
        assert!(!page.contains("download"));
        assert!(page.contains("<strong>2024</strong>"));
        assert!(page.contains("<strong>All classes</strong>"));
    }
}
