// src/handlers/reports.rs

use axum::{
    extract::{Query, State},
    response::Html,
};
use sqlx::PgPool;

use crate::{
    error::AppError,
    handlers::results::{fetch_result_rows, fetch_toppers},
    models::exam_result::ResultFilters,
    render::render_results_page,
    reporting::exams::build_exam_report,
};

/// Server-rendered results page for printing.
pub async fn results_page(
    State(pool): State<PgPool>,
    Query(filters): Query<ResultFilters>,
) -> Result<Html<String>, AppError> {
    let rows = fetch_result_rows(&pool, &filters, None).await?;
    let report = build_exam_report(&rows);
    let board = fetch_toppers(&pool).await?;

    Ok(Html(render_results_page(&report, &board, &filters).into_string()))
}
