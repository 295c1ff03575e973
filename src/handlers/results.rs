// src/handlers/results.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use sqlx::{PgPool, Postgres, QueryBuilder};
use validator::Validate;

use crate::{
    config::TOPPER_LIMIT,
    error::{AppError, check},
    handlers::{filter_value, wants_csv},
    models::{
        exam_result::{
            CreateResultRequest, ExamResult, ExamResultRow, ResultFilters, StudentYearTotals,
            UpdateResultRequest,
        },
        response::ApiResponse,
    },
    reporting::{
        exams::{build_exam_report, validate_marks},
        export::{export_filename, results_csv},
        toppers::{ToppersBoard, rank_toppers},
    },
};

const RESULT_COLUMNS: &str =
    "id, student_id, academic_year, exam_name, subject_name, marks_obtained, max_marks";

/// Fetches the flat, filtered result rows joined with each student's current profile.
/// The on-screen report and the CSV export both read through here.
pub(crate) async fn fetch_result_rows(
    pool: &PgPool,
    filters: &ResultFilters,
    student_id: Option<i64>,
) -> Result<Vec<ExamResultRow>, AppError> {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
        r#"
        SELECT
            r.id, r.student_id, s.full_name, s.roll_number, s.current_class,
            r.academic_year, r.exam_name, r.subject_name, r.marks_obtained, r.max_marks
        FROM student_exam_results r
        JOIN students s ON s.user_id = r.student_id
        WHERE TRUE
        "#,
    );

    if let Some(year) = filter_value(filters.academic_year.as_deref()) {
        builder.push(" AND r.academic_year = ");
        builder.push_bind(year.to_string());
    }

    if let Some(class) = filter_value(filters.current_class.as_deref()) {
        builder.push(" AND s.current_class = ");
        builder.push_bind(class.to_string());
    }

    if let Some(id) = student_id {
        builder.push(" AND r.student_id = ");
        builder.push_bind(id);
    }

    builder.push(
        " ORDER BY r.academic_year DESC, s.current_class, r.exam_name, s.full_name, s.roll_number, r.subject_name",
    );

    let rows: Vec<ExamResultRow> = builder
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch exam results: {:?}", e);
            AppError::from(e)
        })?;

    Ok(rows)
}

/// Toppers of the latest academic year that has at least one result with `max_marks > 0`.
pub(crate) async fn fetch_toppers(pool: &PgPool) -> Result<ToppersBoard, AppError> {
    let latest_year: Option<String> = sqlx::query_scalar(
        "SELECT MAX(academic_year) FROM student_exam_results WHERE max_marks > 0",
    )
    .fetch_one(pool)
    .await?;

    let Some(year) = latest_year else {
        return Ok(ToppersBoard::default());
    };

    let totals = sqlx::query_as::<_, StudentYearTotals>(
        r#"
        SELECT
            r.student_id, s.full_name, s.current_class, s.roll_number,
            COALESCE(SUM(r.marks_obtained), 0)::DOUBLE PRECISION AS total_obtained,
            SUM(r.max_marks)::DOUBLE PRECISION AS total_max
        FROM student_exam_results r
        JOIN students s ON s.user_id = r.student_id
        WHERE r.academic_year = $1 AND r.max_marks > 0
        GROUP BY r.student_id, s.full_name, s.current_class, s.roll_number
        HAVING SUM(r.max_marks) > 0
        ORDER BY r.student_id
        "#,
    )
    .bind(&year)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to compute toppers: {:?}", e);
        AppError::from(e)
    })?;

    Ok(ToppersBoard {
        academic_year: Some(year),
        toppers: rank_toppers(totals, TOPPER_LIMIT),
    })
}

pub(crate) fn csv_attachment(filename: &str, body: Vec<u8>) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response()
}

async fn export_results(pool: &PgPool, filters: &ResultFilters) -> Result<Response, AppError> {
    let rows = fetch_result_rows(pool, filters, None).await?;
    let body = results_csv(&rows)?;

    let filename = export_filename(
        "exam_results",
        &[
            ("year", filter_value(filters.academic_year.as_deref())),
            ("class", filter_value(filters.current_class.as_deref())),
        ],
        chrono::Local::now().naive_local(),
    );

    tracing::info!(rows = rows.len(), %filename, "Exam results exported");

    Ok(csv_attachment(&filename, body))
}

/// The nested year -> class -> exam report, or with `download=csv` the raw
/// filtered rows as a file. A failed export answers with plain text.
pub async fn list_results(
    State(pool): State<PgPool>,
    Query(filters): Query<ResultFilters>,
) -> Result<Response, AppError> {
    if wants_csv(filters.download.as_deref()) {
        return Ok(match export_results(&pool, &filters).await {
            Ok(response) => response,
            Err(e) => e.into_plain_text_response(),
        });
    }

    let rows = fetch_result_rows(&pool, &filters, None).await?;
    Ok(ApiResponse::ok(build_exam_report(&rows)).into_response())
}

pub async fn get_toppers(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    Ok(ApiResponse::ok(fetch_toppers(&pool).await?))
}

pub async fn get_result(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let sql = format!("SELECT {} FROM student_exam_results WHERE id = $1", RESULT_COLUMNS);

    let result = sqlx::query_as::<_, ExamResult>(&sql)
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Result not found".to_string()))?;

    Ok(ApiResponse::ok(result))
}

/// Enters one subject mark for a student.
/// Admin only.
pub async fn create_result(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateResultRequest>,
) -> Result<impl IntoResponse, AppError> {
    check(payload.validate(), validate_marks(&payload.marks))?;

    let sql = format!(
        r#"
        INSERT INTO student_exam_results
        (student_id, academic_year, exam_name, subject_name, marks_obtained, max_marks)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {}
        "#,
        RESULT_COLUMNS
    );

    let result = sqlx::query_as::<_, ExamResult>(&sql)
        .bind(payload.student_id)
        .bind(payload.academic_year.trim())
        .bind(payload.exam_name.trim())
        .bind(payload.subject_name.trim())
        .bind(payload.marks.marks_obtained)
        .bind(payload.marks.max_marks)
        .fetch_one(&pool)
        .await
        .map_err(|e| {
            AppError::from(e)
                .on_duplicate(format!(
                    "{} marks for {} ({}) are already recorded for this student",
                    payload.subject_name, payload.exam_name, payload.academic_year
                ))
                .on_not_found("Student not found")
        })?;

    tracing::info!(result_id = result.id, student_id = result.student_id, "Exam result created");

    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message(result, "Result added"),
    ))
}

/// Corrects the marks of one result row.
/// Admin only.
pub async fn update_result(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateResultRequest>,
) -> Result<impl IntoResponse, AppError> {
    check(payload.validate(), validate_marks(&payload.marks))?;

    let sql = format!(
        "UPDATE student_exam_results SET marks_obtained = $1, max_marks = $2 WHERE id = $3 RETURNING {}",
        RESULT_COLUMNS
    );

    let result = sqlx::query_as::<_, ExamResult>(&sql)
        .bind(payload.marks.marks_obtained)
        .bind(payload.marks.max_marks)
        .bind(id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update result {}: {:?}", id, e);
            AppError::from(e)
        })?
        .ok_or(AppError::NotFound("Result not found".to_string()))?;

    tracing::info!(result_id = id, "Exam result updated");

    Ok(ApiResponse::with_message(result, "Result updated"))
}

/// Admin only.
pub async fn delete_result(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM student_exam_results WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete result: {:?}", e);
            AppError::from(e)
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Result not found".to_string()));
    }

    tracing::info!(result_id = id, "Exam result deleted");

    Ok(StatusCode::NO_CONTENT)
}
