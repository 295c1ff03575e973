// src/handlers/dashboard.rs

use axum::{extract::State, response::IntoResponse};
use chrono::Datelike;
use sqlx::PgPool;

use crate::{
    error::AppError,
    handlers::{events::fetch_upcoming_events, results::fetch_toppers},
    models::{
        dashboard::{ClassCount, DashboardOverview, FeeCollection},
        response::ApiResponse,
    },
    reporting::natural_cmp,
};

/// Head counts, this month's fee collection, the toppers board and upcoming events.
pub async fn overview(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let total_students: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM students")
        .fetch_one(&pool)
        .await?;

    let total_staff: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM staff")
        .fetch_one(&pool)
        .await?;

    let mut class_counts = sqlx::query_as::<_, ClassCount>(
        "SELECT current_class, COUNT(*) AS students FROM students GROUP BY current_class",
    )
    .fetch_all(&pool)
    .await?;
    class_counts.sort_by(|a, b| natural_cmp(&a.current_class, &b.current_class));

    let today = chrono::Local::now().date_naive();
    let fee_collection = sqlx::query_as::<_, FeeCollection>(
        r#"
        SELECT
            $1::INTEGER AS fee_year,
            $2::INTEGER AS fee_month,
            COALESCE(SUM(amount_due), 0) AS total_due,
            COALESCE(SUM(amount_paid), 0) AS total_paid,
            COALESCE(SUM(GREATEST(amount_due - amount_paid, 0)), 0) AS total_remaining,
            COUNT(*) FILTER (WHERE NOT is_paid) AS unpaid_records
        FROM student_monthly_fees
        WHERE fee_year = $1 AND fee_month = $2
        "#,
    )
    .bind(today.year())
    .bind(today.month() as i32)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to compute fee collection: {:?}", e);
        AppError::from(e)
    })?;

    let toppers = fetch_toppers(&pool).await?;
    let upcoming_events = fetch_upcoming_events(&pool).await?;

    Ok(ApiResponse::ok(DashboardOverview {
        total_students,
        total_staff,
        class_counts,
        fee_collection,
        toppers,
        upcoming_events,
    }))
}
