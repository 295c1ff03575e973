// src/handlers/fees.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgPool, Postgres, QueryBuilder};
use validator::Validate;

use crate::{
    error::{AppError, check},
    handlers::{filter_value, parse_filter, students::fetch_student},
    models::{
        fee::{
            CreateFeeRequest, FeeListParams, FeeStatus, MonthlyFeeRecord, StudentFeeRow,
            StudentFeeSummary, UpdateFeeRequest,
        },
        response::ApiResponse,
    },
    reporting::fees::{self as fee_rules, FeeComponents},
    utils::html::clean_text,
};

const FEE_COLUMNS: &str = r#"
    id, student_id, fee_year, fee_month,
    base_monthly_fee, monthly_van_fee, monthly_exam_fee, monthly_electricity_fee,
    amount_due, amount_paid, is_paid, payment_date, notes
"#;

pub(crate) async fn fetch_student_fees(
    pool: &PgPool,
    student_id: i64,
) -> Result<Vec<MonthlyFeeRecord>, AppError> {
    let sql = format!(
        "SELECT {} FROM student_monthly_fees WHERE student_id = $1 ORDER BY fee_year DESC, fee_month DESC",
        FEE_COLUMNS
    );

    let records = sqlx::query_as::<_, MonthlyFeeRecord>(&sql)
        .bind(student_id)
        .fetch_all(pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch fees for student {}: {:?}", student_id, e);
            AppError::from(e)
        })?;

    Ok(records)
}

/// Fee overview grouped by student, then month, with per-student totals.
pub async fn list_fee_summaries(
    State(pool): State<PgPool>,
    Query(params): Query<FeeListParams>,
) -> Result<impl IntoResponse, AppError> {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
        r#"
        SELECT
            s.full_name, s.current_class, s.roll_number,
            f.id, f.student_id, f.fee_year, f.fee_month,
            f.base_monthly_fee, f.monthly_van_fee, f.monthly_exam_fee, f.monthly_electricity_fee,
            f.amount_due, f.amount_paid, f.is_paid, f.payment_date, f.notes
        FROM student_monthly_fees f
        JOIN students s ON s.user_id = f.student_id
        WHERE TRUE
        "#,
    );

    let student_id: Option<i64> = parse_filter("student_id", params.student_id.as_deref())?;
    let fee_year: Option<i32> = parse_filter("fee_year", params.fee_year.as_deref())?;
    let fee_month: Option<i32> = parse_filter("fee_month", params.fee_month.as_deref())?;
    let status: Option<FeeStatus> = parse_filter("status", params.status.as_deref())?;

    if let Some(student_id) = student_id {
        builder.push(" AND f.student_id = ");
        builder.push_bind(student_id);
    }

    if let Some(year) = fee_year {
        builder.push(" AND f.fee_year = ");
        builder.push_bind(year);
    }

    if let Some(month) = fee_month {
        builder.push(" AND f.fee_month = ");
        builder.push_bind(month);
    }

    if let Some(class) = filter_value(params.current_class.as_deref()) {
        builder.push(" AND s.current_class = ");
        builder.push_bind(class.to_string());
    }

    match status {
        Some(FeeStatus::Paid) => {
            builder.push(" AND f.is_paid");
        }
        Some(FeeStatus::Unpaid) => {
            builder.push(" AND NOT f.is_paid");
        }
        None => {}
    }

    let rows: Vec<StudentFeeRow> = builder
        .build_query_as()
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list fees: {:?}", e);
            AppError::from(e)
        })?;

    Ok(ApiResponse::ok(fee_rules::group_by_student(rows)))
}

/// All fee months of one student with totals.
pub async fn list_student_fees(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let student = fetch_student(&pool, id).await?;

    let mut months: Vec<_> = fetch_student_fees(&pool, id)
        .await?
        .into_iter()
        .map(fee_rules::fee_view)
        .collect();
    fee_rules::sort_months(&mut months);
    let totals = fee_rules::totals(&months);

    Ok(ApiResponse::ok(StudentFeeSummary {
        student_id: student.user_id,
        full_name: student.full_name,
        current_class: student.current_class,
        roll_number: student.roll_number,
        months,
        totals,
    }))
}

/// Records a month's fee for a student.
///
/// The unique index on (student_id, fee_year, fee_month) rejects a second
/// record for the same period; that is reported as a duplicate warning and
/// the existing record is left untouched.
/// Admin only.
pub async fn create_fee(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateFeeRequest>,
) -> Result<impl IntoResponse, AppError> {
    check(payload.validate(), fee_rules::validate_amounts(&payload.amounts))?;

    let amounts = &payload.amounts;
    let computed = fee_rules::compute(&FeeComponents::from(amounts), amounts.amount_paid);
    let payment_date = fee_rules::resolve_payment_date(
        amounts.amount_paid,
        amounts.payment_date,
        chrono::Local::now().date_naive(),
    );

    let sql = format!(
        r#"
        INSERT INTO student_monthly_fees
        (student_id, fee_year, fee_month,
         base_monthly_fee, monthly_van_fee, monthly_exam_fee, monthly_electricity_fee,
         amount_due, amount_paid, is_paid, payment_date, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING {}
        "#,
        FEE_COLUMNS
    );

    let record = sqlx::query_as::<_, MonthlyFeeRecord>(&sql)
        .bind(payload.student_id)
        .bind(payload.fee_year)
        .bind(payload.fee_month)
        .bind(amounts.base_monthly_fee)
        .bind(amounts.monthly_van_fee)
        .bind(amounts.monthly_exam_fee)
        .bind(amounts.monthly_electricity_fee)
        .bind(computed.amount_due)
        .bind(amounts.amount_paid)
        .bind(computed.is_paid)
        .bind(payment_date)
        .bind(clean_text(amounts.notes.as_deref()))
        .fetch_one(&pool)
        .await
        .map_err(|e| {
            AppError::from(e)
                .on_duplicate(format!(
                    "A fee record for {:02}/{} already exists for this student",
                    payload.fee_month, payload.fee_year
                ))
                .on_not_found("Student not found")
        })?;

    tracing::info!(
        fee_id = record.id,
        student_id = record.student_id,
        fee_year = record.fee_year,
        fee_month = record.fee_month,
        "Fee record created"
    );

    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message(fee_rules::fee_view(record), "Fee record added"),
    ))
}

/// Replaces the amounts of a fee record and recomputes `amount_due` / `is_paid`.
/// The period (year, month) cannot be changed. Other months are not touched.
/// Admin only.
pub async fn update_fee(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateFeeRequest>,
) -> Result<impl IntoResponse, AppError> {
    check(payload.validate(), fee_rules::validate_amounts(&payload.amounts))?;

    let amounts = &payload.amounts;
    let computed = fee_rules::compute(&FeeComponents::from(amounts), amounts.amount_paid);
    let payment_date = fee_rules::resolve_payment_date(
        amounts.amount_paid,
        amounts.payment_date,
        chrono::Local::now().date_naive(),
    );

    let sql = format!(
        r#"
        UPDATE student_monthly_fees SET
            base_monthly_fee = $1,
            monthly_van_fee = $2,
            monthly_exam_fee = $3,
            monthly_electricity_fee = $4,
            amount_due = $5,
            amount_paid = $6,
            is_paid = $7,
            payment_date = $8,
            notes = $9,
            updated_at = NOW()
        WHERE id = $10
        RETURNING {}
        "#,
        FEE_COLUMNS
    );

    let record = sqlx::query_as::<_, MonthlyFeeRecord>(&sql)
        .bind(amounts.base_monthly_fee)
        .bind(amounts.monthly_van_fee)
        .bind(amounts.monthly_exam_fee)
        .bind(amounts.monthly_electricity_fee)
        .bind(computed.amount_due)
        .bind(amounts.amount_paid)
        .bind(computed.is_paid)
        .bind(payment_date)
        .bind(clean_text(amounts.notes.as_deref()))
        .bind(id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update fee record {}: {:?}", id, e);
            AppError::from(e)
        })?
        .ok_or(AppError::NotFound("Fee record not found".to_string()))?;

    tracing::info!(fee_id = id, is_paid = record.is_paid, "Fee record updated");

    Ok(ApiResponse::with_message(fee_rules::fee_view(record), "Fee record updated"))
}

/// Admin only.
pub async fn delete_fee(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM student_monthly_fees WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete fee record: {:?}", e);
            AppError::from(e)
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Fee record not found".to_string()));
    }

    tracing::info!(fee_id = id, "Fee record deleted");

    Ok(StatusCode::NO_CONTENT)
}
