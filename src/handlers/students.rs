// src/handlers/students.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgPool, Postgres, QueryBuilder};
use validator::Validate;

use crate::{
    error::AppError,
    handlers::{blank_to_none, fees, filter_value, results},
    models::{
        exam_result::ResultFilters,
        response::ApiResponse,
        student::{CreateStudentRequest, Student, StudentDetail, StudentListParams, UpdateStudentRequest},
    },
    reporting::{self, natural_cmp},
    utils::{hash::hash_password, html::clean_text},
};

const STUDENT_SELECT: &str = r#"
    SELECT
        s.user_id, u.username, s.full_name, s.current_class, s.roll_number,
        s.date_of_birth, s.gender, s.parent_name, s.phone, s.address,
        s.admission_date, s.created_at
    FROM students s
    JOIN users u ON u.id = s.user_id
"#;

/// Class, then name, then roll number, all in natural order.
fn sort_students(students: &mut [Student]) {
    students.sort_by(|a, b| {
        natural_cmp(&a.current_class, &b.current_class)
            .then_with(|| natural_cmp(&a.full_name, &b.full_name))
            .then_with(|| {
                natural_cmp(
                    a.roll_number.as_deref().unwrap_or(""),
                    b.roll_number.as_deref().unwrap_or(""),
                )
            })
    });
}

pub(crate) async fn fetch_student(pool: &PgPool, id: i64) -> Result<Student, AppError> {
    let sql = format!("{} WHERE s.user_id = $1", STUDENT_SELECT);

    sqlx::query_as::<_, Student>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Student not found".to_string()))
}

/// Lists students, optionally filtered by class and a search keyword.
pub async fn list_students(
    State(pool): State<PgPool>,
    Query(params): Query<StudentListParams>,
) -> Result<impl IntoResponse, AppError> {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(STUDENT_SELECT);
    builder.push(" WHERE TRUE");

    if let Some(class) = filter_value(params.current_class.as_deref()) {
        builder.push(" AND s.current_class = ");
        builder.push_bind(class.to_string());
    }

    if let Some(q) = filter_value(params.q.as_deref()) {
        let pattern = format!("%{}%", q);
        builder.push(" AND (s.full_name ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR s.roll_number ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR u.username ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }

    let mut students: Vec<Student> = builder
        .build_query_as()
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list students: {:?}", e);
            AppError::from(e)
        })?;

    sort_students(&mut students);

    Ok(ApiResponse::ok(students))
}

/// Student detail for the details modal: profile, fee months and exam marks.
pub async fn get_student(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let student = fetch_student(&pool, id).await?;

    let mut fee_views: Vec<_> = fees::fetch_student_fees(&pool, id)
        .await?
        .into_iter()
        .map(reporting::fees::fee_view)
        .collect();
    reporting::fees::sort_months(&mut fee_views);
    let fee_totals = reporting::fees::totals(&fee_views);

    let exam_results = results::fetch_result_rows(&pool, &ResultFilters::default(), Some(id)).await?;

    Ok(ApiResponse::ok(StudentDetail {
        student,
        fees: fee_views,
        fee_totals,
        results: exam_results,
    }))
}

/// Creates the login account and the student profile in one transaction.
/// Admin only.
pub async fn create_student(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateStudentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let hashed_password = hash_password(&payload.password)?;

    let mut tx = pool.begin().await?;

    let user_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO users (username, password, role)
        VALUES ($1, $2, 'student')
        RETURNING id
        "#,
    )
    .bind(&payload.username)
    .bind(&hashed_password)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| AppError::from(e).on_duplicate(format!("Username '{}' already exists", payload.username)))?;

    sqlx::query(
        r#"
        INSERT INTO students
        (user_id, full_name, current_class, roll_number, date_of_birth, gender,
         parent_name, phone, address, admission_date)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(user_id)
    .bind(payload.full_name.trim())
    .bind(payload.current_class.trim())
    .bind(blank_to_none(payload.roll_number))
    .bind(payload.date_of_birth)
    .bind(blank_to_none(payload.gender))
    .bind(blank_to_none(payload.parent_name))
    .bind(blank_to_none(payload.phone))
    .bind(clean_text(payload.address.as_deref()))
    .bind(payload.admission_date)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create student profile: {:?}", e);
        AppError::from(e)
    })?;

    tx.commit().await?;

    tracing::info!(student_id = user_id, "Student created");

    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message(serde_json::json!({ "user_id": user_id }), "Student added"),
    ))
}

/// Updates a student's profile. Absent fields are left unchanged,
/// blank optional fields are cleared.
/// Admin only.
pub async fn update_student(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateStudentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    // Check existence
    fetch_student(&pool, id).await?;

    if payload.is_empty() {
        return Ok(ApiResponse::with_message(serde_json::json!({ "user_id": id }), "Nothing to update"));
    }

    // Password and profile change together or not at all
    let mut tx = pool.begin().await?;

    if let Some(password) = &payload.password {
        let hashed = hash_password(password)?;
        sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
            .bind(hashed)
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE students SET ");
    let mut separated = builder.separated(", ");
    let mut has_profile_change = false;

    if let Some(full_name) = payload.full_name {
        separated.push("full_name = ");
        separated.push_bind_unseparated(full_name.trim().to_string());
        has_profile_change = true;
    }

    if let Some(current_class) = payload.current_class {
        separated.push("current_class = ");
        separated.push_bind_unseparated(current_class.trim().to_string());
        has_profile_change = true;
    }

    if payload.roll_number.is_some() {
        separated.push("roll_number = ");
        separated.push_bind_unseparated(blank_to_none(payload.roll_number));
        has_profile_change = true;
    }

    if let Some(date_of_birth) = payload.date_of_birth {
        separated.push("date_of_birth = ");
        separated.push_bind_unseparated(date_of_birth);
        has_profile_change = true;
    }

    if payload.gender.is_some() {
        separated.push("gender = ");
        separated.push_bind_unseparated(blank_to_none(payload.gender));
        has_profile_change = true;
    }

    if payload.parent_name.is_some() {
        separated.push("parent_name = ");
        separated.push_bind_unseparated(blank_to_none(payload.parent_name));
        has_profile_change = true;
    }

    if payload.phone.is_some() {
        separated.push("phone = ");
        separated.push_bind_unseparated(blank_to_none(payload.phone));
        has_profile_change = true;
    }

    if payload.address.is_some() {
        separated.push("address = ");
        separated.push_bind_unseparated(clean_text(payload.address.as_deref()));
        has_profile_change = true;
    }

    if let Some(admission_date) = payload.admission_date {
        separated.push("admission_date = ");
        separated.push_bind_unseparated(admission_date);
        has_profile_change = true;
    }

    if has_profile_change {
        builder.push(" WHERE user_id = ");
        builder.push_bind(id);

        builder.build().execute(&mut *tx).await.map_err(|e| {
            tracing::error!("Failed to update student: {:?}", e);
            AppError::from(e)
        })?;
    }

    tx.commit().await?;

    tracing::info!(student_id = id, "Student updated");

    Ok(ApiResponse::with_message(serde_json::json!({ "user_id": id }), "Student updated"))
}

/// Deletes a student. Their account, fee records and results go with them.
/// Admin only.
pub async fn delete_student(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1 AND role = 'student'")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete student: {:?}", e);
            AppError::from(e)
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Student not found".to_string()));
    }

    tracing::info!(student_id = id, "Student deleted");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(id: i64, class: &str, name: &str, roll: Option<&str>) -> Student {
        Student {
            user_id: id,
            username: format!("user{}", id),
            full_name: name.to_string(),
            current_class: class.to_string(),
            roll_number: roll.map(str::to_string),
            date_of_birth: None,
            gender: None,
            parent_name: None,
            phone: None,
            address: None,
            admission_date: None,
            created_at: None,
        }
    }

    #[test]
    fn students_sort_by_class_name_then_roll() {
        let mut list = vec![
            student(1, "10", "Kavya", Some("12")),
            student(2, "9", "Zara", None),
            student(3, "10", "Kavya", Some("2")),
            student(4, "10", "Arjun", Some("30")),
        ];
        sort_students(&mut list);

        let ids: Vec<i64> = list.iter().map(|s| s.user_id).collect();
        assert_eq!(ids, vec![2, 4, 3, 1]);
    }
}
