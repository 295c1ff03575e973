// src/handlers/staff.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};
use validator::Validate;

use crate::{
    config::SALARY_LIMIT,
    error::{AppError, FieldError, check},
    handlers::{blank_to_none, filter_value, results::csv_attachment, wants_csv},
    models::{
        response::ApiResponse,
        staff::{CreateStaffRequest, Staff, StaffListParams, UpdateStaffRequest},
        user::Role,
    },
    reporting::{
        export::{export_filename, staff_csv},
        fees::money_error,
        natural_cmp,
    },
    utils::{hash::hash_password, jwt::AuthContext},
};

const STAFF_SELECT: &str = r#"
    SELECT
        st.user_id, u.username, u.role, st.full_name, st.position, st.department,
        st.qualification, st.phone, st.email, st.salary, st.joining_date, st.created_at
    FROM staff st
    JOIN users u ON u.id = st.user_id
"#;

fn staff_role(role: Option<Role>) -> Result<Role, AppError> {
    match role.unwrap_or(Role::Teacher) {
        Role::Student => Err(AppError::BadRequest(
            "Students are added through the student register".to_string(),
        )),
        role => Ok(role),
    }
}

fn validate_salary(salary: Option<Decimal>) -> Vec<FieldError> {
    salary
        .and_then(|s| money_error("salary", s, SALARY_LIMIT))
        .into_iter()
        .collect()
}

async fn fetch_staff(pool: &PgPool, id: i64) -> Result<Staff, AppError> {
    let sql = format!("{} WHERE st.user_id = $1", STAFF_SELECT);

    sqlx::query_as::<_, Staff>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Staff member not found".to_string()))
}

async fn query_staff(pool: &PgPool, params: &StaffListParams) -> Result<Vec<Staff>, AppError> {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(STAFF_SELECT);
    builder.push(" WHERE TRUE");

    if let Some(position) = filter_value(params.position.as_deref()) {
        builder.push(" AND st.position = ");
        builder.push_bind(position.to_string());
    }

    if let Some(q) = filter_value(params.q.as_deref()) {
        let pattern = format!("%{}%", q);
        builder.push(" AND (st.full_name ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR u.username ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR st.department ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }

    let mut staff: Vec<Staff> = builder
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list staff: {:?}", e);
            AppError::from(e)
        })?;

    staff.sort_by(|a, b| {
        natural_cmp(&a.full_name, &b.full_name).then(a.user_id.cmp(&b.user_id))
    });

    Ok(staff)
}

async fn export_staff(pool: &PgPool, params: &StaffListParams) -> Result<Response, AppError> {
    let staff = query_staff(pool, params).await?;
    let body = staff_csv(&staff)?;

    let filename = export_filename(
        "staff",
        &[("position", filter_value(params.position.as_deref()))],
        chrono::Local::now().naive_local(),
    );

    tracing::info!(rows = staff.len(), %filename, "Staff list exported");

    Ok(csv_attachment(&filename, body))
}

/// Staff directory. `download=csv` exports the same filtered list.
pub async fn list_staff(
    State(pool): State<PgPool>,
    Query(params): Query<StaffListParams>,
) -> Result<Response, AppError> {
    if wants_csv(params.download.as_deref()) {
        return Ok(match export_staff(&pool, &params).await {
            Ok(response) => response,
            Err(e) => e.into_plain_text_response(),
        });
    }

    let staff = query_staff(&pool, &params).await?;
    Ok(ApiResponse::ok(staff).into_response())
}

pub async fn get_staff(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ApiResponse::ok(fetch_staff(&pool, id).await?))
}

/// Creates the login account and the staff profile together.
/// Admin only.
pub async fn create_staff(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateStaffRequest>,
) -> Result<impl IntoResponse, AppError> {
    check(payload.validate(), validate_salary(payload.salary))?;
    let role = staff_role(payload.role)?;

    let hashed_password = hash_password(&payload.password)?;

    let mut tx = pool.begin().await?;

    let user_id: i64 = sqlx::query_scalar(
        "INSERT INTO users (username, password, role) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(&payload.username)
    .bind(&hashed_password)
    .bind(role.as_str())
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| AppError::from(e).on_duplicate(format!("Username '{}' already exists", payload.username)))?;

    sqlx::query(
        r#"
        INSERT INTO staff
        (user_id, full_name, position, department, qualification, phone, email, salary, joining_date)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(user_id)
    .bind(payload.full_name.trim())
    .bind(payload.position.trim())
    .bind(blank_to_none(payload.department))
    .bind(blank_to_none(payload.qualification))
    .bind(blank_to_none(payload.phone))
    .bind(blank_to_none(payload.email))
    .bind(payload.salary)
    .bind(payload.joining_date)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create staff profile: {:?}", e);
        AppError::from(e)
    })?;

    tx.commit().await?;

    tracing::info!(staff_id = user_id, role = %role, "Staff member created");

    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message(fetch_staff(&pool, user_id).await?, "Staff member added"),
    ))
}

/// Admin only.
pub async fn update_staff(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateStaffRequest>,
) -> Result<impl IntoResponse, AppError> {
    check(payload.validate(), validate_salary(payload.salary))?;

    let existing = fetch_staff(&pool, id).await?;

    if payload.is_empty() {
        return Ok(ApiResponse::with_message(existing, "Nothing to update"));
    }

    let mut tx = pool.begin().await?;

    if payload.role.is_some() {
        let role = staff_role(payload.role)?;
        sqlx::query("UPDATE users SET role = $1 WHERE id = $2")
            .bind(role.as_str())
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }

    if let Some(password) = &payload.password {
        sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
            .bind(hash_password(password)?)
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE staff SET ");
    let mut separated = builder.separated(", ");
    let mut has_profile_change = false;

    if let Some(full_name) = payload.full_name {
        separated.push("full_name = ");
        separated.push_bind_unseparated(full_name.trim().to_string());
        has_profile_change = true;
    }

    if let Some(position) = payload.position {
        separated.push("position = ");
        separated.push_bind_unseparated(position.trim().to_string());
        has_profile_change = true;
    }

    if payload.department.is_some() {
        separated.push("department = ");
        separated.push_bind_unseparated(blank_to_none(payload.department));
        has_profile_change = true;
    }

    if payload.qualification.is_some() {
        separated.push("qualification = ");
        separated.push_bind_unseparated(blank_to_none(payload.qualification));
        has_profile_change = true;
    }

    if payload.phone.is_some() {
        separated.push("phone = ");
        separated.push_bind_unseparated(blank_to_none(payload.phone));
        has_profile_change = true;
    }

    if payload.email.is_some() {
        separated.push("email = ");
        separated.push_bind_unseparated(blank_to_none(payload.email));
        has_profile_change = true;
    }

    if let Some(salary) = payload.salary {
        separated.push("salary = ");
        separated.push_bind_unseparated(salary);
        has_profile_change = true;
    }

    if let Some(joining_date) = payload.joining_date {
        separated.push("joining_date = ");
        separated.push_bind_unseparated(joining_date);
        has_profile_change = true;
    }

    if has_profile_change {
        builder.push(" WHERE user_id = ");
        builder.push_bind(id);

        builder.build().execute(&mut *tx).await.map_err(|e| {
            tracing::error!("Failed to update staff member: {:?}", e);
            AppError::from(e)
        })?;
    }

    tx.commit().await?;

    tracing::info!(staff_id = id, "Staff member updated");

    Ok(ApiResponse::with_message(fetch_staff(&pool, id).await?, "Staff member updated"))
}

/// Removes the staff member and their account.
/// Admin only.
pub async fn delete_staff(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    auth: AuthContext,
) -> Result<impl IntoResponse, AppError> {
    if auth.user_id == id {
        return Err(AppError::BadRequest("You cannot delete your own account".to_string()));
    }

    let result = sqlx::query(
        "DELETE FROM users WHERE id = $1 AND role <> 'student' AND EXISTS (SELECT 1 FROM staff WHERE user_id = $1)",
    )
    .bind(id)
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to delete staff member: {:?}", e);
        AppError::from(e)
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Staff member not found".to_string()));
    }

    tracing::info!(staff_id = id, "Staff member deleted");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staff_role_defaults_to_teacher() {
        assert_eq!(staff_role(None).unwrap(), Role::Teacher);
        assert_eq!(staff_role(Some(Role::Principal)).unwrap(), Role::Principal);
    }

    #[test]
    fn staff_role_rejects_students() {
        assert!(matches!(
            staff_role(Some(Role::Student)),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn negative_salary_is_a_field_error() {
        let errors = validate_salary(Some(Decimal::new(-1, 0)));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "salary");
        assert!(validate_salary(None).is_empty());
    }

    #[test]
    fn salary_must_fit_the_column() {
        assert_eq!(validate_salary(Some(Decimal::new(10_000_000_000, 0))).len(), 1);
        assert_eq!(validate_salary(Some(Decimal::new(12345, 3))).len(), 1);
        assert!(validate_salary(Some(Decimal::new(4_500_000, 2))).is_empty());
    }
}
