// src/handlers/auth.rs

use axum::{extract::State, response::IntoResponse, Json};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::{
        response::ApiResponse,
        user::{LoginRequest, LoginResponse, Role, User},
    },
    utils::{
        hash::verify_password,
        jwt::{AuthContext, sign_jwt},
    },
};

/// Authenticates a user and returns a JWT token.
///
/// Unknown usernames and wrong passwords get the same 401 so the response
/// does not reveal which usernames exist.
pub async fn login(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, password, role, created_at
        FROM users
        WHERE username = $1
        "#,
    )
    .bind(&payload.username)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Login DB error: {:?}", e);
        AppError::from(e)
    })?;

    let invalid = || AppError::AuthError("Invalid username or password".to_string());

    let user = user.ok_or_else(invalid)?;
    if !verify_password(&payload.password, &user.password)? {
        tracing::warn!(username = %payload.username, "Failed login attempt");
        return Err(invalid());
    }

    let role = user.role.parse::<Role>().map_err(AppError::QueryFailure)?;
    let token = sign_jwt(user.id, role, &config.jwt_secret, config.jwt_expiration)?;

    tracing::info!(user_id = user.id, role = %role, "User logged in");

    Ok(ApiResponse::ok(LoginResponse {
        token,
        token_type: "Bearer",
        role,
        user_id: user.id,
    }))
}

/// Returns the caller's authorization context.
pub async fn me(auth: AuthContext) -> impl IntoResponse {
    ApiResponse::ok(auth)
}
