// src/utils/jwt.rs

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{Request, header, request::Parts},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{config::Config, error::AppError, models::user::Role};

/// JWT Claims structure.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - Stores the User ID (as string).
    pub sub: String,
    /// Account role, lowercase.
    pub role: String,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

/// Request-scoped authorization context.
///
/// Built once per request by `auth_middleware` from a verified token and
/// handed to guards and handlers through the request extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AuthContext {
    pub user_id: i64,
    pub role: Role,
}

impl TryFrom<Claims> for AuthContext {
    type Error = AppError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let user_id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;
        let role = claims
            .role
            .parse::<Role>()
            .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

        Ok(Self { user_id, role })
    }
}

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .copied()
            .ok_or_else(|| AppError::AuthError("Authentication required".to_string()))
    }
}

/// Signs a new JWT for the user.
pub fn sign_jwt(
    user_id: i64,
    role: Role,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    let expiration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::QueryFailure(e.to_string()))?
        .as_secs() as usize
        + expiration_seconds as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        role: role.as_str().to_owned(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::QueryFailure(e.to_string()))
}

/// Verifies and decodes a JWT string.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

    Ok(token_data.claims)
}

/// Axum Middleware: Authentication.
///
/// Validates the 'Authorization: Bearer <token>' header and injects an
/// `AuthContext` into the request extensions. Anything else is a 401.
pub async fn auth_middleware(
    State(config): State<Config>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::AuthError("Authentication required".to_string()))?;

    let context = AuthContext::try_from(verify_jwt(token, &config.jwt_secret)?)?;
    req.extensions_mut().insert(context);

    Ok(next.run(req).await)
}

fn context_of(req: &Request<Body>) -> Result<AuthContext, AppError> {
    req.extensions()
        .get::<AuthContext>()
        .copied()
        .ok_or_else(|| AppError::AuthError("Authentication required".to_string()))
}

/// Axum Middleware: dashboards and reports.
///
/// Must be used AFTER `auth_middleware`. Admins and principals only.
pub async fn back_office_middleware(req: Request<Body>, next: Next) -> Result<Response, AppError> {
    let context = context_of(&req)?;

    if !context.role.is_back_office() {
        tracing::warn!(user_id = context.user_id, role = %context.role, "Back office access denied");
        return Err(AppError::Forbidden(
            "Only administrators and principals can view this page".to_string(),
        ));
    }

    Ok(next.run(req).await)
}

/// Axum Middleware: Admin Authorization.
///
/// Must be used AFTER `auth_middleware`. Guards every create/update/delete.
pub async fn admin_middleware(req: Request<Body>, next: Next) -> Result<Response, AppError> {
    let context = context_of(&req)?;

    if context.role != Role::Admin {
        tracing::warn!(user_id = context.user_id, role = %context.role, "Admin access denied");
        return Err(AppError::Forbidden(
            "Only administrators can change records".to_string(),
        ));
    }

    Ok(next.run(req).await)
}
