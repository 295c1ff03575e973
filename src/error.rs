// src/error.rs

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use std::fmt;

/// A single field-level validation message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Global Application Error Enum.
/// Every database and input failure is caught at the request boundary and
/// turned into one of these, then into a display message for the client.
#[derive(Debug)]
pub enum AppError {
    // 503 Service Unavailable (connection could not be obtained)
    DatabaseUnavailable,

    // 500 Internal Server Error (prepare/execute failed; detail is logged only)
    QueryFailure(String),

    // 400 Bad Request with per-field messages
    Validation(Vec<FieldError>),

    // 400 Bad Request
    BadRequest(String),

    // 409 Conflict (record already exists for the key, nothing was written)
    Duplicate(String),

    // 404 Not Found
    NotFound(String),

    // 401 Unauthorized
    AuthError(String),

    // 403 Forbidden
    Forbidden(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::DatabaseUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::QueryFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Duplicate(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }

    /// Machine-readable error kind, sent as `kind` in the response body.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::DatabaseUnavailable => "database_unavailable",
            AppError::QueryFailure(_) => "query_failure",
            AppError::Validation(_) => "validation",
            AppError::BadRequest(_) => "bad_request",
            AppError::Duplicate(_) => "duplicate",
            AppError::NotFound(_) => "not_found",
            AppError::AuthError(_) => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
        }
    }

    /// The message that is safe to show to a user.
    /// Query failures never expose the underlying database text.
    pub fn public_message(&self) -> String {
        match self {
            AppError::DatabaseUnavailable => {
                "Database is currently unavailable. Please try again later.".to_string()
            }
            AppError::QueryFailure(_) => {
                "Something went wrong while processing your request.".to_string()
            }
            AppError::Validation(_) => "Please correct the highlighted fields.".to_string(),
            AppError::BadRequest(msg)
            | AppError::Duplicate(msg)
            | AppError::NotFound(msg)
            | AppError::AuthError(msg)
            | AppError::Forbidden(msg) => msg.clone(),
        }
    }

    /// Replaces the generic duplicate message with one naming the conflicting record.
    pub fn on_duplicate(self, message: impl Into<String>) -> Self {
        match self {
            AppError::Duplicate(_) => AppError::Duplicate(message.into()),
            other => other,
        }
    }

    /// Replaces the generic not-found message, typically for a missing referenced record.
    pub fn on_not_found(self, message: impl Into<String>) -> Self {
        match self {
            AppError::NotFound(_) => AppError::NotFound(message.into()),
            other => other,
        }
    }

    /// Renders the error as a plain-text response. Used by file downloads,
    /// where a JSON body would be saved as the file.
    pub fn into_plain_text_response(self) -> Response {
        self.log();
        (
            self.status(),
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.public_message(),
        )
            .into_response()
    }

    fn log(&self) {
        match self {
            AppError::QueryFailure(msg) => tracing::error!("Query failure: {}", msg),
            AppError::DatabaseUnavailable => tracing::error!("Database unavailable"),
            AppError::Duplicate(msg) => tracing::warn!("Duplicate record skipped: {}", msg),
            _ => {}
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();

        let status = self.status();
        let mut body = json!({
            "success": false,
            "kind": self.kind(),
            "message": self.public_message(),
        });

        match &self {
            AppError::Validation(errors) => {
                body["errors"] = json!(errors);
            }
            // Report views fall back to an empty result set.
            AppError::DatabaseUnavailable => {
                body["data"] = json!([]);
            }
            _ => {}
        }

        (status, Json(body)).into_response()
    }
}

/// Classifies `sqlx::Error` so `?` can be used on database calls.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => AppError::DatabaseUnavailable,
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".to_string()),
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                AppError::Duplicate("Record already exists".to_string())
            }
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                AppError::NotFound("Referenced record not found".to_string())
            }
            other => AppError::QueryFailure(other.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(field_errors(&errors))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::QueryFailure(format!("CSV export failed: {}", err))
    }
}

/// Flattens validator output into field/message pairs, sorted by field name.
/// Nested structs are flattened too, since their fields arrive at the top
/// level of the request body.
pub fn field_errors(errors: &validator::ValidationErrors) -> Vec<FieldError> {
    let mut out = Vec::new();
    collect_field_errors(errors, &mut out);
    out.sort_by(|a, b| a.field.cmp(&b.field));
    out
}

fn collect_field_errors(errors: &validator::ValidationErrors, out: &mut Vec<FieldError>) {
    use validator::ValidationErrorsKind;

    for (field, kind) in errors.errors() {
        match kind {
            ValidationErrorsKind::Field(errs) => {
                for e in errs {
                    let message = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value ({})", e.code));
                    out.push(FieldError::new(field.to_string(), message));
                }
            }
            ValidationErrorsKind::Struct(inner) => collect_field_errors(inner, out),
            ValidationErrorsKind::List(items) => {
                for inner in items.values() {
                    collect_field_errors(inner, out);
                }
            }
        }
    }
}

/// Merges derive-based validation with extra hand-written checks.
/// Returns `Ok(())` only when both are clean.
pub fn check(
    derived: Result<(), validator::ValidationErrors>,
    extra: Vec<FieldError>,
) -> Result<(), AppError> {
    let mut errors = match derived {
        Ok(()) => Vec::new(),
        Err(e) => field_errors(&e),
    };
    errors.extend(extra);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_timeout_is_database_unavailable() {
        let err = AppError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, AppError::DatabaseUnavailable));
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.kind(), "database_unavailable");
    }

    #[test]
    fn row_not_found_maps_to_404() {
        let err = AppError::from(sqlx::Error::RowNotFound);
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn query_failure_hides_database_text() {
        let err = AppError::from(sqlx::Error::ColumnNotFound("secret_column".to_string()));
        assert_eq!(err.kind(), "query_failure");
        assert!(!err.public_message().contains("secret_column"));
    }

    #[test]
    fn on_duplicate_only_rewrites_duplicates() {
        let dup = AppError::Duplicate("x".to_string()).on_duplicate("Fee already recorded");
        assert_eq!(dup.public_message(), "Fee already recorded");

        let other = AppError::NotFound("nope".to_string()).on_duplicate("ignored");
        assert_eq!(other.public_message(), "nope");
    }

    #[test]
    fn foreign_key_miss_can_name_the_record() {
        let err = AppError::NotFound("Referenced record not found".to_string())
            .on_duplicate("ignored")
            .on_not_found("Student not found");
        assert_eq!(err.public_message(), "Student not found");

        let dup = AppError::Duplicate("x".to_string()).on_not_found("ignored");
        assert_eq!(dup.kind(), "duplicate");
    }

    #[test]
    fn check_collects_extra_errors() {
        let result = check(Ok(()), vec![FieldError::new("amount_paid", "must not be negative")]);
        match result {
            Err(AppError::Validation(errors)) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "amount_paid");
            }
            other => panic!("expected validation error, got {:?}", other),
        }

        assert!(check(Ok(()), Vec::new()).is_ok());
    }
}
