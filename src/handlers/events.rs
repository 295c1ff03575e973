// src/handlers/events.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    config::UPCOMING_EVENTS_LIMIT,
    error::AppError,
    handlers::parse_filter,
    models::{
        event::{CreateEventRequest, Event, EventListParams},
        response::ApiResponse,
    },
    utils::{html::clean_text, jwt::AuthContext},
};

const EVENT_COLUMNS: &str = "id, title, description, event_date, created_by, created_at";

/// The next few events from today onwards, soonest first.
pub(crate) async fn fetch_upcoming_events(pool: &PgPool) -> Result<Vec<Event>, AppError> {
    let sql = format!(
        "SELECT {} FROM events WHERE event_date >= CURRENT_DATE ORDER BY event_date, id LIMIT $1",
        EVENT_COLUMNS
    );

    let events = sqlx::query_as::<_, Event>(&sql)
        .bind(UPCOMING_EVENTS_LIMIT)
        .fetch_all(pool)
        .await?;

    Ok(events)
}

pub async fn list_events(
    State(pool): State<PgPool>,
    Query(params): Query<EventListParams>,
) -> Result<impl IntoResponse, AppError> {
    let upcoming: Option<bool> = parse_filter("upcoming", params.upcoming.as_deref())?;

    let sql = if upcoming.unwrap_or(false) {
        format!(
            "SELECT {} FROM events WHERE event_date >= CURRENT_DATE ORDER BY event_date, id",
            EVENT_COLUMNS
        )
    } else {
        format!("SELECT {} FROM events ORDER BY event_date DESC, id DESC", EVENT_COLUMNS)
    };

    let events = sqlx::query_as::<_, Event>(&sql)
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list events: {:?}", e);
            AppError::from(e)
        })?;

    Ok(ApiResponse::ok(events))
}

/// Admin only.
pub async fn create_event(
    State(pool): State<PgPool>,
    auth: AuthContext,
    Json(payload): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let sql = format!(
        "INSERT INTO events (title, description, event_date, created_by) VALUES ($1, $2, $3, $4) RETURNING {}",
        EVENT_COLUMNS
    );

    let event = sqlx::query_as::<_, Event>(&sql)
        .bind(payload.title.trim())
        .bind(clean_text(payload.description.as_deref()))
        .bind(payload.event_date)
        .bind(auth.user_id)
        .fetch_one(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create event: {:?}", e);
            AppError::from(e)
        })?;

    tracing::info!(event_id = event.id, created_by = auth.user_id, "Event created");

    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message(event, "Event added"),
    ))
}

/// Admin only.
pub async fn delete_event(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM events WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Event not found".to_string()));
    }

    tracing::info!(event_id = id, "Event deleted");

    Ok(StatusCode::NO_CONTENT)
}
