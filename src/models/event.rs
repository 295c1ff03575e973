// src/models/event.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'events' table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub event_date: NaiveDate,
    pub created_by: Option<i64>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventListParams {
    /// `true` lists only events from today onwards. Blank means all.
    pub upcoming: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateEventRequest {
    #[validate(length(min = 1, max = 150, message = "Title is required (max 150 characters)."))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub event_date: NaiveDate,
}
