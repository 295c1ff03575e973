// src/models/dashboard.rs

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

use crate::{models::event::Event, reporting::toppers::ToppersBoard};

#[derive(Debug, Serialize, FromRow)]
pub struct ClassCount {
    pub current_class: String,
    pub students: i64,
}

/// Fee collection figures for a single month across all students.
#[derive(Debug, Serialize, FromRow)]
pub struct FeeCollection {
    pub fee_year: i32,
    pub fee_month: i32,
    pub total_due: Decimal,
    pub total_paid: Decimal,
    pub total_remaining: Decimal,
    pub unpaid_records: i64,
}

#[derive(Debug, Serialize)]
pub struct DashboardOverview {
    pub total_students: i64,
    pub total_staff: i64,
    pub class_counts: Vec<ClassCount>,
    pub fee_collection: FeeCollection,
    pub toppers: ToppersBoard,
    pub upcoming_events: Vec<Event>,
}
