// src/models/fee.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::config::{FEE_YEAR_MAX, FEE_YEAR_MIN};

/// Represents the 'student_monthly_fees' table.
/// Component columns are nullable; `None` counts as zero in every sum
/// but is kept as `null` in row-level output.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MonthlyFeeRecord {
    pub id: i64,
    pub student_id: i64,
    pub fee_year: i32,
    pub fee_month: i32,
    pub base_monthly_fee: Option<Decimal>,
    pub monthly_van_fee: Option<Decimal>,
    pub monthly_exam_fee: Option<Decimal>,
    pub monthly_electricity_fee: Option<Decimal>,
    pub amount_due: Decimal,
    pub amount_paid: Decimal,
    pub is_paid: bool,
    pub payment_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// A fee record joined with the student it belongs to.
#[derive(Debug, Clone, FromRow)]
pub struct StudentFeeRow {
    pub full_name: String,
    pub current_class: String,
    pub roll_number: Option<String>,
    #[sqlx(flatten)]
    pub record: MonthlyFeeRecord,
}

/// A fee record with the derived figures recomputed from its components.
#[derive(Debug, Clone, Serialize)]
pub struct FeeView {
    #[serde(flatten)]
    pub record: MonthlyFeeRecord,
    pub amount_remaining: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeeTotals {
    pub total_due: Decimal,
    pub total_paid: Decimal,
    pub total_remaining: Decimal,
    pub unpaid_months: usize,
}

/// All fee months of one student, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct StudentFeeSummary {
    pub student_id: i64,
    pub full_name: String,
    pub current_class: String,
    pub roll_number: Option<String>,
    pub months: Vec<FeeView>,
    #[serde(flatten)]
    pub totals: FeeTotals,
}

/// Payment status filter for fee listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeStatus {
    Paid,
    Unpaid,
}

impl FromStr for FeeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "paid" => Ok(FeeStatus::Paid),
            "unpaid" => Ok(FeeStatus::Unpaid),
            other => Err(format!("unknown status '{}'", other)),
        }
    }
}

/// Query parameters for the fee overview.
/// Every filter arrives as text: a select left on "All" sends an empty value.
#[derive(Debug, Default, Deserialize)]
pub struct FeeListParams {
    pub student_id: Option<String>,
    pub fee_year: Option<String>,
    pub fee_month: Option<String>,
    pub current_class: Option<String>,
    pub status: Option<String>,
}

/// DTO for recording a month's fee for a student.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateFeeRequest {
    pub student_id: i64,
    #[validate(range(min = FEE_YEAR_MIN, max = FEE_YEAR_MAX, message = "Fee year must be between 2000 and 2100."))]
    pub fee_year: i32,
    #[validate(range(min = 1, max = 12, message = "Fee month must be between 1 and 12."))]
    pub fee_month: i32,
    #[serde(flatten)]
    #[validate(nested)]
    pub amounts: FeeAmounts,
}

/// DTO for editing a fee record. The period is fixed; amounts are replaced.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateFeeRequest {
    #[serde(flatten)]
    #[validate(nested)]
    pub amounts: FeeAmounts,
}

/// The editable money fields shared by create and update.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct FeeAmounts {
    pub base_monthly_fee: Option<Decimal>,
    pub monthly_van_fee: Option<Decimal>,
    pub monthly_exam_fee: Option<Decimal>,
    pub monthly_electricity_fee: Option<Decimal>,
    #[serde(default)]
    pub amount_paid: Decimal,
    pub payment_date: Option<NaiveDate>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}
