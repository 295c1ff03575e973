// src/models/staff.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::{student::PHONE_RE, user::Role};

/// Represents the 'staff' table joined with the owning user's account.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Staff {
    pub user_id: i64,
    pub username: String,
    pub role: String,
    pub full_name: String,
    pub position: String,
    pub department: Option<String>,
    pub qualification: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub salary: Option<Decimal>,
    pub joining_date: Option<NaiveDate>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Query parameters for listing or exporting staff.
#[derive(Debug, Default, Deserialize)]
pub struct StaffListParams {
    pub position: Option<String>,
    pub q: Option<String>,
    /// `csv` streams the filtered list as a file instead of JSON.
    pub download: Option<String>,
}

/// DTO for creating a staff member with a login account.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateStaffRequest {
    #[validate(length(min = 3, max = 50, message = "Username length must be between 3 and 50 characters."))]
    pub username: String,
    #[validate(length(min = 4, max = 128, message = "Password length must be between 4 and 128 characters."))]
    pub password: String,
    /// Defaults to `teacher`. Students cannot be created through this endpoint.
    pub role: Option<Role>,
    #[validate(length(min = 1, max = 100, message = "Full name is required (max 100 characters)."))]
    pub full_name: String,
    #[validate(length(min = 1, max = 50, message = "Position is required (max 50 characters)."))]
    pub position: String,
    #[validate(length(max = 100))]
    pub department: Option<String>,
    #[validate(length(max = 200))]
    pub qualification: Option<String>,
    #[validate(regex(path = *PHONE_RE, message = "Phone number is not valid."))]
    pub phone: Option<String>,
    #[validate(email(message = "Email address is not valid."))]
    pub email: Option<String>,
    pub salary: Option<Decimal>,
    pub joining_date: Option<NaiveDate>,
}

/// DTO for editing a staff member. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStaffRequest {
    pub role: Option<Role>,
    #[validate(length(min = 1, max = 100, message = "Full name is required (max 100 characters)."))]
    pub full_name: Option<String>,
    #[validate(length(min = 1, max = 50, message = "Position is required (max 50 characters)."))]
    pub position: Option<String>,
    #[validate(length(max = 100))]
    pub department: Option<String>,
    #[validate(length(max = 200))]
    pub qualification: Option<String>,
    #[validate(regex(path = *PHONE_RE, message = "Phone number is not valid."))]
    pub phone: Option<String>,
    #[validate(email(message = "Email address is not valid."))]
    pub email: Option<String>,
    pub salary: Option<Decimal>,
    pub joining_date: Option<NaiveDate>,
    #[validate(length(min = 4, max = 128, message = "Password length must be between 4 and 128 characters."))]
    pub password: Option<String>,
}

impl UpdateStaffRequest {
    pub fn is_empty(&self) -> bool {
        self.role.is_none()
            && self.full_name.is_none()
            && self.position.is_none()
            && self.department.is_none()
            && self.qualification.is_none()
            && self.phone.is_none()
            && self.email.is_none()
            && self.salary.is_none()
            && self.joining_date.is_none()
            && self.password.is_none()
    }
}
