// src/models/student.rs

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::{exam_result::ExamResultRow, fee::{FeeTotals, FeeView}};

pub(crate) static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+0-9 ()-]{6,20}$").expect("phone pattern is valid"));

/// Represents the 'students' table joined with the owning user's username.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Student {
    pub user_id: i64,
    pub username: String,
    pub full_name: String,
    pub current_class: String,
    pub roll_number: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub parent_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub admission_date: Option<NaiveDate>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Everything the details modal shows for one student.
#[derive(Debug, Serialize)]
pub struct StudentDetail {
    pub student: Student,
    pub fees: Vec<FeeView>,
    pub fee_totals: FeeTotals,
    pub results: Vec<ExamResultRow>,
}

/// Query parameters for listing students.
#[derive(Debug, Default, Deserialize)]
pub struct StudentListParams {
    pub current_class: Option<String>,
    /// Search keyword matched against name, roll number and username.
    pub q: Option<String>,
}

/// DTO for creating a student together with their login account.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateStudentRequest {
    #[validate(length(min = 3, max = 50, message = "Username length must be between 3 and 50 characters."))]
    pub username: String,
    #[validate(length(min = 4, max = 128, message = "Password length must be between 4 and 128 characters."))]
    pub password: String,
    #[validate(length(min = 1, max = 100, message = "Full name is required (max 100 characters)."))]
    pub full_name: String,
    #[validate(length(min = 1, max = 20, message = "Class is required (max 20 characters)."))]
    pub current_class: String,
    #[validate(length(max = 20))]
    pub roll_number: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    #[validate(length(max = 10))]
    pub gender: Option<String>,
    #[validate(length(max = 100))]
    pub parent_name: Option<String>,
    #[validate(regex(path = *PHONE_RE, message = "Phone number is not valid."))]
    pub phone: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    pub admission_date: Option<NaiveDate>,
}

/// DTO for editing a student. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStudentRequest {
    #[validate(length(min = 1, max = 100, message = "Full name is required (max 100 characters)."))]
    pub full_name: Option<String>,
    #[validate(length(min = 1, max = 20, message = "Class is required (max 20 characters)."))]
    pub current_class: Option<String>,
    #[validate(length(max = 20))]
    pub roll_number: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    #[validate(length(max = 10))]
    pub gender: Option<String>,
    #[validate(length(max = 100))]
    pub parent_name: Option<String>,
    #[validate(regex(path = *PHONE_RE, message = "Phone number is not valid."))]
    pub phone: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    pub admission_date: Option<NaiveDate>,
    #[validate(length(min = 4, max = 128, message = "Password length must be between 4 and 128 characters."))]
    pub password: Option<String>,
}

impl UpdateStudentRequest {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.current_class.is_none()
            && self.roll_number.is_none()
            && self.date_of_birth.is_none()
            && self.gender.is_none()
            && self.parent_name.is_none()
            && self.phone.is_none()
            && self.address.is_none()
            && self.admission_date.is_none()
            && self.password.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> CreateStudentRequest {
        CreateStudentRequest {
            username: "asha.k".to_string(),
            password: "secret123".to_string(),
            full_name: "Asha K".to_string(),
            current_class: "10".to_string(),
            roll_number: Some("7".to_string()),
            date_of_birth: None,
            gender: None,
            parent_name: None,
            phone: Some("+91 98765 43210".to_string()),
            address: None,
            admission_date: None,
        }
    }

    #[test]
    fn accepts_valid_student() {
        assert!(valid_request().validate().is_ok());
    }

    #[test]
    fn rejects_bad_phone_and_empty_class() {
        let mut req = valid_request();
        req.phone = Some("call me".to_string());
        req.current_class = String::new();

        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("phone"));
        assert!(fields.contains_key("current_class"));
    }
}
