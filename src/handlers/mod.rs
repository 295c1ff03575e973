// src/handlers/mod.rs

use std::str::FromStr;

use crate::error::{AppError, FieldError};

pub mod auth;
pub mod dashboard;
pub mod events;
pub mod fees;
pub mod reports;
pub mod results;
pub mod staff;
pub mod students;

/// Query-string filters arrive as `Some("")` when a select is left on "All".
pub(crate) fn filter_value(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Parses an optional typed filter. Blank means "no filter"; anything
/// unparsable is a field-level validation error.
pub(crate) fn parse_filter<T: FromStr>(field: &str, value: Option<&str>) -> Result<Option<T>, AppError> {
    filter_value(value)
        .map(|v| {
            v.parse::<T>().map_err(|_| {
                AppError::Validation(vec![FieldError::new(field, format!("'{}' is not a valid {}.", v, field))])
            })
        })
        .transpose()
}

/// Blank optional text is stored as NULL.
pub(crate) fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Whether a `download` query parameter asks for a CSV file.
pub(crate) fn wants_csv(download: Option<&str>) -> bool {
    download.is_some_and(|d| d.eq_ignore_ascii_case("csv"))
}
