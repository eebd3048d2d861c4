use rocket::serde::json;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::instrument;
use validator::{Validate, ValidationErrors};

use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(field: &str, code: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            code: code.to_string(),
            message: message.into(),
        }
    }
}

impl From<ValidationErrors> for AppError {
    #[instrument]
    fn from(errors: ValidationErrors) -> Self {
        let mut issues: Vec<ValidationIssue> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, field_errors)| {
                let field = camel_case(&field);
                field_errors.iter().map(move |error| {
                    let message = error
                        .message
                        .clone()
                        .unwrap_or_else(|| "Invalid value".into());
                    ValidationIssue::new(&field, &error.code, message)
                })
            })
            .collect();

        issues.sort_by(|a, b| a.field.cmp(&b.field));
        AppError::Validation(issues)
    }
}

// validator reports Rust field names; clients send camelCase.
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

impl From<json::Error<'_>> for AppError {
    fn from(error: json::Error<'_>) -> Self {
        let message = match error {
            json::Error::Io(e) => format!("Could not read request body: {}", e),
            json::Error::Parse(_, e) => e.to_string(),
        };

        AppError::Validation(vec![ValidationIssue::new("body", "invalid_json", message)])
    }
}

/// A creation payload that validates into the record inserted by the store.
pub trait Normalize: Validate + Sized {
    type Output;

    /// Fills defaults for omitted fields. Only called on a validated payload.
    fn normalize(self) -> Self::Output;

    fn validate_custom(self) -> Result<Self::Output, AppError> {
        self.validate()?;
        Ok(self.normalize())
    }
}

/// Data guard output of a JSON body that may have failed to parse.
pub trait JsonBodyExt<T> {
    fn into_payload(self) -> Result<T, AppError>;
}

impl<T> JsonBodyExt<T> for Result<json::Json<T>, json::Error<'_>> {
    fn into_payload(self) -> Result<T, AppError> {
        self.map(json::Json::into_inner).map_err(AppError::from)
    }
}

/// Keeps an explicit `null` apart from an absent field in partial updates.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub fn parse_date_param(field: &str, value: &str) -> Result<chrono::NaiveDate, AppError> {
    chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        AppError::Validation(vec![ValidationIssue::new(
            field,
            "invalid_date",
            format!("Expected a date formatted as YYYY-MM-DD, got '{}'", value),
        )])
    })
}

pub fn parse_id_param(field: &str, value: &str) -> Result<i64, AppError> {
    value.trim().parse::<i64>().map_err(|_| {
        AppError::Validation(vec![ValidationIssue::new(
            field,
            "invalid_id",
            format!("Expected an integer id, got '{}'", value),
        )])
    })
}
