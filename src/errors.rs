// src/errors.rs
// DOCUMENTATION: Custom error types and HTTP responses
// PURPOSE: Centralized error handling for entire application

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use std::collections::BTreeMap;
use thiserror::Error;

/// Field name to error messages, as rendered back to a form
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Application-specific error types
/// DOCUMENTATION: Each variant maps to an HTTP status code and error response
#[derive(Error, Debug)]
pub enum VillageError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Please correct the errors below.")]
    FormErrors(FieldErrors),

    #[error("Unauthorized access")]
    Unauthorized,

    #[error("Forbidden access")]
    Forbidden,

    #[error("External API error: {0}")]
    ExternalApiError(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,
}

impl VillageError {
    /// Single-field form error
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(field.to_string(), vec![message.into()]);
        VillageError::FormErrors(fields)
    }

    fn error_code(&self) -> &'static str {
        match self {
            VillageError::NotFound(_) => "NOT_FOUND",
            VillageError::DatabaseError(_) => "DATABASE_ERROR",
            VillageError::InvalidInput(_) => "INVALID_INPUT",
            VillageError::FormErrors(_) => "VALIDATION_ERROR",
            VillageError::Unauthorized => "UNAUTHORIZED",
            VillageError::Forbidden => "FORBIDDEN",
            VillageError::ExternalApiError(_) => "EXTERNAL_API_ERROR",
            VillageError::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
        }
    }
}

impl From<sqlx::Error> for VillageError {
    fn from(e: sqlx::Error) -> Self {
        log::error!("Database query failed: {}", e);
        VillageError::DatabaseError(e.to_string())
    }
}

/// Flatten validator output into per-field messages
impl From<validator::ValidationErrors> for VillageError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields = FieldErrors::new();
        for (field, field_errors) in errors.field_errors() {
            let messages = field_errors
                .iter()
                .map(|e| match &e.message {
                    Some(message) => message.to_string(),
                    None => default_message(&e.code),
                })
                .collect();
            fields.insert(field.to_string(), messages);
        }
        VillageError::FormErrors(fields)
    }
}

fn default_message(code: &str) -> String {
    match code {
        "length" => "Ensure this field has a valid length.".to_string(),
        "required" => "This field is required.".to_string(),
        "email" => "Enter a valid email address.".to_string(),
        other => format!("Invalid value ({}).", other),
    }
}

/// Convert VillageError to HTTP response
/// DOCUMENTATION: Maps error types to HTTP status codes and JSON responses
impl ResponseError for VillageError {
    fn error_response(&self) -> HttpResponse {
        let mut error = json!({
            "code": self.error_code(),
            "message": self.to_string(),
            "timestamp": chrono::Utc::now().to_rfc3339()
        });

        if let VillageError::FormErrors(fields) = self {
            error["fields"] = json!(fields);
        }

        HttpResponse::build(self.status_code()).json(json!({ "error": error }))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            VillageError::NotFound(_) => StatusCode::NOT_FOUND,
            VillageError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            VillageError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            VillageError::FormErrors(_) => StatusCode::BAD_REQUEST,
            VillageError::Unauthorized => StatusCode::UNAUTHORIZED,
            VillageError::Forbidden => StatusCode::FORBIDDEN,
            VillageError::ExternalApiError(_) => StatusCode::BAD_GATEWAY,
            VillageError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct NameForm {
        #[validate(length(min = 1, message = "This field is required."))]
        name: String,
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            VillageError::NotFound("student".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(VillageError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(VillageError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            VillageError::field("name", "bad").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            VillageError::RateLimitExceeded.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn test_validation_errors_become_field_errors() {
        let form = NameForm {
            name: String::new(),
        };
        let err: VillageError = form.validate().unwrap_err().into();

        match err {
            VillageError::FormErrors(fields) => {
                assert_eq!(fields["name"], vec!["This field is required.".to_string()]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_form_error_response_is_bad_request() {
        let response = VillageError::field("contact", "nope").error_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
