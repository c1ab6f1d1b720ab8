// HTTP-facing error type shared by every handler
use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;
use validator::ValidationErrors;

use crate::db::StoreError;

/// Shown to applicants whenever storage fails; details stay in the logs
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation failed")]
    InvalidFields(ValidationErrors),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::InvalidFields(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match self {
            ServiceError::DatabaseError(msg) => {
                error!("Store failure: {}", msg);
                json!({ "error": GENERIC_FAILURE_MESSAGE, "status": status.as_u16() })
            },
            ServiceError::InvalidFields(errors) => json!({
                "error": "Please correct the highlighted fields",
                "status": status.as_u16(),
                "fields": field_messages(&errors),
            }),
            ServiceError::BadRequest(msg)
            | ServiceError::NotFound(msg)
            | ServiceError::Conflict(msg) => {
                json!({ "error": msg, "status": status.as_u16() })
            },
        };

        (status, Json(body)).into_response()
    }
}

/// `{ "fullName": ["Full name is required"], ... }` keyed the way clients name fields
pub fn field_messages(errors: &ValidationErrors) -> BTreeMap<String, Vec<String>> {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let messages = errs
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value ({})", e.code))
                })
                .collect();
            (to_camel_case(field), messages)
        })
        .collect()
}

fn to_camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper_next = false;
    for ch in field.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

// Conversion from various error types
impl From<StoreError> for ServiceError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound => ServiceError::NotFound("Resource not found".to_string()),
            StoreError::Conflict(msg) => ServiceError::Conflict(msg),
            other => ServiceError::DatabaseError(other.to_string()),
        }
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(errors: ValidationErrors) -> Self {
        ServiceError::InvalidFields(errors)
    }
}
