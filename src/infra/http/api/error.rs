use std::collections::BTreeMap;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::error::ErrorReport;

/// Per-field validation messages, keyed by the request field name.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    errors: Option<FieldErrors>,
    detail: Option<String>,
}

impl ApiError {
    pub fn not_found(message: &'static str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.to_string(),
            errors: None,
            detail: None,
        }
    }

    pub fn conflict(message: &'static str) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: message.to_string(),
            errors: None,
            detail: None,
        }
    }

    /// Opaque failure. The body stays generic; `detail` only reaches the logs.
    pub fn server_error(detail: String) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "Server error".to_string(),
            errors: None,
            detail: Some(detail),
        }
    }

    /// Unprocessable request. The top-level message quotes the first field
    /// message and counts the rest.
    pub fn validation(errors: FieldErrors) -> Self {
        let total: usize = errors.values().map(Vec::len).sum();
        let first = errors
            .values()
            .flatten()
            .next()
            .cloned()
            .unwrap_or_else(|| "The given data was invalid.".to_string());
        let message = match total {
            0 | 1 => first,
            2 => format!("{first} (and 1 more error)"),
            more => format!("{first} (and {} more errors)", more - 1),
        };

        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message,
            errors: Some(errors),
            detail: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let report_detail = self
            .detail
            .unwrap_or_else(|| format!("{}: {}", self.status.as_u16(), self.message));
        let body = ApiErrorBody {
            message: self.message,
            errors: self.errors,
        };
        let mut response = (self.status, Json(body)).into_response();
        // The logging middleware reads the report back out of the extensions.
        ErrorReport::from_message("infra::http::api", self.status, report_detail)
            .attach(&mut response);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn errors_of(pairs: &[(&str, &[&str])]) -> FieldErrors {
        pairs
            .iter()
            .map(|(field, messages)| {
                (
                    (*field).to_string(),
                    messages.iter().map(|m| (*m).to_string()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn single_failure_becomes_the_top_level_message() {
        let err = ApiError::validation(errors_of(&[("name", &["The name field is required."])]));
        assert_eq!(err.message, "The name field is required.");
    }

    #[test]
    fn additional_failures_are_counted() {
        let err = ApiError::validation(errors_of(&[
            ("name", &["The name field is required."]),
            ("title", &["The title field is required."]),
        ]));
        assert_eq!(
            err.message,
            "The name field is required. (and 1 more error)"
        );

        let err = ApiError::validation(errors_of(&[
            ("a", &["The a field is required."]),
            ("b", &["The b field is required."]),
            ("c", &["The c field is required."]),
        ]));
        assert_eq!(err.message, "The a field is required. (and 2 more errors)");
    }

    #[test]
    fn error_body_omits_the_errors_key_outside_validation() {
        let body = ApiErrorBody {
            message: "Author not found".to_string(),
            errors: None,
        };
        let rendered = serde_json::to_value(&body).unwrap();
        assert_eq!(rendered, serde_json::json!({"message": "Author not found"}));
    }
}
