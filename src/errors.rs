use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::validation::FieldErrors;

const GENERIC_FAILURE: &str = "Request failed";

/// Failure channel for every call made against the booking backend.
///
/// The `Display` output is the message shown to the visitor.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    #[error("Request timed out. Please try again.")]
    Timeout,

    #[error("{0}")]
    Network(String),

    #[error("{message}")]
    Http { status: u16, message: String },

    /// The backend answered with `success: false`.
    #[error("{0}")]
    Backend(String),

    /// A 2xx response whose payload could not be used. Carries the
    /// operation-specific message shown instead.
    #[error("{0}")]
    Unexpected(String),

    #[error("Unexpected response from the booking service")]
    UnrecognizedEnvelope,

    #[error("{0}")]
    Decode(String),
}

impl ApiError {
    /// Builds an HTTP failure, preferring the server-supplied message.
    pub fn http(status: u16, server_message: Option<String>) -> Self {
        let message = server_message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| format!("Request failed with status code {status}"));
        ApiError::Http { status, message }
    }

    pub fn network(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.trim().is_empty() {
            ApiError::Network(GENERIC_FAILURE.to_string())
        } else {
            ApiError::Network(message)
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.status(), Some(404))
    }

    /// True when the backend refused the request because the slot no longer
    /// has room for the group.
    pub fn is_capacity_conflict(&self) -> bool {
        if self.status() == Some(409) {
            return true;
        }
        match self {
            ApiError::Http { message, .. } | ApiError::Backend(message) => {
                let lower = message.to_lowercase();
                lower.contains("remaining") || lower.contains("available spots")
            }
            _ => false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("validation failed")]
    Validation(FieldErrors),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("upstream error: {0}")]
    Upstream(#[from] ApiError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                serde_json::json!({ "success": false, "errors": errors }),
            ),
            AppError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                serde_json::json!({ "success": false, "error": message }),
            ),
            AppError::Upstream(err) => {
                let status = match err {
                    ApiError::Timeout => StatusCode::GATEWAY_TIMEOUT,
                    _ => StatusCode::BAD_GATEWAY,
                };
                (
                    status,
                    serde_json::json!({ "success": false, "error": err.to_string() }),
                )
            }
            AppError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "success": false, "error": self.to_string() }),
            ),
        };

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_prefers_server_message() {
        let err = ApiError::http(400, Some("Slot is closed".to_string()));
        assert_eq!(err.to_string(), "Slot is closed");
    }

    #[test]
    fn test_http_falls_back_to_status() {
        let err = ApiError::http(500, None);
        assert_eq!(err.to_string(), "Request failed with status code 500");

        let err = ApiError::http(502, Some("  ".to_string()));
        assert_eq!(err.to_string(), "Request failed with status code 502");
    }

    #[test]
    fn test_network_falls_back_to_generic() {
        assert_eq!(ApiError::network("").to_string(), "Request failed");
        assert_eq!(
            ApiError::network("connection refused").to_string(),
            "connection refused"
        );
    }

    #[test]
    fn test_capacity_conflict_detection() {
        assert!(ApiError::http(409, None).is_capacity_conflict());
        assert!(ApiError::http(400, Some("Only 2 spots remaining".to_string()))
            .is_capacity_conflict());
        assert!(ApiError::Backend("Group exceeds available spots".to_string())
            .is_capacity_conflict());
        assert!(!ApiError::http(500, None).is_capacity_conflict());
        assert!(!ApiError::Timeout.is_capacity_conflict());
    }

    #[test]
    fn test_not_found() {
        assert!(ApiError::http(404, None).is_not_found());
        assert!(!ApiError::Backend("Booking not found".to_string()).is_not_found());
    }
}
