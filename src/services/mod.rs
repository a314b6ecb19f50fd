pub mod api;
pub mod booking;
pub mod booking_flow;
pub mod captcha;
pub mod schedule;
pub mod tracking_flow;
pub mod visitor;

use crate::errors::ApiError;

/// Replaces errors that carry no useful message for the visitor (malformed
/// or unexpected payloads) with an operation-specific one.
pub(crate) fn with_fallback(err: ApiError, fallback: &str) -> ApiError {
    match err {
        ApiError::Decode(detail) => {
            tracing::warn!(detail = %detail, "undecodable backend payload");
            ApiError::Unexpected(fallback.to_string())
        }
        ApiError::UnrecognizedEnvelope => ApiError::Unexpected(fallback.to_string()),
        other => other,
    }
}
