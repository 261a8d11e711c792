//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use gym_core::BookingError;
use gym_store::StoreError;
use serde::Serialize;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Bad request - malformed path, query, or body.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A booking-engine rule rejected the request.
    #[error(transparent)]
    Rejected(#[from] BookingError),

    /// A row lock could not be taken in time. Safe to retry.
    #[error("busy: {0}")]
    Busy(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

/// Status, code, and details for a rejection.
fn rejection_parts(err: &BookingError) -> (StatusCode, &'static str, Option<serde_json::Value>) {
    match err {
        BookingError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            "not_found",
            Some(serde_json::json!({ "entity": entity, "id": id })),
        ),
        BookingError::CapacityExceeded { capacity, .. } => (
            StatusCode::CONFLICT,
            "capacity_exceeded",
            Some(serde_json::json!({ "capacity": capacity })),
        ),
        BookingError::InsufficientCredit { balance, required } => (
            StatusCode::PAYMENT_REQUIRED,
            "insufficient_credit",
            Some(serde_json::json!({
                "balance": balance,
                "required": required
            })),
        ),
        BookingError::DuplicateBooking { .. } => (StatusCode::CONFLICT, "duplicate_booking", None),
        BookingError::CancellationTooLate {
            starts_at,
            cutoff_hours,
        } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "cancellation_too_late",
            Some(serde_json::json!({
                "starts_at": starts_at,
                "cutoff_hours": cutoff_hours
            })),
        ),
        BookingError::Unauthorized => (StatusCode::FORBIDDEN, "forbidden", None),
        BookingError::OccurrenceStarted { starts_at, .. } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "occurrence_started",
            Some(serde_json::json!({ "starts_at": starts_at })),
        ),
        BookingError::TemplateInUse { bookings, .. } => (
            StatusCode::CONFLICT,
            "template_in_use",
            Some(serde_json::json!({ "bookings": bookings })),
        ),
        BookingError::InvalidTimezone(_) => (StatusCode::BAD_REQUEST, "invalid_timezone", None),
        BookingError::InvalidRange(_) => (StatusCode::BAD_REQUEST, "invalid_range", None),
        BookingError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid_input", None),
        BookingError::InvalidId(_) => (StatusCode::BAD_REQUEST, "invalid_id", None),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
                None,
            ),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::Rejected(err) => {
                let (status, code, details) = rejection_parts(err);
                (status, code, err.to_string(), details)
            }
            Self::Busy(msg) => {
                tracing::warn!(error = %msg, "Lock wait exceeded");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "busy",
                    "The resource is busy, retry shortly".to_string(),
                    None,
                )
            }
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Rejected(rejection) => Self::Rejected(rejection),
            StoreError::Busy(msg) => Self::Busy(msg),
            StoreError::Database(msg) | StoreError::Serialization(msg) => Self::Internal(msg),
        }
    }
}

impl From<gym_core::IdError> for ApiError {
    fn from(err: gym_core::IdError) -> Self {
        Self::Rejected(BookingError::InvalidId(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: BookingError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn rejections_map_to_statuses() {
        assert_eq!(
            status_of(BookingError::not_found("occurrence", "x")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(BookingError::InsufficientCredit {
                balance: 0,
                required: 1
            }),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            status_of(BookingError::CapacityExceeded {
                occurrence_id: "x".into(),
                capacity: 3
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(status_of(BookingError::Unauthorized), StatusCode::FORBIDDEN);
        assert_eq!(
            status_of(BookingError::InvalidRange("days".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn store_failures_hide_details() {
        let response = ApiError::from(StoreError::Database("disk on fire".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = ApiError::from(StoreError::Busy("lock".into())).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
