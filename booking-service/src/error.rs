//! Domain errors for the booking and payment core.

use service_core::error::AppError;
use thiserror::Error;

use crate::services::providers::PaymentError;
use crate::services::repository::StoreError;

pub const SLOT_UNAVAILABLE: &str = "Selected time is not available";

#[derive(Debug, Error)]
pub enum BookingError {
    /// Bad or missing input, unresolvable selection, unparsable date.
    #[error("{0}")]
    Validation(String),

    /// The slot (or listing) was taken between read and write.
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    /// Webhook authenticity check failed.
    #[error("{0}")]
    Security(String),

    #[error("{0}")]
    Configuration(String),

    #[error("storage failure: {0}")]
    Storage(anyhow::Error),
}

impl BookingError {
    pub fn validation(message: impl Into<String>) -> Self {
        BookingError::Validation(message.into())
    }

    pub fn slot_unavailable() -> Self {
        BookingError::Conflict(SLOT_UNAVAILABLE.to_string())
    }
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(key) => {
                BookingError::Conflict(format!("Duplicate record for {}", key))
            }
            StoreError::Backend(e) => BookingError::Storage(e),
        }
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::Validation(msg) | BookingError::Conflict(msg) => {
                AppError::BadRequest(anyhow::anyhow!(msg))
            }
            BookingError::NotFound(msg) => AppError::NotFound(anyhow::anyhow!(msg)),
            BookingError::Payment(e) => AppError::BadGateway(e.to_string()),
            BookingError::Security(msg) => AppError::Unauthorized(anyhow::anyhow!(msg)),
            BookingError::Configuration(msg) => AppError::ConfigError(anyhow::anyhow!(msg)),
            BookingError::Storage(e) => AppError::DatabaseError(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn conflict_is_a_bad_request_with_specific_message() {
        let app: AppError = BookingError::slot_unavailable().into();
        assert_eq!(app.status_code(), StatusCode::BAD_REQUEST);
        assert!(app.to_string().contains(SLOT_UNAVAILABLE));
    }

    #[test]
    fn status_mapping() {
        let cases: Vec<(BookingError, StatusCode)> = vec![
            (BookingError::validation("bad"), StatusCode::BAD_REQUEST),
            (
                BookingError::NotFound("Booking not found".into()),
                StatusCode::NOT_FOUND,
            ),
            (
                BookingError::Payment(PaymentError::Rejected("card_declined".into())),
                StatusCode::BAD_GATEWAY,
            ),
            (
                BookingError::Security("invalid signature".into()),
                StatusCode::UNAUTHORIZED,
            ),
            (
                BookingError::Configuration("webhook secret not configured".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                BookingError::Storage(anyhow::anyhow!("socket closed")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let app: AppError = err.into();
            assert_eq!(app.status_code(), expected);
        }
    }

    #[test]
    fn duplicate_store_error_becomes_conflict() {
        let err: BookingError = StoreError::Duplicate("scheduled_at".into()).into();
        assert!(matches!(err, BookingError::Conflict(_)));
    }
}
