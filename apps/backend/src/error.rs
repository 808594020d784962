//! Error handling for the backend API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rewards_core::{LedgerError, RedeemError, TransitionError, ValidationError};
use serde::Serialize;
use thiserror::Error;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid condition: {0}")]
    Validation(#[from] ValidationError),

    #[error("Redemption refused: {0}")]
    Redeem(#[from] RedeemError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Invalid status change: {0}")]
    Transition(#[from] TransitionError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Postgres SQLSTATE codes worth retrying.
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";

impl ApiError {
    /// Whether retrying the whole operation may succeed.
    ///
    /// Only connection-level and concurrency failures qualify; business rule
    /// failures are final.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Database(sqlx::Error::Io(_))
            | ApiError::Database(sqlx::Error::PoolTimedOut) => true,
            ApiError::Database(sqlx::Error::Database(db)) => matches!(
                db.code().as_deref(),
                Some(SERIALIZATION_FAILURE) | Some(DEADLOCK_DETECTED)
            ),
            _ => false,
        }
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            ApiError::Redeem(RedeemError::InvalidQuantity(_)) => {
                (StatusCode::BAD_REQUEST, "invalid_quantity")
            }
            ApiError::Redeem(e) => (StatusCode::CONFLICT, e.reason()),
            ApiError::Ledger(LedgerError::InsufficientPoints { .. }) => {
                (StatusCode::CONFLICT, "insufficient_points")
            }
            ApiError::Ledger(LedgerError::InvalidDelta { .. }) => {
                (StatusCode::BAD_REQUEST, "invalid_delta")
            }
            ApiError::Ledger(LedgerError::Overflow { .. }) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "balance_overflow")
            }
            ApiError::Ledger(LedgerError::Inconsistent { .. }) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "ledger_inconsistent")
            }
            ApiError::Transition(_) => (StatusCode::CONFLICT, "invalid_transition"),
            ApiError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            ApiError::Migration(_) => (StatusCode::INTERNAL_SERVER_ERROR, "migration_error"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status_and_code();

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message: self.to_string(),
        });

        (status, body).into_response()
    }
}

/// Result type alias for API operations
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_status() {
        let error = ApiError::Unauthorized("invalid token".to_string());
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_forbidden_status() {
        let error = ApiError::Forbidden("admin only".to_string());
        assert_eq!(error.into_response().status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_not_found_status() {
        let error = ApiError::NotFound("product".to_string());
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_conflict_and_overflow_status() {
        let error = ApiError::Conflict("session id taken".to_string());
        assert_eq!(error.status_and_code(), (StatusCode::CONFLICT, "conflict"));

        let error = ApiError::from(LedgerError::Overflow {
            balance: i64::MAX,
            delta: 1,
        });
        assert_eq!(
            error.status_and_code(),
            (StatusCode::UNPROCESSABLE_ENTITY, "balance_overflow")
        );
    }

    #[test]
    fn test_validation_error_status() {
        let error = ApiError::from(ValidationError::UnknownKind("moon_phase".to_string()));
        assert_eq!(error.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_redeem_errors_are_conflicts() {
        let error = ApiError::from(RedeemError::OutOfStock {
            available: 0,
            requested: 1,
        });
        assert_eq!(error.status_and_code(), (StatusCode::CONFLICT, "out_of_stock"));

        let error = ApiError::from(RedeemError::InsufficientPoints {
            balance: 120,
            required: 150,
        });
        assert_eq!(
            error.status_and_code(),
            (StatusCode::CONFLICT, "insufficient_points")
        );
    }

    #[test]
    fn test_invalid_quantity_is_bad_request() {
        let error = ApiError::from(RedeemError::InvalidQuantity(0));
        assert_eq!(error.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_transition_error_status() {
        let error = ApiError::from(TransitionError {
            from: "completed",
            to: "approved",
        });
        assert_eq!(error.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_internal_error_status() {
        let error = ApiError::Internal("unexpected error".to_string());
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_pool_timeout_is_transient() {
        assert!(ApiError::Database(sqlx::Error::PoolTimedOut).is_transient());
        assert!(!ApiError::Database(sqlx::Error::RowNotFound).is_transient());
    }

    #[test]
    fn test_business_errors_are_not_transient() {
        assert!(!ApiError::from(RedeemError::ProductInactive).is_transient());
        assert!(!ApiError::BadRequest("nope".to_string()).is_transient());
    }

    #[test]
    fn test_error_display_not_found() {
        let error = ApiError::NotFound("Product 123".to_string());
        assert_eq!(error.to_string(), "Not found: Product 123");
    }

    #[test]
    fn test_error_display_redeem() {
        let error = ApiError::from(RedeemError::ProductInactive);
        assert_eq!(error.to_string(), "Redemption refused: product is not active");
    }
}
