use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

/// Failure taxonomy shared by all four services. Every handler returns one
/// of these and the single `IntoResponse` impl below translates it to the
/// wire format, so no handler builds its own error JSON.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing or invalid credentials")]
    Unauthorized,
    #[error("operation not permitted for this role")]
    RoleViolation,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("listing is no longer available")]
    ListingUnavailable,
    #[error("payment could not be completed")]
    PaymentFailed,
    #[error("insufficient funds")]
    InsufficientFunds,
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    Conflict(&'static str),
    #[error("database error")]
    Database(#[from] sqlx::Error),
    #[error("downstream service call failed")]
    Downstream(#[from] reqwest::Error),
    #[error("internal error")]
    Internal,
}

impl ApiError {
    /// Named status carried in the response body.
    pub fn status_name(&self) -> &'static str {
        match self {
            ApiError::Unauthorized => "UNAUTHORIZED",
            ApiError::RoleViolation => "ROLE_VIOLATION",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::ListingUnavailable => "LISTING_UNAVAILABLE",
            ApiError::PaymentFailed => "PAYMENT_FAILED",
            ApiError::InsufficientFunds => "INSUFFICIENT_FUNDS",
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::Database(_) | ApiError::Downstream(_) | ApiError::Internal => {
                "INTERNAL_ERROR"
            }
        }
    }

    fn http_status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::RoleViolation => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) | ApiError::ListingUnavailable => StatusCode::NOT_FOUND,
            ApiError::PaymentFailed | ApiError::InsufficientFunds => StatusCode::PAYMENT_REQUIRED,
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Database(_) | ApiError::Downstream(_) | ApiError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Database(e) => tracing::error!("database error: {:?}", e),
            ApiError::Downstream(e) => tracing::error!("downstream call failed: {:?}", e),
            _ => {}
        }

        let body = Json(json!({
            "status": self.status_name(),
            "error": self.to_string(),
        }));
        (self.http_status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downstream_failures_map_to_internal_error() {
        assert_eq!(ApiError::Internal.status_name(), "INTERNAL_ERROR");
        assert_eq!(ApiError::Internal.http_status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn saga_statuses_keep_their_names() {
        assert_eq!(ApiError::Unauthorized.status_name(), "UNAUTHORIZED");
        assert_eq!(ApiError::RoleViolation.status_name(), "ROLE_VIOLATION");
        assert_eq!(ApiError::ListingUnavailable.status_name(), "LISTING_UNAVAILABLE");
        assert_eq!(ApiError::PaymentFailed.status_name(), "PAYMENT_FAILED");
    }
}
