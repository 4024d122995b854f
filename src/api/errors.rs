//! API error handling.
//!
//! Structured error responses with proper HTTP status codes and
//! request tracking. Domain errors carry their own machine codes;
//! internal failures are logged and masked.

use crate::errors::CasinoError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Top-level API error response with request tracking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub request_id: String,
    pub error: ErrorBody,
}

/// Error body with structured information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable code (INVALID_BET, INSUFFICIENT_FUNDS, ...)
    pub code: String,
    /// Human-readable error message
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// A domain error bound to the request that triggered it.
#[derive(Debug)]
pub struct ApiError {
    pub error: CasinoError,
    pub request_id: String,
}

impl ApiError {
    pub fn new(request_id: String, error: CasinoError) -> Self {
        Self { error, request_id }
    }
}

fn status_for(error: &CasinoError) -> StatusCode {
    match error {
        CasinoError::InvalidBet(_)
        | CasinoError::InvalidAmount(_)
        | CasinoError::InvalidRequest(_)
        | CasinoError::InsufficientFunds { .. } => StatusCode::BAD_REQUEST,
        CasinoError::UserNotFound(_)
        | CasinoError::WalletNotFound(_)
        | CasinoError::GameNotFound(_) => StatusCode::NOT_FOUND,
        CasinoError::Conflict(_) => StatusCode::CONFLICT,
        CasinoError::LedgerViolation(_)
        | CasinoError::Storage(_)
        | CasinoError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.error);
        let code = self.error.code().to_string();

        // Internal failures get logged with the real cause and masked
        // on the wire.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(
                request_id = %self.request_id,
                error = %self.error,
                "internal error while handling request"
            );
            "internal error".to_string()
        } else {
            self.error.to_string()
        };

        let body = Json(ErrorResponse {
            request_id: self.request_id,
            error: ErrorBody {
                code,
                message,
                details: None,
            },
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::Amount;
    use uuid::Uuid;

    #[test]
    fn statuses_match_the_taxonomy() {
        assert_eq!(
            status_for(&CasinoError::InvalidBet("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&CasinoError::InsufficientFunds {
                requested: Amount::ZERO,
                available: Amount::ZERO,
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&CasinoError::GameNotFound(Uuid::new_v4())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&CasinoError::Conflict("x".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&CasinoError::LedgerViolation("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
