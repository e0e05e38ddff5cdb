//! API error handling
//!
//! Every failure renders as `{code, error}` with a status derived from the
//! ledger's error taxonomy.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use escrowdesk_types::EscrowError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;

/// API error
#[derive(Debug, Error)]
pub enum ApiError {
    // =========================================================================
    // Request Errors
    // =========================================================================
    #[error("Invalid seller")]
    InvalidSeller,

    #[error("Invalid amount")]
    InvalidAmount,

    #[error("Invalid caller address: {0}")]
    InvalidCaller(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid request body: {0}")]
    InvalidRequestBody(String),

    // =========================================================================
    // Ledger Errors
    // =========================================================================
    #[error("{0}")]
    Escrow(#[from] EscrowError),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidSeller
            | Self::InvalidAmount
            | Self::InvalidCaller(_)
            | Self::InvalidParameter(_)
            | Self::InvalidRequestBody(_) => "INVALID_ARGUMENT",
            Self::Escrow(err) => err.error_code(),
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            Self::InvalidSeller
            | Self::InvalidAmount
            | Self::InvalidCaller(_)
            | Self::InvalidParameter(_)
            | Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,

            Self::Escrow(err) => match err {
                EscrowError::InvalidArgument { .. }
                | EscrowError::AmountOverflow
                | EscrowError::AmountUnderflow => StatusCode::BAD_REQUEST,
                EscrowError::Unauthorized { .. } => StatusCode::FORBIDDEN,
                EscrowError::NotFound { .. } => StatusCode::NOT_FOUND,
                EscrowError::InvalidState { .. } => StatusCode::CONFLICT,
                EscrowError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },

            // 500 Internal Server Error
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub error: String,
}

impl From<&ApiError> for ErrorResponse {
    fn from(err: &ApiError) -> Self {
        Self {
            code: err.error_code().to_string(),
            error: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), "{}", self);
        }
        (status, Json(ErrorResponse::from(&self))).into_response()
    }
}
