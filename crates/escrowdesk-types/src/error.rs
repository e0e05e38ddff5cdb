//! Error types for EscrowDesk
//!
//! Every rejection is synchronous and leaves the deal and its locked funds
//! untouched.

use thiserror::Error;

use crate::{DealId, DealStatus, PartyId};

/// Result type for EscrowDesk operations
pub type Result<T> = std::result::Result<T, EscrowError>;

/// EscrowDesk error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EscrowError {
    // ========================================================================
    // Request Errors
    // ========================================================================

    /// Bad amount, address, or timeout
    #[error("Invalid argument: {field} - {reason}")]
    InvalidArgument { field: String, reason: String },

    /// Unknown deal ID
    #[error("Deal {deal_id} not found")]
    NotFound { deal_id: DealId },

    // ========================================================================
    // Transition Errors
    // ========================================================================

    /// Caller is not permitted to perform the transition now
    #[error("Unauthorized: {caller} on {deal_id} - {reason}")]
    Unauthorized {
        deal_id: DealId,
        caller: PartyId,
        reason: String,
    },

    /// Transition is not allowed from the current state
    #[error("Invalid state: {deal_id} is {status} - {reason}")]
    InvalidState {
        deal_id: DealId,
        status: DealStatus,
        reason: String,
    },

    // ========================================================================
    // Amount Errors
    // ========================================================================

    /// Amount overflow during arithmetic
    #[error("Amount overflow during arithmetic operation")]
    AmountOverflow,

    /// Amount underflow during arithmetic
    #[error("Amount underflow during arithmetic operation")]
    AmountUnderflow,

    // ========================================================================
    // General Errors
    // ========================================================================

    /// Broken custody bookkeeping; never caused by caller input
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl EscrowError {
    /// Create an invalid argument error
    pub fn invalid_argument(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get an error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidArgument { .. } => "INVALID_ARGUMENT",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Unauthorized { .. } => "UNAUTHORIZED",
            Self::InvalidState { .. } => "INVALID_STATE",
            Self::AmountOverflow => "AMOUNT_OVERFLOW",
            Self::AmountUnderflow => "AMOUNT_UNDERFLOW",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}
