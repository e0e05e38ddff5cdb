//! Shared assistant types

use std::fmt;
use std::str::FromStr;

use escrowdesk_types::{Amount, PartyId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reply used whenever nothing more specific applies
pub const GREETING: &str = "I can help you book a service. Try 'Haircut tomorrow 2pm'.";

/// Reply once a service and a date have been mentioned
pub const ASK_DETAILS: &str =
    "Great! Please share your location, seller wallet address (0x...), and preferred time.";

/// Reply once a seller address has been shared
pub const ASK_AMOUNT: &str = "Got the seller address. Enter amount in ETH and press Lock Payment.";

/// Intent reported for every reply
pub const BOOKING_INTENT: &str = "booking";

/// Assistant errors
#[derive(Debug, Clone, Error)]
pub enum AssistantError {
    #[error("Request failed: {message}")]
    RequestFailed { message: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Network error: {message}")]
    NetworkError { message: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },
}

impl AssistantError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::RequestFailed { .. } => "ASSISTANT_REQUEST_FAILED",
            Self::InvalidResponse { .. } => "ASSISTANT_INVALID_RESPONSE",
            Self::NetworkError { .. } => "ASSISTANT_NETWORK_ERROR",
            Self::ConfigurationError { .. } => "ASSISTANT_CONFIGURATION_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, AssistantError>;

/// How replies are produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssistantMode {
    /// Keyword heuristics, no network
    #[default]
    Mock,
    /// OpenAI chat completions
    Live,
}

impl AssistantMode {
    /// Read `USE_AI` (`mock` unless set to `live`)
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        std::env::var("USE_AI")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }
}

impl FromStr for AssistantMode {
    type Err = AssistantError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "live" => Ok(Self::Live),
            other => Err(AssistantError::ConfigurationError {
                message: format!("unknown assistant mode '{}'", other),
            }),
        }
    }
}

impl fmt::Display for AssistantMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mock => write!(f, "mock"),
            Self::Live => write!(f, "live"),
        }
    }
}

/// Booking details recognised in a message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingSlots {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seller: Option<PartyId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Amount>,
}

impl BookingSlots {
    pub fn is_empty(&self) -> bool {
        self.seller.is_none() && self.amount.is_none()
    }
}

/// Response to one chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
    pub intent: String,
    pub slots: BookingSlots,
}

impl ChatReply {
    pub fn booking(reply: impl Into<String>, slots: BookingSlots) -> Self {
        Self {
            reply: reply.into(),
            intent: BOOKING_INTENT.to_string(),
            slots,
        }
    }

    pub fn greeting() -> Self {
        Self::booking(GREETING, BookingSlots::default())
    }
}
