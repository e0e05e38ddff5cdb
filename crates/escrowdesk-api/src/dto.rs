//! Request and response bodies
//!
//! Amounts cross the wire as decimal ETH strings alongside the exact wei
//! count, so no client has to round-trip through floating point.

use chrono::{DateTime, Utc};
use escrowdesk_assistant::ChatReply;
use escrowdesk_types::{Amount, Deal, DealId};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};

/// Timeout applied when a lock request gives none (or zero)
pub const DEFAULT_TIMEOUT_SECS: u64 = 3600;

/// Default and maximum page size for deal listings
pub const DEFAULT_PAGE_LIMIT: usize = 50;
pub const MAX_PAGE_LIMIT: usize = 200;

// =============================================================================
// Inputs
// =============================================================================

/// A JSON value that may be sent as a number or a string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NumberOrString {
    Number(serde_json::Number),
    Text(String),
}

impl NumberOrString {
    fn as_text(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.trim().to_string(),
        }
    }
}

/// Parse a deal reference: `3` or `deal_3`
pub fn parse_deal_id(text: &str) -> ApiResult<DealId> {
    let digits = text.trim();
    let digits = digits.strip_prefix("deal_").unwrap_or(digits);
    digits
        .parse::<u64>()
        .map(DealId)
        .map_err(|_| ApiError::InvalidParameter(format!("invalid deal id '{}'", text)))
}

/// `POST /api/escrow/lock`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockRequest {
    #[serde(default)]
    pub seller: Option<String>,
    #[serde(default)]
    pub amount_eth: Option<NumberOrString>,
    #[serde(default)]
    pub timeout_secs: Option<NumberOrString>,
}

impl LockRequest {
    /// Amount in base units; anything not strictly positive is invalid
    pub fn amount(&self) -> ApiResult<Amount> {
        self.amount_eth
            .as_ref()
            .and_then(|a| Amount::parse_decimal(&a.as_text()).ok())
            .filter(Amount::is_positive)
            .ok_or(ApiError::InvalidAmount)
    }

    /// Timeout in seconds, defaulting when missing, zero or unparseable
    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
            .as_ref()
            .and_then(|t| t.as_text().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS)
    }
}

/// `POST /api/escrow/{release,refund,expire}`
#[derive(Debug, Clone, Deserialize)]
pub struct SettleRequest {
    pub id: NumberOrString,
}

impl SettleRequest {
    pub fn deal_id(&self) -> ApiResult<DealId> {
        parse_deal_id(&self.id.as_text())
    }
}

/// `GET /api/escrow` query string
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

impl ListQuery {
    pub fn offset(&self) -> usize {
        self.offset.unwrap_or(0)
    }

    pub fn limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_PAGE_LIMIT)
            .min(MAX_PAGE_LIMIT)
    }
}

/// `GET /api/events` query string
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventsQuery {
    /// Only stream events for this deal
    pub deal: Option<String>,
}

/// `POST /api/chat`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: serde_json::Value,
}

impl ChatRequest {
    pub fn text(&self) -> String {
        match &self.message {
            serde_json::Value::Null => String::new(),
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

// =============================================================================
// Outputs
// =============================================================================

/// A deal as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealView {
    pub id: u64,
    pub buyer: String,
    pub seller: String,
    pub amount_eth: String,
    pub amount_wei: String,
    pub created_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub status: String,
    pub status_code: u8,
}

impl From<&Deal> for DealView {
    fn from(deal: &Deal) -> Self {
        Self {
            id: deal.id.value(),
            buyer: deal.buyer.to_string(),
            seller: deal.seller.to_string(),
            amount_eth: deal.amount.to_string(),
            amount_wei: deal.amount.base_units().to_string(),
            created_at: deal.created_at,
            deadline: deal.deadline,
            status: deal.status.as_str().to_string(),
            status_code: deal.status.code(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockResponse {
    pub id: u64,
    pub deadline: DateTime<Utc>,
    pub deal: DealView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealListResponse {
    pub count: u64,
    pub offset: usize,
    pub limit: usize,
    pub deals: Vec<DealView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub address: String,
    pub balance_eth: String,
    pub balance_wei: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotsView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seller: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_eth: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
    pub intent: String,
    pub slots: SlotsView,
}

impl From<ChatReply> for ChatResponse {
    fn from(reply: ChatReply) -> Self {
        Self {
            reply: reply.reply,
            intent: reply.intent,
            slots: SlotsView {
                seller: reply.slots.seller.map(|s| s.to_string()),
                amount_eth: reply.slots.amount.map(|a| a.to_string()),
            },
        }
    }
}
