//! Deal types for EscrowDesk
//!
//! A deal locks a fixed amount from a buyer for a seller until one party
//! settles it. Funds never move directly between the parties; the ledger
//! holds them until a terminal transition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Amount, DealId, PartyId};

/// State of a deal
///
/// The implicit "created" slot of the original contract is never
/// observable: funding happens atomically at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealStatus {
    /// Funds are locked; no party has settled yet
    Funded,
    /// Funds paid to the seller
    Released,
    /// Funds paid back to the buyer
    Refunded,
    /// Deadline passed and was recorded; only the buyer may now refund
    Expired,
}

impl DealStatus {
    /// Check if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Released | Self::Refunded)
    }

    /// Check if the deal amount is still held by the ledger
    pub fn holds_funds(&self) -> bool {
        matches!(self, Self::Funded | Self::Expired)
    }

    /// Numeric status code (0 is reserved for the implicit created state)
    pub fn code(&self) -> u8 {
        match self {
            Self::Funded => 1,
            Self::Released => 2,
            Self::Refunded => 3,
            Self::Expired => 4,
        }
    }

    /// Lower-case name used in logs and API payloads
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Funded => "funded",
            Self::Released => "released",
            Self::Refunded => "refunded",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for DealStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single escrow deal between a buyer and a seller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deal {
    /// Sequential deal ID
    pub id: DealId,
    /// Party that locked the funds
    pub buyer: PartyId,
    /// Party paid on release
    pub seller: PartyId,
    /// Locked amount, fixed at creation
    pub amount: Amount,
    /// When the deal was created
    pub created_at: DateTime<Utc>,
    /// Absolute expiry instant (creation time + timeout)
    pub deadline: DateTime<Utc>,
    /// Current state
    pub status: DealStatus,
}

impl Deal {
    /// Whether `party` is the buyer or the seller
    pub fn is_party(&self, party: &PartyId) -> bool {
        &self.buyer == party || &self.seller == party
    }

    /// Whether the deadline has been reached at `now`
    pub fn deadline_reached(&self, now: DateTime<Utc>) -> bool {
        now >= self.deadline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn party(byte: u8) -> PartyId {
        PartyId::from_bytes([byte; 20])
    }

    #[test]
    fn test_deal_status() {
        assert!(!DealStatus::Funded.is_terminal());
        assert!(!DealStatus::Expired.is_terminal());
        assert!(DealStatus::Released.is_terminal());
        assert!(DealStatus::Refunded.is_terminal());

        assert!(DealStatus::Funded.holds_funds());
        assert!(DealStatus::Expired.holds_funds());
        assert!(!DealStatus::Released.holds_funds());

        assert_eq!(DealStatus::Funded.code(), 1);
        assert_eq!(DealStatus::Expired.code(), 4);
        assert_eq!(serde_json::to_string(&DealStatus::Refunded).unwrap(), "\"refunded\"");
    }

    #[test]
    fn test_deal_parties_and_deadline() {
        let created_at = Utc::now();
        let deal = Deal {
            id: DealId(0),
            buyer: party(1),
            seller: party(2),
            amount: Amount::parse_decimal("1.0").unwrap(),
            created_at,
            deadline: created_at + Duration::seconds(60),
            status: DealStatus::Funded,
        };

        assert!(deal.is_party(&party(1)));
        assert!(deal.is_party(&party(2)));
        assert!(!deal.is_party(&party(3)));

        assert!(!deal.deadline_reached(created_at + Duration::seconds(59)));
        assert!(deal.deadline_reached(created_at + Duration::seconds(60)));
    }
}
