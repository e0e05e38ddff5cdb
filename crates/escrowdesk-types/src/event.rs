//! Deal state-change notifications
//!
//! One event is emitted per accepted operation. Subscribers (the SSE
//! stream, tests) receive them in the order the ledger applied them for
//! any single deal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Amount, DealId, DealStatus, PartyId};

/// Events emitted by the deal ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DealEvent {
    /// A deal was created and its amount locked
    Funded {
        deal_id: DealId,
        buyer: PartyId,
        seller: PartyId,
        #[serde(with = "crate::amount::wei_string")]
        amount: Amount,
        deadline: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },

    /// The locked amount was paid to the seller
    Released {
        deal_id: DealId,
        seller: PartyId,
        #[serde(with = "crate::amount::wei_string")]
        amount: Amount,
        timestamp: DateTime<Utc>,
    },

    /// The locked amount was paid back to the buyer
    Refunded {
        deal_id: DealId,
        buyer: PartyId,
        #[serde(with = "crate::amount::wei_string")]
        amount: Amount,
        timestamp: DateTime<Utc>,
    },

    /// The deadline passed and was recorded
    Expired {
        deal_id: DealId,
        recorded_by: PartyId,
        timestamp: DateTime<Utc>,
    },
}

impl DealEvent {
    /// Deal this event belongs to
    pub fn deal_id(&self) -> DealId {
        match self {
            Self::Funded { deal_id, .. }
            | Self::Released { deal_id, .. }
            | Self::Refunded { deal_id, .. }
            | Self::Expired { deal_id, .. } => *deal_id,
        }
    }

    /// Status the deal is in after this event
    pub fn status(&self) -> DealStatus {
        match self {
            Self::Funded { .. } => DealStatus::Funded,
            Self::Released { .. } => DealStatus::Released,
            Self::Refunded { .. } => DealStatus::Refunded,
            Self::Expired { .. } => DealStatus::Expired,
        }
    }

    /// Short event name, used for SSE event types
    pub fn name(&self) -> &'static str {
        match self {
            Self::Funded { .. } => "funded",
            Self::Released { .. } => "released",
            Self::Refunded { .. } => "refunded",
            Self::Expired { .. } => "expired",
        }
    }

    /// Amount paid out by this event, if any
    pub fn payout(&self) -> Option<(PartyId, Amount)> {
        match self {
            Self::Released { seller, amount, .. } => Some((*seller, *amount)),
            Self::Refunded { buyer, amount, .. } => Some((*buyer, *amount)),
            Self::Funded { .. } | Self::Expired { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_tagging() {
        let event = DealEvent::Expired {
            deal_id: DealId(4),
            recorded_by: PartyId::from_bytes([9; 20]),
            timestamp: Utc::now(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "Expired");
        assert_eq!(json["deal_id"], 4);
        assert_eq!(event.name(), "expired");
        assert_eq!(event.status(), DealStatus::Expired);
        assert!(event.payout().is_none());
    }

    #[test]
    fn test_payout() {
        let seller = PartyId::from_bytes([2; 20]);
        let event = DealEvent::Released {
            deal_id: DealId(0),
            seller,
            amount: Amount(10),
            timestamp: Utc::now(),
        };
        assert_eq!(event.payout(), Some((seller, Amount(10))));
        assert_eq!(event.deal_id(), DealId(0));
    }

    #[test]
    fn test_amount_events_read_back() {
        let event = DealEvent::Funded {
            deal_id: DealId(2),
            buyer: PartyId::from_bytes([1; 20]),
            seller: PartyId::from_bytes([2; 20]),
            amount: Amount(300_000_000_000_000_000),
            deadline: Utc::now(),
            timestamp: Utc::now(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "Funded");
        assert_eq!(json["amount"], "300000000000000000");

        let back: DealEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);

        let refunded = DealEvent::Refunded {
            deal_id: DealId(2),
            buyer: PartyId::from_bytes([1; 20]),
            amount: Amount(u128::MAX),
            timestamp: Utc::now(),
        };
        let text = serde_json::to_string(&refunded).unwrap();
        assert_eq!(serde_json::from_str::<DealEvent>(&text).unwrap(), refunded);
    }
}
