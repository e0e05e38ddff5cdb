//! Serializable ledger state
//!
//! A snapshot is only ever restored after [`LedgerSnapshot::validate`]
//! confirms that deal statuses and custody agree.

use chrono::{DateTime, Utc};
use escrowdesk_types::{Amount, Deal, DealId, EscrowError, Result, TYPES_VERSION};
use serde::{Deserialize, Serialize};

use crate::custody::CustodyBook;

/// Every deal plus the custody book at one instant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub version: String,
    pub taken_at: DateTime<Utc>,
    pub deals: Vec<Deal>,
    pub custody: CustodyBook,
}

impl LedgerSnapshot {
    pub fn new(deals: Vec<Deal>, custody: CustodyBook, taken_at: DateTime<Utc>) -> Self {
        Self {
            version: TYPES_VERSION.to_string(),
            taken_at,
            deals,
            custody,
        }
    }

    /// Check that the snapshot describes a reachable ledger state
    pub fn validate(&self) -> Result<()> {
        let mut expected_held = Amount::ZERO;

        for (index, deal) in self.deals.iter().enumerate() {
            if deal.id != DealId(index as u64) {
                return Err(corrupt(format!(
                    "deal at position {} has id {}",
                    index, deal.id
                )));
            }
            if !deal.amount.is_positive() {
                return Err(corrupt(format!("{} has a zero amount", deal.id)));
            }
            if deal.buyer == deal.seller {
                return Err(corrupt(format!("{} pays its own buyer", deal.id)));
            }
            if deal.deadline < deal.created_at {
                return Err(corrupt(format!("{} ends before it starts", deal.id)));
            }

            let held = self.custody.held(deal.id);
            let disbursed = self.custody.disbursed(deal.id);
            let consistent = if deal.status.holds_funds() {
                held == deal.amount && disbursed.is_zero()
            } else {
                held.is_zero() && disbursed == deal.amount
            };
            if !consistent {
                return Err(corrupt(format!(
                    "{} is {} but custody holds {} and paid {}",
                    deal.id, deal.status, held, disbursed
                )));
            }

            if deal.status.holds_funds() {
                expected_held = expected_held.checked_add(deal.amount)?;
            }
        }

        // Catches holds for deals that are not in the list.
        if self.custody.total_held()? != expected_held {
            return Err(corrupt("custody holds funds for unknown deals"));
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| EscrowError::internal(format!("snapshot encoding failed: {}", e)))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| EscrowError::invalid_argument("snapshot", e.to_string()))
    }
}

fn corrupt(reason: impl Into<String>) -> EscrowError {
    EscrowError::invalid_argument("snapshot", reason)
}
