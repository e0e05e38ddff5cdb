//! Custody book - ledger-held funds per deal
//!
//! The book is:
//! - Deal-scoped (one hold per deal, created with the deal)
//! - Account-keyed by PartyId for payouts
//! - Immutable (entries are append-only)
//!
//! # Invariants
//!
//! 1. A hold is created once and disbursed at most once, in full
//! 2. Payout balances only ever grow
//! 3. Every entry names the deal it belongs to

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use escrowdesk_types::{Amount, DealId, EscrowError, PartyId, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a custody entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(pub String);

impl EntryId {
    pub fn new() -> Self {
        Self(format!("entry_{}", Uuid::new_v4()))
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

/// Direction of a custody entry, from the named party's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryType {
    /// Funds handed to the ledger
    Debit,
    /// Funds paid out by the ledger
    Credit,
}

/// Reason for a custody entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryReason {
    /// Buyer funds locked at deal creation
    Lock,
    /// Locked funds paid to the seller
    Release,
    /// Locked funds paid back to the buyer
    Refund,
}

/// A single custody movement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustodyEntry {
    pub entry_id: EntryId,
    pub deal_id: DealId,
    pub party: PartyId,
    pub entry_type: EntryType,
    pub amount: Amount,
    pub reason: EntryReason,
    pub created_at: DateTime<Utc>,
}

/// Funds held on behalf of deals, plus what has been paid out
///
/// Buyer deposits arrive with deal creation and are not drawn from a
/// ledger account, so `balance` only reflects payouts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustodyBook {
    holds: BTreeMap<DealId, Amount>,
    disbursed: BTreeMap<DealId, Amount>,
    balances: BTreeMap<PartyId, Amount>,
    entries: Vec<CustodyEntry>,
}

impl CustodyBook {
    /// Create an empty book
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock `amount` for `deal_id`, funded by `buyer`
    pub fn hold(
        &mut self,
        deal_id: DealId,
        buyer: PartyId,
        amount: Amount,
        at: DateTime<Utc>,
    ) -> Result<EntryId> {
        if !amount.is_positive() {
            return Err(EscrowError::invalid_argument(
                "amount",
                "held amount must be greater than zero",
            ));
        }
        if self.holds.contains_key(&deal_id) || self.disbursed.contains_key(&deal_id) {
            return Err(EscrowError::internal(format!(
                "custody already opened for {}",
                deal_id
            )));
        }

        self.holds.insert(deal_id, amount);
        Ok(self.record(deal_id, buyer, EntryType::Debit, amount, EntryReason::Lock, at))
    }

    /// Pay the whole hold of `deal_id` to `to`
    ///
    /// Returns the amount paid. Fails without touching the book if the
    /// deal holds nothing or was already paid out.
    pub fn disburse(
        &mut self,
        deal_id: DealId,
        to: PartyId,
        reason: EntryReason,
        at: DateTime<Utc>,
    ) -> Result<Amount> {
        if reason == EntryReason::Lock {
            return Err(EscrowError::internal("a lock is not a payout"));
        }
        if self.disbursed.contains_key(&deal_id) {
            return Err(EscrowError::internal(format!(
                "{} was already disbursed",
                deal_id
            )));
        }
        let amount = *self.holds.get(&deal_id).ok_or_else(|| {
            EscrowError::internal(format!("no funds held for {}", deal_id))
        })?;
        let new_balance = self.balance(&to).checked_add(amount)?;

        self.holds.remove(&deal_id);
        self.disbursed.insert(deal_id, amount);
        self.balances.insert(to, new_balance);
        self.record(deal_id, to, EntryType::Credit, amount, reason, at);

        Ok(amount)
    }

    fn record(
        &mut self,
        deal_id: DealId,
        party: PartyId,
        entry_type: EntryType,
        amount: Amount,
        reason: EntryReason,
        created_at: DateTime<Utc>,
    ) -> EntryId {
        let entry = CustodyEntry {
            entry_id: EntryId::new(),
            deal_id,
            party,
            entry_type,
            amount,
            reason,
            created_at,
        };
        let entry_id = entry.entry_id.clone();
        self.entries.push(entry);
        entry_id
    }

    /// Total paid out to `party`
    pub fn balance(&self, party: &PartyId) -> Amount {
        self.balances.get(party).copied().unwrap_or(Amount::ZERO)
    }

    /// Amount currently held for `deal_id`
    pub fn held(&self, deal_id: DealId) -> Amount {
        self.holds.get(&deal_id).copied().unwrap_or(Amount::ZERO)
    }

    /// Amount paid out of `deal_id`'s hold
    pub fn disbursed(&self, deal_id: DealId) -> Amount {
        self.disbursed.get(&deal_id).copied().unwrap_or(Amount::ZERO)
    }

    /// Sum of every open hold
    pub fn total_held(&self) -> Result<Amount> {
        self.holds
            .values()
            .try_fold(Amount::ZERO, |acc, amount| acc.checked_add(*amount))
    }

    /// All entries, oldest first
    pub fn entries(&self) -> &[CustodyEntry] {
        &self.entries
    }

    /// Entries belonging to one deal, oldest first
    pub fn deal_entries(&self, deal_id: DealId) -> Vec<CustodyEntry> {
        self.entries
            .iter()
            .filter(|e| e.deal_id == deal_id)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn party(byte: u8) -> PartyId {
        PartyId::from_bytes([byte; 20])
    }

    #[test]
    fn test_hold_and_release() {
        let mut book = CustodyBook::new();
        let (buyer, seller) = (party(1), party(2));
        let deal = DealId(0);

        book.hold(deal, buyer, Amount(100), Utc::now()).unwrap();
        assert_eq!(book.held(deal), Amount(100));
        assert_eq!(book.total_held().unwrap(), Amount(100));

        let paid = book
            .disburse(deal, seller, EntryReason::Release, Utc::now())
            .unwrap();
        assert_eq!(paid, Amount(100));
        assert_eq!(book.balance(&seller), Amount(100));
        assert_eq!(book.balance(&buyer), Amount::ZERO);
        assert_eq!(book.held(deal), Amount::ZERO);
        assert_eq!(book.disbursed(deal), Amount(100));
        assert_eq!(book.total_held().unwrap(), Amount::ZERO);
    }

    #[test]
    fn test_no_double_disbursement() {
        let mut book = CustodyBook::new();
        let deal = DealId(0);
        book.hold(deal, party(1), Amount(50), Utc::now()).unwrap();
        book.disburse(deal, party(1), EntryReason::Refund, Utc::now())
            .unwrap();

        let before = book.clone();
        let err = book
            .disburse(deal, party(2), EntryReason::Release, Utc::now())
            .unwrap_err();
        assert!(matches!(err, EscrowError::Internal { .. }));
        assert_eq!(book, before);
    }

    #[test]
    fn test_hold_rejects_zero_and_duplicates() {
        let mut book = CustodyBook::new();
        assert!(book.hold(DealId(0), party(1), Amount::ZERO, Utc::now()).is_err());

        book.hold(DealId(0), party(1), Amount(1), Utc::now()).unwrap();
        assert!(matches!(
            book.hold(DealId(0), party(1), Amount(1), Utc::now()),
            Err(EscrowError::Internal { .. })
        ));
    }

    #[test]
    fn test_entry_tracking() {
        let mut book = CustodyBook::new();
        let (buyer, seller) = (party(1), party(2));

        book.hold(DealId(0), buyer, Amount(10), Utc::now()).unwrap();
        book.hold(DealId(1), buyer, Amount(20), Utc::now()).unwrap();
        book.disburse(DealId(1), seller, EntryReason::Release, Utc::now())
            .unwrap();

        assert_eq!(book.entries().len(), 3);
        let deal_one = book.deal_entries(DealId(1));
        assert_eq!(deal_one.len(), 2);
        assert_eq!(deal_one[0].reason, EntryReason::Lock);
        assert_eq!(deal_one[0].entry_type, EntryType::Debit);
        assert_eq!(deal_one[1].reason, EntryReason::Release);
        assert_eq!(deal_one[1].party, seller);
    }

    #[test]
    fn test_lock_is_not_a_payout() {
        let mut book = CustodyBook::new();
        book.hold(DealId(0), party(1), Amount(10), Utc::now()).unwrap();
        assert!(book
            .disburse(DealId(0), party(1), EntryReason::Lock, Utc::now())
            .is_err());
        assert_eq!(book.held(DealId(0)), Amount(10));
    }
}
