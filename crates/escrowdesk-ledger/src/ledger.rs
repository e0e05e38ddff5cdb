//! The deal ledger
//!
//! Deals live in an append-only list of individually locked records. A
//! transition locks only its own deal, reads the clock once, consults the
//! transition table and then applies status and custody changes together.
//! Lock order is always deal record, then custody book.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use escrowdesk_types::{Amount, Deal, DealEvent, DealId, DealStatus, EscrowError, PartyId, Result};
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;

use crate::clock::{Clock, SystemClock};
use crate::custody::{CustodyBook, CustodyEntry, EntryReason};
use crate::snapshot::LedgerSnapshot;
use crate::transition::{self, Operation, Payee, Role, Verdict};

/// Default capacity of the event broadcast channel
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Collection of independent two-party escrow deals
pub struct DealLedger {
    /// Deal records, indexed by `DealId`
    deals: RwLock<Vec<Arc<Mutex<Deal>>>>,
    /// Funds held on behalf of deals
    custody: Mutex<CustodyBook>,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<DealEvent>,
}

impl DealLedger {
    /// Create an empty ledger on wall-clock time
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty ledger driven by `clock`
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let (events, _) = broadcast::channel(DEFAULT_EVENT_CAPACITY);
        Self {
            deals: RwLock::new(Vec::new()),
            custody: Mutex::new(CustodyBook::new()),
            clock,
            events,
        }
    }

    /// Rebuild a ledger from a validated snapshot
    pub fn from_snapshot(snapshot: LedgerSnapshot, clock: Arc<dyn Clock>) -> Result<Self> {
        snapshot.validate()?;
        let ledger = Self::with_clock(clock);
        {
            let mut deals = ledger.deals.write();
            deals.extend(
                snapshot
                    .deals
                    .into_iter()
                    .map(|deal| Arc::new(Mutex::new(deal))),
            );
        }
        *ledger.custody.lock() = snapshot.custody;

        tracing::info!(deals = ledger.deal_count(), "Ledger restored from snapshot");
        Ok(ledger)
    }

    /// Subscribe to state-change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<DealEvent> {
        self.events.subscribe()
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Open a deal: lock `amount` from `buyer` for `seller` until
    /// `timeout_secs` from now
    pub fn create(
        &self,
        buyer: PartyId,
        seller: PartyId,
        timeout_secs: u64,
        amount: Amount,
    ) -> Result<DealId> {
        if !amount.is_positive() {
            return Err(EscrowError::invalid_argument(
                "amount",
                "amount must be greater than zero",
            ));
        }
        if buyer.is_zero() {
            return Err(EscrowError::invalid_argument("buyer", "zero address"));
        }
        if seller.is_zero() {
            return Err(EscrowError::invalid_argument("seller", "zero address"));
        }
        if seller == buyer {
            return Err(EscrowError::invalid_argument(
                "seller",
                "seller must differ from buyer",
            ));
        }
        let timeout = timeout_duration(timeout_secs)?;

        let mut deals = self.deals.write();
        let now = self.clock.now();
        let deadline = now.checked_add_signed(timeout).ok_or_else(|| {
            EscrowError::invalid_argument("timeout", "deadline out of range")
        })?;

        let id = DealId(deals.len() as u64);
        self.custody.lock().hold(id, buyer, amount, now)?;

        let deal = Deal {
            id,
            buyer,
            seller,
            amount,
            created_at: now,
            deadline,
            status: DealStatus::Funded,
        };
        deals.push(Arc::new(Mutex::new(deal)));

        tracing::info!(
            deal_id = %id,
            buyer = %buyer,
            seller = %seller,
            amount = %amount,
            deadline = %deadline,
            "Deal funded"
        );
        self.publish(DealEvent::Funded {
            deal_id: id,
            buyer,
            seller,
            amount,
            deadline,
            timestamp: now,
        });

        Ok(id)
    }

    /// Pay the locked amount to the seller. Buyer only.
    pub fn release_to_seller(&self, deal_id: DealId, caller: PartyId) -> Result<Deal> {
        self.transition(deal_id, caller, Operation::Release)
    }

    /// Pay the locked amount back to the buyer
    ///
    /// Before the deadline either party may cancel; afterwards only the
    /// buyer may claim.
    pub fn refund_to_buyer(&self, deal_id: DealId, caller: PartyId) -> Result<Deal> {
        self.transition(deal_id, caller, Operation::Refund)
    }

    /// Record that the deadline has passed. Moves no funds.
    pub fn expire(&self, deal_id: DealId, caller: PartyId) -> Result<Deal> {
        self.transition(deal_id, caller, Operation::Expire)
    }

    fn transition(&self, deal_id: DealId, caller: PartyId, operation: Operation) -> Result<Deal> {
        let record = self.record(deal_id)?;
        let mut deal = record.lock();
        let now = self.clock.now();
        let role = Role::of(&caller, &deal);

        let (next, payout) =
            match transition::evaluate(deal.status, operation, role, deal.deadline_reached(now)) {
                Verdict::Allowed { next, payout } => (next, payout),
                Verdict::Unauthorized { reason } => {
                    tracing::debug!(
                        deal_id = %deal_id,
                        caller = %caller,
                        operation = %operation,
                        reason,
                        "Transition rejected: unauthorized"
                    );
                    return Err(EscrowError::Unauthorized {
                        deal_id,
                        caller,
                        reason: reason.to_string(),
                    });
                }
                Verdict::InvalidState { reason } => {
                    tracing::debug!(
                        deal_id = %deal_id,
                        status = %deal.status,
                        operation = %operation,
                        reason,
                        "Transition rejected: invalid state"
                    );
                    return Err(EscrowError::InvalidState {
                        deal_id,
                        status: deal.status,
                        reason: reason.to_string(),
                    });
                }
            };

        let event = match payout {
            Some(payee) => {
                let to = payee.party(&deal);
                let reason = match payee {
                    Payee::Seller => EntryReason::Release,
                    Payee::Buyer => EntryReason::Refund,
                };
                let amount = self.custody.lock().disburse(deal_id, to, reason, now)?;
                match payee {
                    Payee::Seller => DealEvent::Released {
                        deal_id,
                        seller: to,
                        amount,
                        timestamp: now,
                    },
                    Payee::Buyer => DealEvent::Refunded {
                        deal_id,
                        buyer: to,
                        amount,
                        timestamp: now,
                    },
                }
            }
            None => DealEvent::Expired {
                deal_id,
                recorded_by: caller,
                timestamp: now,
            },
        };

        let previous = deal.status;
        deal.status = next;

        tracing::info!(
            deal_id = %deal_id,
            caller = %caller,
            operation = %operation,
            from = %previous,
            to = %next,
            "Deal transitioned"
        );
        self.publish(event);

        Ok(deal.clone())
    }

    fn record(&self, deal_id: DealId) -> Result<Arc<Mutex<Deal>>> {
        let index = deal_id.index()?;
        self.deals
            .read()
            .get(index)
            .cloned()
            .ok_or(EscrowError::NotFound { deal_id })
    }

    fn publish(&self, event: DealEvent) {
        // No subscribers is fine; the ledger never waits on listeners.
        let _ = self.events.send(event);
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Current state of a deal
    pub fn get_deal(&self, deal_id: DealId) -> Result<Deal> {
        let record = self.record(deal_id)?;
        let deal = record.lock().clone();
        Ok(deal)
    }

    /// Number of deals ever created
    pub fn deal_count(&self) -> u64 {
        self.deals.read().len() as u64
    }

    /// A page of deals in id order
    pub fn deals(&self, offset: usize, limit: usize) -> Vec<Deal> {
        let records: Vec<_> = self
            .deals
            .read()
            .iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        records.iter().map(|r| r.lock().clone()).collect()
    }

    /// Total paid out to `party` across all deals
    pub fn balance_of(&self, party: &PartyId) -> Amount {
        self.custody.lock().balance(party)
    }

    /// Amount still held for a deal
    pub fn held(&self, deal_id: DealId) -> Amount {
        self.custody.lock().held(deal_id)
    }

    /// Amount paid out of a deal
    pub fn disbursed(&self, deal_id: DealId) -> Amount {
        self.custody.lock().disbursed(deal_id)
    }

    /// Sum of every open hold
    pub fn total_held(&self) -> Result<Amount> {
        self.custody.lock().total_held()
    }

    /// Custody entries for one deal, oldest first
    pub fn custody_entries(&self, deal_id: DealId) -> Vec<CustodyEntry> {
        self.custody.lock().deal_entries(deal_id)
    }

    /// Current time as seen by the ledger
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Consistent copy of every deal and the custody book
    pub fn snapshot(&self) -> LedgerSnapshot {
        let records = self.deals.read();
        let guards: Vec<_> = records.iter().map(|r| r.lock()).collect();
        let deals = guards.iter().map(|d| (**d).clone()).collect();
        let custody = self.custody.lock().clone();
        LedgerSnapshot::new(deals, custody, self.clock.now())
    }
}

impl Default for DealLedger {
    fn default() -> Self {
        Self::new()
    }
}

fn timeout_duration(timeout_secs: u64) -> Result<Duration> {
    i64::try_from(timeout_secs)
        .ok()
        .and_then(Duration::try_seconds)
        .ok_or_else(|| EscrowError::invalid_argument("timeout", "timeout out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn party(byte: u8) -> PartyId {
        PartyId::from_bytes([byte; 20])
    }

    fn eth(text: &str) -> Amount {
        Amount::parse_decimal(text).unwrap()
    }

    fn ledger() -> (DealLedger, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        (DealLedger::with_clock(clock.clone()), clock)
    }

    #[test]
    fn test_create_assigns_dense_ids() {
        let (ledger, _) = ledger();
        for expected in 0..3u64 {
            assert_eq!(ledger.deal_count(), expected);
            let id = ledger.create(party(1), party(2), 60, eth("1")).unwrap();
            assert_eq!(id, DealId(expected));
        }
        assert_eq!(ledger.deal_count(), 3);
    }

    #[test]
    fn test_create_records_deadline_and_hold() {
        let (ledger, clock) = ledger();
        let now = clock.now();
        let id = ledger.create(party(1), party(2), 60, eth("0.5")).unwrap();

        let deal = ledger.get_deal(id).unwrap();
        assert_eq!(deal.status, DealStatus::Funded);
        assert_eq!(deal.amount, eth("0.5"));
        assert_eq!(deal.created_at, now);
        assert_eq!(deal.deadline, now + Duration::seconds(60));
        assert_eq!(ledger.held(id), eth("0.5"));
    }

    #[test]
    fn test_create_rejects_bad_arguments() {
        let (ledger, _) = ledger();
        let cases = [
            ledger.create(party(1), party(2), 60, Amount::ZERO),
            ledger.create(party(1), PartyId::ZERO, 60, eth("1")),
            ledger.create(PartyId::ZERO, party(2), 60, eth("1")),
            ledger.create(party(1), party(1), 60, eth("1")),
            ledger.create(party(1), party(2), u64::MAX, eth("1")),
        ];
        for result in cases {
            assert!(matches!(result, Err(EscrowError::InvalidArgument { .. })));
        }
        assert_eq!(ledger.deal_count(), 0);
        assert_eq!(ledger.total_held().unwrap(), Amount::ZERO);
    }

    #[test]
    fn test_zero_timeout_is_immediately_expirable() {
        let (ledger, _) = ledger();
        let id = ledger.create(party(1), party(2), 0, eth("1")).unwrap();
        let deal = ledger.expire(id, party(2)).unwrap();
        assert_eq!(deal.status, DealStatus::Expired);
    }

    #[test]
    fn test_unknown_deal_is_not_found() {
        let (ledger, _) = ledger();
        assert_eq!(
            ledger.get_deal(DealId(0)).unwrap_err(),
            EscrowError::NotFound { deal_id: DealId(0) }
        );
        assert!(matches!(
            ledger.release_to_seller(DealId(5), party(1)),
            Err(EscrowError::NotFound { .. })
        ));
        assert_eq!(
            ledger.get_deal(DealId(u64::MAX)).unwrap_err(),
            EscrowError::NotFound { deal_id: DealId(u64::MAX) }
        );
    }

    #[test]
    fn test_rejection_leaves_state_unchanged() {
        let (ledger, _) = ledger();
        let id = ledger.create(party(1), party(2), 60, eth("1")).unwrap();
        let before = ledger.snapshot();

        assert!(ledger.release_to_seller(id, party(2)).is_err());
        assert!(ledger.expire(id, party(1)).is_err());
        assert!(ledger.refund_to_buyer(id, party(3)).is_err());

        let after = ledger.snapshot();
        assert_eq!(before.deals, after.deals);
        assert_eq!(before.custody, after.custody);
    }

    #[test]
    fn test_refund_after_deadline_without_expire() {
        let (ledger, clock) = ledger();
        let id = ledger.create(party(1), party(2), 10, eth("1")).unwrap();
        clock.advance(Duration::seconds(10));

        assert!(matches!(
            ledger.refund_to_buyer(id, party(2)),
            Err(EscrowError::Unauthorized { .. })
        ));
        let deal = ledger.refund_to_buyer(id, party(1)).unwrap();
        assert_eq!(deal.status, DealStatus::Refunded);
        assert_eq!(ledger.balance_of(&party(1)), eth("1"));
    }

    #[test]
    fn test_release_after_deadline_still_allowed() {
        let (ledger, clock) = ledger();
        let id = ledger.create(party(1), party(2), 10, eth("1")).unwrap();
        clock.advance(Duration::seconds(30));

        ledger.release_to_seller(id, party(1)).unwrap();
        assert_eq!(ledger.balance_of(&party(2)), eth("1"));
    }

    #[test]
    fn test_events_follow_transitions() {
        let (ledger, clock) = ledger();
        let mut rx = ledger.subscribe();

        let id = ledger.create(party(1), party(2), 1, eth("0.3")).unwrap();
        clock.advance(Duration::seconds(2));
        ledger.expire(id, party(2)).unwrap();
        ledger.refund_to_buyer(id, party(1)).unwrap();

        let names: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| e.name())
            .collect();
        assert_eq!(names, vec!["funded", "expired", "refunded"]);
    }

    #[test]
    fn test_deals_paging() {
        let (ledger, _) = ledger();
        for _ in 0..5 {
            ledger.create(party(1), party(2), 60, eth("1")).unwrap();
        }
        let page = ledger.deals(1, 2);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].id, DealId(1));
        assert_eq!(page[1].id, DealId(2));
        assert!(ledger.deals(10, 2).is_empty());
    }

    #[test]
    fn test_custody_entries_per_deal() {
        let (ledger, _) = ledger();
        let id = ledger.create(party(1), party(2), 60, eth("1")).unwrap();
        ledger.release_to_seller(id, party(1)).unwrap();

        let entries = ledger.custody_entries(id);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].reason, EntryReason::Lock);
        assert_eq!(entries[1].reason, EntryReason::Release);
        assert_eq!(ledger.disbursed(id), eth("1"));
    }
}
