//! End-to-end settlement scenarios against a manually driven clock

use std::sync::Arc;
use std::thread;

use chrono::Duration;
use escrowdesk_ledger::{DealLedger, ManualClock};
use escrowdesk_types::{Amount, DealEvent, DealId, DealStatus, EscrowError, PartyId};

const BUYER: [u8; 20] = [0xb0; 20];
const SELLER: [u8; 20] = [0x5e; 20];
const STRANGER: [u8; 20] = [0x77; 20];

fn buyer() -> PartyId {
    PartyId::from_bytes(BUYER)
}

fn seller() -> PartyId {
    PartyId::from_bytes(SELLER)
}

fn stranger() -> PartyId {
    PartyId::from_bytes(STRANGER)
}

fn eth(text: &str) -> Amount {
    Amount::parse_decimal(text).unwrap()
}

fn setup() -> (DealLedger, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::starting_now());
    (DealLedger::with_clock(clock.clone()), clock)
}

#[test]
fn scenario_create_funds_first_deal() {
    let (ledger, _) = setup();

    let id = ledger.create(buyer(), seller(), 60, eth("1.0")).unwrap();

    assert_eq!(id, DealId(0));
    let deal = ledger.get_deal(DealId(0)).unwrap();
    assert_eq!(deal.status, DealStatus::Funded);
    assert_eq!(deal.amount, eth("1.0"));
    assert_eq!(deal.buyer, buyer());
    assert_eq!(deal.seller, seller());
}

#[test]
fn scenario_buyer_releases_once() {
    let (ledger, _) = setup();
    let id = ledger.create(buyer(), seller(), 60, eth("1.0")).unwrap();

    assert!(matches!(
        ledger.release_to_seller(id, seller()),
        Err(EscrowError::Unauthorized { .. })
    ));

    let before = ledger.balance_of(&seller());
    let deal = ledger.release_to_seller(id, buyer()).unwrap();
    assert_eq!(deal.status, DealStatus::Released);
    assert_eq!(
        ledger.balance_of(&seller()),
        before.checked_add(eth("1.0")).unwrap()
    );

    assert!(matches!(
        ledger.release_to_seller(id, buyer()),
        Err(EscrowError::InvalidState { .. })
    ));
    assert_eq!(ledger.balance_of(&seller()), eth("1.0"));
}

#[test]
fn scenario_expired_deal_refunds_to_buyer_only() {
    let (ledger, clock) = setup();
    let id = ledger.create(buyer(), seller(), 1, eth("0.3")).unwrap();
    clock.advance(Duration::seconds(2));

    assert!(matches!(
        ledger.expire(id, stranger()),
        Err(EscrowError::Unauthorized { .. })
    ));
    let deal = ledger.expire(id, seller()).unwrap();
    assert_eq!(deal.status, DealStatus::Expired);
    assert_eq!(ledger.held(id), eth("0.3"));

    assert!(matches!(
        ledger.refund_to_buyer(id, seller()),
        Err(EscrowError::Unauthorized { .. })
    ));
    let deal = ledger.refund_to_buyer(id, buyer()).unwrap();
    assert_eq!(deal.status, DealStatus::Refunded);
    assert_eq!(ledger.balance_of(&buyer()), eth("0.3"));
    assert_eq!(ledger.balance_of(&seller()), Amount::ZERO);
}

#[test]
fn scenario_seller_cancels_before_deadline() {
    let (ledger, _) = setup();
    let id = ledger.create(buyer(), seller(), 60, eth("0.2")).unwrap();

    let deal = ledger.refund_to_buyer(id, seller()).unwrap();

    assert_eq!(deal.status, DealStatus::Refunded);
    assert_eq!(ledger.balance_of(&buyer()), eth("0.2"));
}

#[test]
fn release_rejects_non_buyers_in_every_state() {
    let (ledger, clock) = setup();
    let funded = ledger.create(buyer(), seller(), 10, eth("1")).unwrap();
    let released = ledger.create(buyer(), seller(), 10, eth("1")).unwrap();
    let refunded = ledger.create(buyer(), seller(), 10, eth("1")).unwrap();
    let expired = ledger.create(buyer(), seller(), 10, eth("1")).unwrap();
    ledger.release_to_seller(released, buyer()).unwrap();
    ledger.refund_to_buyer(refunded, buyer()).unwrap();
    clock.advance(Duration::seconds(10));
    ledger.expire(expired, buyer()).unwrap();

    for id in [funded, released, refunded, expired] {
        for caller in [seller(), stranger()] {
            assert!(matches!(
                ledger.release_to_seller(id, caller),
                Err(EscrowError::Unauthorized { .. })
            ));
        }
    }
}

#[test]
fn expire_respects_deadline_boundary() {
    let (ledger, clock) = setup();
    let id = ledger.create(buyer(), seller(), 30, eth("1")).unwrap();

    clock.advance(Duration::seconds(29));
    assert!(matches!(
        ledger.expire(id, buyer()),
        Err(EscrowError::InvalidState { .. })
    ));

    // The deadline instant itself counts as reached.
    clock.advance(Duration::seconds(1));
    let deal = ledger.expire(id, buyer()).unwrap();
    assert_eq!(deal.status, DealStatus::Expired);
    assert_eq!(ledger.balance_of(&buyer()), Amount::ZERO);
    assert_eq!(ledger.balance_of(&seller()), Amount::ZERO);
}

#[test]
fn every_deal_pays_out_exactly_once() {
    let (ledger, clock) = setup();
    let amounts = ["0.1", "0.25", "3", "0.000000000000000001"];
    let ids: Vec<_> = amounts
        .iter()
        .map(|a| ledger.create(buyer(), seller(), 5, eth(a)).unwrap())
        .collect();

    ledger.release_to_seller(ids[0], buyer()).unwrap();
    ledger.refund_to_buyer(ids[1], seller()).unwrap();
    clock.advance(Duration::seconds(5));
    ledger.refund_to_buyer(ids[2], buyer()).unwrap();
    ledger.expire(ids[3], seller()).unwrap();
    ledger.refund_to_buyer(ids[3], buyer()).unwrap();

    for (id, amount) in ids.iter().zip(amounts) {
        assert_eq!(ledger.disbursed(*id), eth(amount));
        assert_eq!(ledger.held(*id), Amount::ZERO);
        for op in 0..3 {
            let retry = match op {
                0 => ledger.release_to_seller(*id, buyer()),
                1 => ledger.refund_to_buyer(*id, buyer()),
                _ => ledger.expire(*id, buyer()),
            };
            assert!(retry.is_err());
        }
        assert_eq!(ledger.disbursed(*id), eth(amount));
    }
    assert_eq!(ledger.total_held().unwrap(), Amount::ZERO);
}

#[test]
fn concurrent_settlement_pays_once() {
    let (ledger, _) = setup();
    let ledger = Arc::new(ledger);
    let id = ledger.create(buyer(), seller(), 60, eth("2")).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let ledger = ledger.clone();
            thread::spawn(move || {
                if i % 2 == 0 {
                    ledger.release_to_seller(id, buyer()).is_ok()
                } else {
                    ledger.refund_to_buyer(id, seller()).is_ok()
                }
            })
        })
        .collect();

    let successes = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();

    assert_eq!(successes, 1);
    let paid = ledger
        .balance_of(&buyer())
        .checked_add(ledger.balance_of(&seller()))
        .unwrap();
    assert_eq!(paid, eth("2"));
    assert!(ledger.get_deal(id).unwrap().status.is_terminal());
}

#[test]
fn concurrent_creates_get_distinct_ids() {
    let (ledger, _) = setup();
    let ledger = Arc::new(ledger);

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let ledger = ledger.clone();
            thread::spawn(move || ledger.create(buyer(), seller(), 60, eth("1")).unwrap())
        })
        .collect();
    let mut ids: Vec<_> = handles.into_iter().map(|h| h.join().unwrap().value()).collect();
    ids.sort_unstable();

    assert_eq!(ids, (0..16).collect::<Vec<_>>());
    assert_eq!(ledger.total_held().unwrap(), eth("16"));
}

#[tokio::test]
async fn subscribers_see_each_transition() {
    let (ledger, _) = setup();
    let mut events = ledger.subscribe();

    let id = ledger.create(buyer(), seller(), 60, eth("0.5")).unwrap();
    ledger.release_to_seller(id, buyer()).unwrap();

    match events.recv().await.unwrap() {
        DealEvent::Funded { deal_id, amount, .. } => {
            assert_eq!(deal_id, id);
            assert_eq!(amount, eth("0.5"));
        }
        other => panic!("unexpected event {:?}", other),
    }
    match events.recv().await.unwrap() {
        DealEvent::Released { seller: to, amount, .. } => {
            assert_eq!(to, seller());
            assert_eq!(amount, eth("0.5"));
        }
        other => panic!("unexpected event {:?}", other),
    }
}
