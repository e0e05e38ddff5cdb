//! EscrowDesk Ledger - settlement of two-party escrow deals
//!
//! The ledger owns every deal and every unit of locked value. Key
//! properties:
//!
//! - **Table-driven**: legality of a transition is a lookup in
//!   [`transition::RULES`]
//! - **Explicit custody**: locked funds sit in a [`CustodyBook`] hold until
//!   paid out exactly once
//! - **Per-deal locking**: operations on different deals never contend
//! - **Injected time**: deadlines are checked against a [`Clock`]
//!
//! ```ignore
//! let ledger = DealLedger::new();
//! let id = ledger.create(buyer, seller, 3600, Amount::parse_decimal("0.3")?)?;
//! ledger.release_to_seller(id, buyer)?;
//! ```

pub mod clock;
pub mod custody;
pub mod ledger;
pub mod snapshot;
pub mod transition;

pub use clock::{Clock, ManualClock, SystemClock};
pub use custody::{CustodyBook, CustodyEntry, EntryId, EntryReason, EntryType};
pub use ledger::{DealLedger, DEFAULT_EVENT_CAPACITY};
pub use snapshot::LedgerSnapshot;
pub use transition::{evaluate, Operation, Payee, Role, Rule, TimeWindow, Verdict, RULES};
