//! EscrowDesk Types - Canonical domain types for two-party escrow deals
//!
//! This crate contains the foundational types for EscrowDesk with zero
//! dependencies on other escrowdesk crates. It defines:
//!
//! - Identity types (`DealId`, `PartyId`)
//! - Fixed-point amounts with 18-decimal precision
//! - The `Deal` record and its `DealStatus` state machine
//! - State-change notifications (`DealEvent`)
//! - The error taxonomy shared by the ledger and the API
//!
//! # Deal Lifecycle
//!
//! ```text
//! (created) ──create──▶ Funded ──release──▶ Released
//!                          │  ──refund───▶ Refunded
//!                          └──expire──▶ Expired ──refund──▶ Refunded
//! ```

pub mod identity;
pub mod amount;
pub mod deal;
pub mod event;
pub mod error;

pub use identity::*;
pub use amount::*;
pub use deal::*;
pub use event::*;
pub use error::*;

/// Version of the EscrowDesk types schema
pub const TYPES_VERSION: &str = "0.1.0";
