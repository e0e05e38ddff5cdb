//! API Request Handlers

pub mod chat;
pub mod escrow;
pub mod events;
pub mod health;
