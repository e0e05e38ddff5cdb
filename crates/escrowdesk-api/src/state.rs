//! Application state shared across handlers

use std::sync::Arc;

use escrowdesk_assistant::AssistantRouter;
use escrowdesk_ledger::{DealLedger, ManualClock};
use escrowdesk_types::PartyId;
use tokio::sync::watch;

use crate::persist::SnapshotStore;

/// Shared application state
pub struct AppState {
    /// The deal ledger
    pub ledger: Arc<DealLedger>,
    /// Booking chat assistant
    pub assistant: AssistantRouter,
    /// Caller used when a request names none
    pub operator: PartyId,
    /// Where the ledger is persisted, if anywhere
    pub store: Option<SnapshotStore>,
    /// Flipped to `true` when the server starts shutting down
    shutdown: watch::Sender<bool>,
}

impl AppState {
    pub fn new(ledger: Arc<DealLedger>, assistant: AssistantRouter, operator: PartyId) -> Self {
        Self {
            ledger,
            assistant,
            operator,
            store: None,
            shutdown: watch::channel(false).0,
        }
    }

    /// Persist the ledger after every mutation
    pub fn with_store(mut self, store: SnapshotStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Save the ledger if a store is configured
    ///
    /// The mutation has already happened, so a failed write is logged
    /// rather than returned.
    pub async fn persist(&self) {
        if let Some(store) = &self.store {
            if let Err(e) = store.save(&self.ledger).await {
                tracing::error!(path = %store.path().display(), "Snapshot write failed: {}", e);
            }
        }
    }

    /// Ask long-lived responses (event streams) to finish
    pub fn begin_shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Watch for [`AppState::begin_shutdown`]
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// State over a manually driven clock with the deterministic assistant
    pub fn test(operator: PartyId) -> (Self, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        let ledger = Arc::new(DealLedger::with_clock(clock.clone()));
        (
            Self::new(ledger, AssistantRouter::deterministic(), operator),
            clock,
        )
    }
}
