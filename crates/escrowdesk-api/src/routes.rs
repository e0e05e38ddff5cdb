//! API Routes

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::state::AppState;

/// Routes mounted under `/api`
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/escrow", escrow_routes())
        .route("/balances/:address", get(handlers::escrow::balance))
        .route("/events", get(handlers::events::event_stream))
        .route("/chat", post(handlers::chat::chat))
}

/// Deal lifecycle routes
fn escrow_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::escrow::list_deals))
        .route("/lock", post(handlers::escrow::lock))
        .route("/release", post(handlers::escrow::release))
        .route("/refund", post(handlers::escrow::refund))
        .route("/expire", post(handlers::escrow::expire))
        .route("/:id", get(handlers::escrow::get_deal))
}
