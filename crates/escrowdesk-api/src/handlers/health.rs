//! Health Check Handlers

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::state::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Timestamp (ms since epoch)
    pub timestamp: i64,
    /// Deals created so far
    pub deals: u64,
    /// Assistant mode in use (`mock` or `live`)
    pub assistant: String,
}

/// Health check endpoint
///
/// Returns 200 while the service is running.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().timestamp_millis(),
        deals: state.ledger.deal_count(),
        assistant: state.assistant.mode().to_string(),
    })
}
