//! Booking chat handler

use std::sync::Arc;

use axum::{extract::State, Json};

use crate::dto::{ChatRequest, ChatResponse};
use crate::state::AppState;

/// `POST /api/chat`
///
/// Always answers 200; an unreadable body is treated as an empty message.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    body: Option<Json<ChatRequest>>,
) -> Json<ChatResponse> {
    let message = body.map(|Json(req)| req.text()).unwrap_or_default();
    let reply = state.assistant.reply(&message).await;
    Json(ChatResponse::from(reply))
}
