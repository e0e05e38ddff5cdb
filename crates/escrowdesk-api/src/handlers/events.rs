//! Server-sent deal events

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::Stream;
use tokio::sync::broadcast;

use crate::dto::{parse_deal_id, EventsQuery};
use crate::error::ApiResult;
use crate::state::AppState;

/// `GET /api/events[?deal=<id>]`
///
/// Opens with a `state_sync` event, then one event per ledger transition
/// named after it (`funded`, `released`, `refunded`, `expired`). The
/// stream ends when the server begins shutting down.
pub async fn event_stream(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventsQuery>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let only = query.deal.as_deref().map(parse_deal_id).transpose()?;

    // Subscribe before responding so no transition after this point is missed.
    let mut rx = state.ledger.subscribe();
    let mut stop = state.shutdown_signal();

    let sync = serde_json::json!({
        "deals": state.ledger.deal_count(),
        "serverTime": state.ledger.now(),
    });
    let initial_event = Event::default()
        .event("state_sync")
        .data(sync.to_string());

    let stream = async_stream::stream! {
        yield Ok(initial_event);

        while !*stop.borrow() {
            let received = tokio::select! {
                _ = stop.changed() => break,
                received = rx.recv() => received,
            };
            match received {
                Ok(event) => {
                    if only.is_some_and(|id| id != event.deal_id()) {
                        continue;
                    }
                    yield Ok(Event::default()
                        .event(event.name())
                        .data(serde_json::to_string(&event).unwrap_or_default()));
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event subscriber lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    ))
}
