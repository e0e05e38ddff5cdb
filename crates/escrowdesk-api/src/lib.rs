//! EscrowDesk REST API
//!
//! JSON over HTTP for the escrow deal ledger and the booking assistant.
//!
//! # API Structure
//!
//! ```text
//! /health                     - Liveness and deal count
//! /api/
//! ├── /escrow                 - Deal listing (offset, limit)
//! │   ├── /lock               - Open a deal, caller is the buyer
//! │   ├── /release            - Pay the seller
//! │   ├── /refund             - Pay the buyer back
//! │   ├── /expire             - Record a passed deadline
//! │   └── /:id                - One deal
//! ├── /balances/:address      - Total paid out to an address
//! ├── /events                 - Server-sent deal events
//! └── /chat                   - Booking assistant
//! ```
//!
//! # Caller Identity
//!
//! The `x-caller-address` header names the acting account. Without it the
//! server's operator address is used.

pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod persist;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderName;
use axum::Router;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use extractors::{Caller, CALLER_HEADER};
pub use persist::SnapshotStore;
pub use state::AppState;

/// API configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Enable CORS for browser clients
    pub enable_cors: bool,
    /// Allowed origins for CORS
    pub cors_origins: Vec<String>,
    /// Enable response compression
    pub enable_compression: bool,
    /// Enable request tracing
    pub enable_tracing: bool,
    /// Maximum request body size in bytes
    pub max_body_size: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enable_cors: true,
            cors_origins: vec!["*".to_string()],
            enable_compression: true,
            enable_tracing: true,
            max_body_size: 64 * 1024,
        }
    }
}

/// Create the main API router with all middleware
pub fn create_router(state: Arc<AppState>, config: ApiConfig) -> Router {
    let mut router = Router::new()
        .nest("/api", routes::api_routes())
        .route("/health", axum::routing::get(handlers::health::health_check))
        .layer(DefaultBodyLimit::max(config.max_body_size))
        .with_state(state);

    // Add tracing
    if config.enable_tracing {
        router = router.layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                let caller = request
                    .headers()
                    .get(CALLER_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("operator");

                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                    caller = %caller,
                )
            },
        ));
    }

    // Add request ID middleware; the last layer added runs first, so the id
    // is set before tracing and propagation see the request
    let x_request_id = HeaderName::from_static("x-request-id");
    router = router
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid));

    // Add compression
    if config.enable_compression {
        router = router.layer(CompressionLayer::new());
    }

    // Add CORS
    if config.enable_cors {
        let cors = if config.cors_origins.iter().any(|o| o == "*") {
            CorsLayer::permissive()
        } else {
            CorsLayer::new()
                .allow_origin(
                    config
                        .cors_origins
                        .iter()
                        .filter_map(|o| o.parse().ok())
                        .collect::<Vec<_>>(),
                )
                .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
                .allow_headers(Any)
        };
        router = router.layer(cors);
    }

    router
}

/// Create a minimal router for testing
pub fn create_test_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", routes::api_routes())
        .route("/health", axum::routing::get(handlers::health::health_check))
        .with_state(state)
}
