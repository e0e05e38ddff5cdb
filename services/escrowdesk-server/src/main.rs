//! EscrowDesk Server
//!
//! HTTP server for two-party escrow deals with a booking chat assistant.
//!
//! # Features
//!
//! - Lock, release, refund and expire deals over JSON
//! - Server-sent deal events
//! - Booking assistant in mock or live (OpenAI) mode
//! - Optional snapshot persistence across restarts
//! - Graceful shutdown handling
//!
//! # Usage
//!
//! ```bash
//! # Start with default settings
//! escrowdesk-server
//!
//! # Start with a config file and a persisted ledger
//! escrowdesk-server --config escrowdesk.toml --state-file data/ledger.json
//!
//! # Start with environment overrides
//! ESCROWDESK__SERVER__PORT=8080 USE_AI=live escrowdesk-server
//! ```

mod config;

use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use escrowdesk_api::{create_router, ApiConfig, AppState, SnapshotStore};
use escrowdesk_assistant::AssistantRouter;
use escrowdesk_ledger::{DealLedger, SystemClock};
use escrowdesk_types::PartyId;

use crate::config::ServerConfig;

// =============================================================================
// CLI Arguments
// =============================================================================

/// EscrowDesk Server - escrow deals with a booking assistant
#[derive(Parser, Debug)]
#[command(name = "escrowdesk-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML, JSON, or YAML)
    #[arg(short, long, env = "ESCROWDESK_CONFIG")]
    config: Option<String>,

    /// Host to bind to
    #[arg(long, env = "ESCROWDESK_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "ESCROWDESK_PORT")]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "ESCROWDESK_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format (json, pretty)
    #[arg(long, env = "ESCROWDESK_LOG_FORMAT")]
    log_format: Option<String>,

    /// Snapshot file for the ledger
    #[arg(long, env = "ESCROWDESK_STATE_FILE")]
    state_file: Option<std::path::PathBuf>,

    /// Address acting for requests without `x-caller-address`
    #[arg(long, env = "ESCROWDESK_OPERATOR")]
    operator: Option<String>,
}

impl Args {
    /// Apply command-line overrides on top of loaded configuration
    fn apply(self, config: &mut ServerConfig) {
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
        if let Some(path) = self.state_file {
            config.escrow.state_path = Some(path);
        }
        if let Some(operator) = self.operator {
            config.escrow.operator_address = operator;
        }
    }
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut server_config = ServerConfig::load(args.config.as_deref())?;
    args.apply(&mut server_config);

    init_logging(&server_config.logging)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting EscrowDesk Server"
    );

    let operator = validate_config(&server_config)?;

    let store = server_config
        .escrow
        .state_path
        .as_ref()
        .map(SnapshotStore::new);
    let ledger = init_ledger(store.as_ref()).await?;

    let assistant = AssistantRouter::from_mode(server_config.assistant.resolved_mode());
    tracing::info!(
        assistant = assistant.name(),
        mode = %assistant.mode(),
        "Booking assistant ready"
    );

    let mut state = AppState::new(Arc::new(ledger), assistant, operator);
    if let Some(store) = store {
        state = state.with_store(store);
    }
    let state = Arc::new(state);

    let api_config = ApiConfig {
        enable_cors: server_config.api.enable_cors,
        cors_origins: server_config.api.cors_origins.clone(),
        enable_compression: server_config.api.enable_compression,
        enable_tracing: server_config.api.enable_tracing,
        max_body_size: server_config.api.max_body_size,
    };
    let app = create_router(state.clone(), api_config);

    let addr = server_config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(
        host = %server_config.server.host,
        port = %server_config.server.port,
        operator = %operator,
        "Server listening"
    );

    let shutdown_state = state.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown_state.begin_shutdown();
        })
        .await?;

    state.persist().await;
    tracing::info!(deals = state.ledger.deal_count(), "Server shutdown complete");

    Ok(())
}

// =============================================================================
// Initialization Functions
// =============================================================================

/// Initialize tracing/logging
fn init_logging(config: &config::LoggingConfig) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    match config.format.as_str() {
        "json" => subscriber
            .with(fmt::layer().json().with_target(true))
            .try_init()?,
        _ => subscriber
            .with(fmt::layer().pretty().with_target(true))
            .try_init()?,
    }

    Ok(())
}

/// Validate configuration, returning the operator address
fn validate_config(config: &ServerConfig) -> anyhow::Result<PartyId> {
    let operator = PartyId::parse(&config.escrow.operator_address).map_err(|e| {
        anyhow::anyhow!(
            "escrow.operator_address '{}' is not an address: {}",
            config.escrow.operator_address,
            e
        )
    })?;
    if operator.is_zero() {
        anyhow::bail!("escrow.operator_address must not be the zero address");
    }

    if !matches!(config.logging.format.as_str(), "json" | "pretty") {
        anyhow::bail!(
            "logging.format must be 'json' or 'pretty', got '{}'",
            config.logging.format
        );
    }

    if config.api.max_body_size == 0 {
        anyhow::bail!("api.max_body_size must be greater than zero");
    }

    Ok(operator)
}

/// Restore the ledger from its snapshot, or start empty
async fn init_ledger(store: Option<&SnapshotStore>) -> anyhow::Result<DealLedger> {
    let Some(store) = store else {
        tracing::info!("No state file configured, ledger is in-memory only");
        return Ok(DealLedger::new());
    };

    match store.load(Arc::new(SystemClock)).await? {
        Some(ledger) => {
            tracing::info!(
                path = %store.path().display(),
                deals = ledger.deal_count(),
                "Ledger restored"
            );
            Ok(ledger)
        }
        None => {
            tracing::info!(path = %store.path().display(), "No snapshot yet, starting empty");
            Ok(DealLedger::new())
        }
    }
}

// =============================================================================
// Graceful Shutdown
// =============================================================================

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
