//! Server Configuration
//!
//! Layered from an optional file, `config/default`, `config/local` and
//! `ESCROWDESK__*` environment variables, then overridden by CLI flags.

use std::net::SocketAddr;
use std::path::PathBuf;

use escrowdesk_assistant::AssistantMode;
use serde::{Deserialize, Serialize};

/// Operator address used when a request names no caller
pub const DEFAULT_OPERATOR: &str = "0x00000000000000000000000000000000000000b0";

/// Server configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server binding configuration
    #[serde(default)]
    pub server: ServerSettings,
    /// Ledger configuration
    #[serde(default)]
    pub escrow: EscrowSettings,
    /// Booking assistant configuration
    #[serde(default)]
    pub assistant: AssistantSettings,
    /// API configuration
    #[serde(default)]
    pub api: ApiSettings,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server binding settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse()
            .map_err(|e| anyhow::anyhow!("invalid bind address {}: {}", addr, e))
    }
}

/// Ledger settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscrowSettings {
    /// Address acting for requests without `x-caller-address`
    #[serde(default = "default_operator")]
    pub operator_address: String,
    /// Snapshot file; the ledger is in-memory only when unset
    #[serde(default)]
    pub state_path: Option<PathBuf>,
}

impl Default for EscrowSettings {
    fn default() -> Self {
        Self {
            operator_address: default_operator(),
            state_path: None,
        }
    }
}

/// Booking assistant settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssistantSettings {
    /// `mock` or `live`; falls back to `USE_AI` when unset
    #[serde(default)]
    pub mode: Option<AssistantMode>,
}

impl AssistantSettings {
    pub fn resolved_mode(&self) -> AssistantMode {
        self.mode.unwrap_or_else(AssistantMode::from_env)
    }
}

/// API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,
    /// CORS allowed origins
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
    /// Enable response compression
    #[serde(default = "default_true")]
    pub enable_compression: bool,
    /// Enable request tracing
    #[serde(default = "default_true")]
    pub enable_tracing: bool,
    /// Maximum request body size in bytes
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            enable_cors: true,
            cors_origins: default_cors_origins(),
            enable_compression: true,
            enable_tracing: true,
            max_body_size: default_max_body_size(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_operator() -> String {
    DEFAULT_OPERATOR.to_string()
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_max_body_size() -> usize {
    64 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_true() -> bool {
    true
}

impl ServerConfig {
    /// Load configuration from environment and optional config file
    pub fn load(config_path: Option<&str>) -> anyhow::Result<Self> {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let mut builder = config::Config::builder();

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        builder = builder
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("ESCROWDESK")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Create a configuration for development/testing
    pub fn development() -> Self {
        Self {
            logging: LoggingConfig {
                level: "debug".to_string(),
                format: "pretty".to_string(),
            },
            assistant: AssistantSettings {
                mode: Some(AssistantMode::Mock),
            },
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.escrow.operator_address, DEFAULT_OPERATOR);
        assert!(config.escrow.state_path.is_none());
        assert_eq!(config.logging.format, "pretty");
        assert!(config.server.socket_addr().is_ok());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let source = config::Config::builder()
            .add_source(config::File::from_str(
                "[server]\nport = 8080\n\n[assistant]\nmode = \"live\"\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();
        let config: ServerConfig = source.try_deserialize().unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.assistant.resolved_mode(), AssistantMode::Live);
        assert!(config.api.enable_cors);
    }

    #[test]
    fn test_bad_host_is_an_error() {
        let settings = ServerSettings {
            host: "not a host".to_string(),
            port: 1,
        };
        assert!(settings.socket_addr().is_err());
    }
}
