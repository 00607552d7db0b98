//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub openai_api_key: Option<String>,
    pub gateway_model: String,
    /// How many days of content the cleanup job keeps.
    pub retention_days: i64,
    /// Inter-topic delay for user-triggered refreshes.
    pub refresh_pacing: Duration,
    /// Inter-topic delay for the scheduled fleet sweep.
    pub sweep_pacing: Duration,
    /// Default per-fetch item cap for internet topics.
    pub max_items_per_fetch: u32,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://ai_curator.db".to_string());

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load API Keys (as optional) ---
        let openai_api_key = std::env::var("OPENAI_API_KEY").ok();

        // --- Load Gateway and Fetch Settings ---
        let gateway_model =
            std::env::var("GATEWAY_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());

        let retention_days = parse_env_number("RETENTION_DAYS", 7)?;
        let refresh_pacing =
            Duration::from_secs(parse_env_number("REFRESH_PACING_SECS", 10)? as u64);
        let sweep_pacing = Duration::from_secs(parse_env_number("SWEEP_PACING_SECS", 15)? as u64);
        let max_items_per_fetch = parse_env_number("MAX_ITEMS_PER_FETCH", 5)? as u32;

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            openai_api_key,
            gateway_model,
            retention_days,
            refresh_pacing,
            sweep_pacing,
            max_items_per_fetch,
        })
    }
}

fn parse_env_number(name: &str, default: i64) -> Result<i64, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<i64>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}
