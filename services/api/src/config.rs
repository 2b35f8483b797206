//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use health_report_core::ReportSettings;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

/// Name of the environment variable holding the report provider's API key.
pub const PROVIDER_KEY_VAR: &str = "GROQ_API_KEY";

const DEFAULT_API_BASE: &str = "https://api.groq.com/openai/v1";
const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

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
    pub cors_origin: String,
    /// Absent keys are not fatal at startup; report requests fail instead.
    pub provider_api_key: Option<String>,
    pub provider_api_base: String,
    pub report_model: String,
    pub report_timeout: Duration,
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
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin = std::env::var("CORS_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:8081".to_string());

        // --- Load Report Provider Settings ---
        let provider_api_key = std::env::var(PROVIDER_KEY_VAR)
            .ok()
            .filter(|key| !key.trim().is_empty());
        let provider_api_base =
            std::env::var("REPORT_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        let report_model =
            std::env::var("REPORT_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let report_timeout = match std::env::var("REPORT_TIMEOUT_SECS") {
            Ok(raw) => parse_timeout(&raw)?,
            Err(_) => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            cors_origin,
            provider_api_key,
            provider_api_base,
            report_model,
            report_timeout,
        })
    }

    /// The provider settings handed to the report generator.
    pub fn report_settings(&self) -> ReportSettings {
        ReportSettings {
            model: self.report_model.clone(),
            credential_name: PROVIDER_KEY_VAR.to_string(),
            provider_timeout: self.report_timeout,
        }
    }
}

fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidValue(
            "REPORT_TIMEOUT_SECS".to_string(),
            format!("'{}' is not a positive number of seconds", raw),
        )),
    }
}
