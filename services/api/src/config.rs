//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::str::FromStr;
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
    pub log_level: Level,
    pub openai_api_key: String,
    pub openai_api_base: Option<String>,
    pub study_model: String,
    pub tutor_model: String,
    /// Applied to model calls, which can take minutes on large documents.
    pub model_timeout: Duration,
    /// Applied to ordinary outbound requests such as link fetches.
    pub fetch_timeout: Duration,
    pub max_upload_bytes: usize,
    pub cors_allowed_origin: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        // --- Server Settings ---
        let bind_address =
            parse_var::<SocketAddr>("BIND_ADDRESS", &var_or("BIND_ADDRESS", "0.0.0.0:5000"))?;

        let log_level_str = var_or("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_allowed_origin = var_or("CORS_ALLOWED_ORIGIN", "http://localhost:5173");
        let max_upload_bytes =
            parse_var::<usize>("MAX_UPLOAD_BYTES", &var_or("MAX_UPLOAD_BYTES", "26214400"))?;

        // --- Model Settings ---
        let openai_api_key = lookup("OPENAI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingVar("OPENAI_API_KEY".to_string()))?;
        let openai_api_base = lookup("OPENAI_API_BASE").filter(|base| !base.trim().is_empty());
        let study_model = var_or("STUDY_MODEL", "gpt-4o-mini");
        let tutor_model = var_or("TUTOR_MODEL", "gpt-4o-mini");

        // --- Timeouts ---
        let model_timeout_secs =
            parse_var::<u64>("MODEL_TIMEOUT_SECS", &var_or("MODEL_TIMEOUT_SECS", "300"))?;
        let fetch_timeout_secs =
            parse_var::<u64>("FETCH_TIMEOUT_SECS", &var_or("FETCH_TIMEOUT_SECS", "30"))?;
        if model_timeout_secs <= fetch_timeout_secs {
            return Err(ConfigError::InvalidValue(
                "MODEL_TIMEOUT_SECS".to_string(),
                format!(
                    "must be longer than FETCH_TIMEOUT_SECS ({}s), got {}s",
                    fetch_timeout_secs, model_timeout_secs
                ),
            ));
        }

        Ok(Self {
            bind_address,
            log_level,
            openai_api_key,
            openai_api_base,
            study_model,
            tutor_model,
            model_timeout: Duration::from_secs(model_timeout_secs),
            fetch_timeout: Duration::from_secs(fetch_timeout_secs),
            max_upload_bytes,
            cors_allowed_origin,
        })
    }
}

fn parse_var<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))
}
