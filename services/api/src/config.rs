//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
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

/// Which backend produces new questions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GenerationMode {
    /// Canned questions, no network.
    Mock,
    /// The question generation HTTP API.
    Http,
    /// An OpenAI chat model called directly.
    OpenAi,
}

impl FromStr for GenerationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "http" => Ok(Self::Http),
            "openai" => Ok(Self::OpenAi),
            other => Err(format!("'{}' is not one of mock, http, openai", other)),
        }
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub catalog_path: PathBuf,
    pub history_storage_key: String,
    pub generation_mode: GenerationMode,
    pub generation_base_url: String,
    pub generation_timeout: Duration,
    pub questions_per_batch: usize,
    pub mock_fallback: bool,
    pub openai_api_key: Option<String>,
    pub generation_model: String,
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
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        // --- Load Server and Database Settings ---
        let bind_address = parse_var("BIND_ADDRESS", &var_or("BIND_ADDRESS", "0.0.0.0:3000"))?;
        let database_url = var_or("DATABASE_URL", "sqlite://conversation_deck.db?mode=rwc");

        let log_level_str = var_or("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Engine Settings ---
        let catalog_path = PathBuf::from(var_or("CATALOG_PATH", "./data/questions.json"));
        let history_storage_key = var_or(
            "HISTORY_STORAGE_KEY",
            conversation_deck_core::history::DEFAULT_HISTORY_KEY,
        );

        // --- Load Generation Settings ---
        let generation_mode = parse_var("GENERATION_MODE", &var_or("GENERATION_MODE", "mock"))?;
        let generation_base_url = var_or("GENERATION_BASE_URL", "http://localhost:8787")
            .trim_end_matches('/')
            .to_string();
        let timeout_secs: u64 =
            parse_var("GENERATION_TIMEOUT_SECS", &var_or("GENERATION_TIMEOUT_SECS", "30"))?;
        let questions_per_batch: usize =
            parse_var("QUESTIONS_PER_BATCH", &var_or("QUESTIONS_PER_BATCH", "5"))?;
        let mock_fallback: bool =
            parse_var("GENERATION_MOCK_FALLBACK", &var_or("GENERATION_MOCK_FALLBACK", "true"))?;

        // --- Load API Keys (as optional) ---
        let openai_api_key = lookup("OPENAI_API_KEY");
        let generation_model = var_or("GENERATION_MODEL", "gpt-4o-mini");

        if generation_mode == GenerationMode::OpenAi && openai_api_key.is_none() {
            return Err(ConfigError::MissingVar("OPENAI_API_KEY".to_string()));
        }

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            catalog_path,
            history_storage_key,
            generation_mode,
            generation_base_url,
            generation_timeout: Duration::from_secs(timeout_secs),
            questions_per_batch,
            mock_fallback,
            openai_api_key,
            generation_model,
        })
    }
}

fn parse_var<T>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string()))
}
