//! Runtime configuration from environment variables.
//!
//! The binary calls [`PantryConfig::load`], which reads a `.env` file from the
//! working directory first. Variables already set in the process win over the
//! file.

use crate::search::DEFAULT_DEBOUNCE;
use std::time::Duration;
use thiserror::Error;

/// Database the app talks to when `PANTRY_DATABASE_URL` is unset
pub const DEFAULT_DATABASE_URL: &str = "https://react-hooks-update-e9127-default-rtdb.firebaseio.com";

/// Request timeout used when `PANTRY_REQUEST_TIMEOUT_SECS` is unset
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Invalid configuration value
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Value is not a non-negative integer
    #[error("{var} must be a whole number, got {value:?}")]
    InvalidNumber {
        /// Variable name
        var: &'static str,
        /// Offending value
        value: String,
    },

    /// A duration that must be positive was zero
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Application configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PantryConfig {
    /// Firebase database root
    pub database_url: String,
    /// Quiet period of the filter input
    pub debounce: Duration,
    /// Per-request HTTP timeout
    pub request_timeout: Duration,
}

impl Default for PantryConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            debounce: DEFAULT_DEBOUNCE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl PantryConfig {
    /// Load a `.env` file if present, then read the environment
    ///
    /// # Errors
    ///
    /// See [`PantryConfig::from_env`].
    pub fn load() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
            Err(error) if error.not_found() => {},
            Err(error) => tracing::warn!(error = %error, "Ignoring unreadable .env file"),
        }
        Self::from_env()
    }

    /// Load from `PANTRY_DATABASE_URL`, `PANTRY_DEBOUNCE_MS` and
    /// `PANTRY_REQUEST_TIMEOUT_SECS`, falling back to defaults
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a numeric variable does not parse or is zero.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load using `lookup` in place of the process environment
    ///
    /// # Errors
    ///
    /// See [`PantryConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let database_url = lookup("PANTRY_DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(defaults.database_url);

        let debounce = match lookup("PANTRY_DEBOUNCE_MS") {
            Some(value) => Duration::from_millis(positive("PANTRY_DEBOUNCE_MS", &value)?),
            None => defaults.debounce,
        };

        let request_timeout = match lookup("PANTRY_REQUEST_TIMEOUT_SECS") {
            Some(value) => Duration::from_secs(positive("PANTRY_REQUEST_TIMEOUT_SECS", &value)?),
            None => defaults.request_timeout,
        };

        Ok(Self {
            database_url,
            debounce,
            request_timeout,
        })
    }
}

fn positive(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    let parsed = value
        .trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidNumber {
            var,
            value: value.to_string(),
        })?;

    if parsed == 0 {
        return Err(ConfigError::Zero(var));
    }
    Ok(parsed)
}
