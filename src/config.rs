//! Client configuration
//!
//! Everything is read from the environment; unset variables fall back to
//! defaults that match a locally running backend.

use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8001";
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub const DEFAULT_GREETING: &str =
    "Hi, I'm your virtual assistant. Which part of the accessible travel guide would you like to ask about?";
pub const DEFAULT_RESET_GREETING: &str = "The conversation has been reset. How can I help you?";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid base URL {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("invalid value {value:?} for {var}: expected whole seconds")]
    InvalidSeconds { var: &'static str, value: String },
}

/// Settings for talking to the chat service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Service base address, without trailing slash
    pub base_url: String,
    /// TCP/TLS connect timeout for every request
    pub connect_timeout: Duration,
    /// Whole-request timeout for reset and health calls. The chat stream
    /// itself is only bounded by the connect timeout.
    pub request_timeout: Duration,
    pub greeting: String,
    pub reset_greeting: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            greeting: DEFAULT_GREETING.to_string(),
            reset_greeting: DEFAULT_RESET_GREETING.to_string(),
        }
    }
}

impl ClientConfig {
    /// Read the `CHATLINE_*` environment variables, falling back to defaults
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a variable is set but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable lookup (the environment in production)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidBaseUrl` for a base URL that is not an
    /// absolute http(s) URL, and `ConfigError::InvalidSeconds` for a timeout
    /// that is not a whole number of seconds.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let base_url = match lookup("CHATLINE_BASE_URL") {
            Some(url) => normalize_base_url(&url)?,
            None => defaults.base_url,
        };

        let connect_timeout = seconds(&lookup, "CHATLINE_CONNECT_TIMEOUT_SECS")?
            .unwrap_or(defaults.connect_timeout);
        let request_timeout = seconds(&lookup, "CHATLINE_RESET_TIMEOUT_SECS")?
            .unwrap_or(defaults.request_timeout);

        Ok(Self {
            base_url,
            connect_timeout,
            request_timeout,
            greeting: lookup("CHATLINE_GREETING").unwrap_or(defaults.greeting),
            reset_greeting: lookup("CHATLINE_RESET_GREETING").unwrap_or(defaults.reset_greeting),
        })
    }
}

fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let invalid = |reason: String| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        reason,
    };

    let url = reqwest::Url::parse(trimmed).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", url.scheme())));
    }
    Ok(trimmed.to_string())
}

fn seconds(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<Duration>, ConfigError> {
    lookup(var)
        .map(|value| {
            value
                .trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| ConfigError::InvalidSeconds { var, value })
        })
        .transpose()
}
