//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional:
//! - `ZODIACO_API_URL` - Base URL of the REST API (default: `http://localhost:5000/api/v1`)
//! - `ZODIACO_DATA_DIR` - Directory for the local cart and token files (default: `.zodiaco`)
//! - `ZODIACO_REQUEST_TIMEOUT_SECS` - Per-request timeout in seconds (default: 30)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Default API endpoint for local development.
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api/v1";

/// Default directory for local durable storage.
pub const DEFAULT_DATA_DIR: &str = ".zodiaco";

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorefrontConfig {
    /// Base URL of the REST API, without a trailing slash.
    pub api_url: Url,
    /// Directory holding the local cart and token entries.
    pub data_dir: PathBuf,
    /// Timeout applied to every HTTP request.
    pub request_timeout: Duration,
    /// Sentry DSN for error tracking.
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g. `production`).
    pub sentry_environment: Option<String>,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_url = parse_api_url(
            &lookup("ZODIACO_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        )?;

        let data_dir = lookup("ZODIACO_DATA_DIR")
            .filter(|dir| !dir.trim().is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_DATA_DIR), PathBuf::from);

        let timeout_secs = match lookup("ZODIACO_REQUEST_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| {
                    ConfigError::InvalidEnvVar(
                        "ZODIACO_REQUEST_TIMEOUT_SECS".to_string(),
                        format!("expected a positive number of seconds, got '{raw}'"),
                    )
                })?,
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
        };

        Ok(Self {
            api_url,
            data_dir,
            request_timeout: Duration::from_secs(timeout_secs),
            sentry_dsn: lookup("SENTRY_DSN").filter(|dsn| !dsn.is_empty()),
            sentry_environment: lookup("SENTRY_ENVIRONMENT").filter(|env| !env.is_empty()),
        })
    }

    /// Configuration pointing at a specific API, with defaults elsewhere.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `api_url` is not an absolute http(s) URL.
    pub fn for_api(api_url: &str) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| (key == "ZODIACO_API_URL").then(|| api_url.to_string()))
    }
}

/// Parse and normalize the API base URL.
///
/// The trailing slash is dropped so endpoint paths can be appended verbatim.
fn parse_api_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |msg: String| ConfigError::InvalidEnvVar("ZODIACO_API_URL".to_string(), msg);

    let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(invalid("URL must have a host".to_string()));
    }

    let trimmed = url.as_str().trim_end_matches('/').to_string();
    Url::parse(&trimmed).map_err(|e| invalid(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = StorefrontConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.api_url.as_str(), DEFAULT_API_URL);
        assert_eq!(config.data_dir, PathBuf::from(".zodiaco"));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_api_url_trailing_slash_is_dropped() {
        let config = StorefrontConfig::from_lookup(lookup(&[(
            "ZODIACO_API_URL",
            "https://api.zodiaco.co/api/v1/",
        )]))
        .unwrap();
        assert_eq!(config.api_url.as_str(), "https://api.zodiaco.co/api/v1");
    }

    #[test]
    fn test_invalid_api_url() {
        let err = StorefrontConfig::from_lookup(lookup(&[("ZODIACO_API_URL", "not a url")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref var, _) if var == "ZODIACO_API_URL"));

        let err = StorefrontConfig::from_lookup(lookup(&[("ZODIACO_API_URL", "ftp://host/api")]))
            .unwrap_err();
        assert!(err.to_string().contains("unsupported scheme"));
    }

    #[test]
    fn test_timeout_parsing() {
        let config =
            StorefrontConfig::from_lookup(lookup(&[("ZODIACO_REQUEST_TIMEOUT_SECS", "5")])).unwrap();
        assert_eq!(config.request_timeout, Duration::from_secs(5));

        assert!(
            StorefrontConfig::from_lookup(lookup(&[("ZODIACO_REQUEST_TIMEOUT_SECS", "0")])).is_err()
        );
        assert!(
            StorefrontConfig::from_lookup(lookup(&[("ZODIACO_REQUEST_TIMEOUT_SECS", "soon")]))
                .is_err()
        );
    }

    #[test]
    fn test_for_api() {
        let config = StorefrontConfig::for_api("http://127.0.0.1:8080/api/v1").unwrap();
        assert_eq!(config.api_url.as_str(), "http://127.0.0.1:8080/api/v1");
        assert_eq!(config.data_dir, PathBuf::from(DEFAULT_DATA_DIR));
    }
}
