// SPDX-License-Identifier: MIT

//! Application configuration loaded from environment variables.
//!
//! Signing secrets and token lifetimes are read once at startup and kept
//! as immutable process-wide state. A missing secret aborts startup.

use std::env;

/// Default access token lifetime: 1 day.
const DEFAULT_ACCESS_TOKEN_TTL_SECS: u64 = 24 * 60 * 60;
/// Default refresh token lifetime: 10 days.
const DEFAULT_REFRESH_TOKEN_TTL_SECS: u64 = 10 * 24 * 60 * 60;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend URL for CORS
    pub frontend_url: String,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,

    /// Signing secret for access tokens (raw bytes)
    pub access_token_secret: Vec<u8>,
    /// Signing secret for refresh tokens (raw bytes, distinct from access)
    pub refresh_token_secret: Vec<u8>,
    /// Access token lifetime in seconds
    pub access_token_ttl_secs: u64,
    /// Refresh token lifetime in seconds
    pub refresh_token_ttl_secs: u64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// `ACCESS_TOKEN_SECRET` and `REFRESH_TOKEN_SECRET` are required;
    /// everything else has a development-friendly default.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let access_token_secret = env::var("ACCESS_TOKEN_SECRET")
            .map_err(|_| ConfigError::Missing("ACCESS_TOKEN_SECRET"))?
            .into_bytes();
        let refresh_token_secret = env::var("REFRESH_TOKEN_SECRET")
            .map_err(|_| ConfigError::Missing("REFRESH_TOKEN_SECRET"))?
            .into_bytes();

        // A shared secret would make refresh tokens usable as access
        // tokens and vice versa.
        if access_token_secret == refresh_token_secret {
            return Err(ConfigError::Invalid(
                "ACCESS_TOKEN_SECRET and REFRESH_TOKEN_SECRET must differ",
            ));
        }

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            access_token_secret,
            refresh_token_secret,
            access_token_ttl_secs: parse_ttl("ACCESS_TOKEN_TTL_SECS", DEFAULT_ACCESS_TOKEN_TTL_SECS),
            refresh_token_ttl_secs: parse_ttl(
                "REFRESH_TOKEN_TTL_SECS",
                DEFAULT_REFRESH_TOKEN_TTL_SECS,
            ),
        })
    }

    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            access_token_secret: b"test_access_key_32_bytes_long!!!".to_vec(),
            refresh_token_secret: b"test_refresh_key_32_bytes_long!!".to_vec(),
            access_token_ttl_secs: DEFAULT_ACCESS_TOKEN_TTL_SECS,
            refresh_token_ttl_secs: DEFAULT_REFRESH_TOKEN_TTL_SECS,
        }
    }
}

fn parse_ttl(var: &str, default: u64) -> u64 {
    env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}
