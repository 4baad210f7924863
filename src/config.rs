// SPDX-License-Identifier: MIT

//! Application configuration loaded from environment variables.
//!
//! Secrets (JWT signing keys) are read once at startup and held in memory;
//! there is no re-read during the process lifetime.

use std::env;

/// How long an access token stays valid (15 minutes).
pub const ACCESS_TOKEN_TTL_SECS: i64 = 15 * 60;

/// How long a refresh token (and its server-side record) stays valid (7 days).
pub const REFRESH_TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend URL allowed by CORS and used in startup logs
    pub frontend_url: String,
    /// Base URL of the external AI transcription service
    pub ai_server_url: String,
    /// Server port
    pub port: u16,
    /// Signing key for short-lived access tokens (raw bytes)
    pub jwt_access_secret: Vec<u8>,
    /// Signing key for refresh tokens (raw bytes, distinct from access key)
    pub jwt_refresh_secret: Vec<u8>,
    /// Minimum accepted password length for registration
    pub min_password_len: usize,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file is honored for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            ai_server_url: env::var("AI_SERVER_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8000".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .unwrap_or(5000),
            jwt_access_secret: env::var("JWT_ACCESS_SECRET")
                .map_err(|_| ConfigError::Missing("JWT_ACCESS_SECRET"))?
                .into_bytes(),
            jwt_refresh_secret: env::var("JWT_REFRESH_SECRET")
                .map_err(|_| ConfigError::Missing("JWT_REFRESH_SECRET"))?
                .into_bytes(),
            min_password_len: env::var("MIN_PASSWORD_LEN")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(6),
        })
    }

    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            ai_server_url: "http://127.0.0.1:8000".to_string(),
            port: 5000,
            jwt_access_secret: b"test_access_key_32_bytes_long!!!".to_vec(),
            jwt_refresh_secret: b"test_refresh_key_32_bytes_long!!".to_vec(),
            min_password_len: 6,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
