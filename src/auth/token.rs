// SPDX-License-Identifier: MIT

//! Session token issuance and verification.
//!
//! Two token classes, each signed with its own HS256 secret: a short-lived
//! access token carrying stable identity claims, and a long-lived refresh
//! token carrying only the user id. Rotation bookkeeping (persisting the
//! refresh token on the user record) belongs to the session layer, not here.

use jsonwebtoken::{
    decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::Config;
use crate::error::AppError;
use crate::models::User;

/// Claims carried by an access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AccessClaims {
    /// Subject (user id)
    pub sub: String,
    pub username: String,
    pub email: String,
    /// Issued at (Unix timestamp)
    pub iat: usize,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
}

/// Claims carried by a refresh token. Identity reference only.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RefreshClaims {
    /// Subject (user id)
    pub sub: String,
    /// Per-issuance nonce. Timestamps have second granularity, so without
    /// it two rotations in the same second would mint identical strings
    /// and the superseded token would stay valid.
    pub jti: String,
    pub iat: usize,
    pub exp: usize,
}

/// Verification and signing failures, categorized so callers can react
/// differently to an expired token vs. a tampered one.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token is malformed")]
    Malformed,

    #[error("Token signature mismatch")]
    SignatureMismatch,

    #[error("Token is expired")]
    Expired,

    #[error("Token is missing required claims")]
    MissingClaims,

    #[error("Failed to sign token: {0}")]
    Signing(String),
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Signing(msg) => {
                AppError::Internal(anyhow::anyhow!("Token signing failed: {}", msg))
            }
            _ => AppError::InvalidToken,
        }
    }
}

fn categorize(err: jsonwebtoken::errors::Error) -> TokenError {
    use jsonwebtoken::errors::ErrorKind;

    match err.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::InvalidSignature => TokenError::SignatureMismatch,
        // Claims deserialized into a struct with mandatory fields, so a
        // structurally valid JWT without them fails JSON decoding.
        ErrorKind::Json(_) | ErrorKind::MissingRequiredClaim(_) => TokenError::MissingClaims,
        _ => TokenError::Malformed,
    }
}

/// Issues and verifies both token classes. Pure function of identity,
/// secret, and clock; holds no mutable state and is cheap to clone.
#[derive(Clone)]
pub struct TokenIssuer {
    access_secret: Vec<u8>,
    refresh_secret: Vec<u8>,
    access_ttl_secs: u64,
    refresh_ttl_secs: u64,
}

impl TokenIssuer {
    pub fn from_config(config: &Config) -> Self {
        Self {
            access_secret: config.access_token_secret.clone(),
            refresh_secret: config.refresh_token_secret.clone(),
            access_ttl_secs: config.access_token_ttl_secs,
            refresh_ttl_secs: config.refresh_token_ttl_secs,
        }
    }

    /// Issue a short-lived access token for a user.
    pub fn issue_access(&self, user: &User) -> Result<String, TokenError> {
        let now = unix_now();
        let claims = AccessClaims {
            sub: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            iat: now,
            exp: now + self.access_ttl_secs as usize,
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.access_secret),
        )
        .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Issue a long-lived refresh token referencing a user id.
    pub fn issue_refresh(&self, user_id: &str) -> Result<String, TokenError> {
        let now = unix_now();
        let claims = RefreshClaims {
            sub: user_id.to_string(),
            jti: uuid::Uuid::new_v4().to_string(),
            iat: now,
            exp: now + self.refresh_ttl_secs as usize,
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.refresh_secret),
        )
        .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify an access token: signature, expiry, claim structure.
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let key = DecodingKey::from_secret(&self.access_secret);
        let validation = Validation::new(Algorithm::HS256);

        decode::<AccessClaims>(token, &key, &validation)
            .map(|data| data.claims)
            .map_err(categorize)
    }

    /// Verify a refresh token against the refresh-token secret.
    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        let key = DecodingKey::from_secret(&self.refresh_secret);
        let validation = Validation::new(Algorithm::HS256);

        decode::<RefreshClaims>(token, &key, &validation)
            .map(|data| data.claims)
            .map_err(categorize)
    }
}

fn unix_now() -> usize {
    // Pre-1970 system clocks are not a supported configuration.
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as usize)
        .unwrap_or(0)
}
