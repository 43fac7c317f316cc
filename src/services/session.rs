// SPDX-License-Identifier: MIT

//! Session lifecycle orchestration.
//!
//! Drives the account state machine (anonymous → authenticated →
//! refreshed → logged out) over the credential store, the password
//! hasher, and the token issuer. Every login and refresh rotates the
//! stored refresh token; exactly one value is valid per user at any
//! time, and presenting a superseded one is treated as reuse.

use crate::auth::password::{hash_password, verify_password, PasswordError};
use crate::auth::token::TokenIssuer;
use crate::db::FirestoreDb;
use crate::error::{AppError, Result};
use crate::models::{User, UserProfile};

/// Access/refresh token pair returned by login and refresh.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Fields required to register a new account. Media URLs are opaque
/// strings owned by the external upload service.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub fullname: String,
    pub password: String,
    pub avatar: Option<String>,
    pub cover_image: Option<String>,
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        AppError::Internal(anyhow::anyhow!(err))
    }
}

/// Orchestrates registration, login, refresh, logout, and password change.
#[derive(Clone)]
pub struct SessionService {
    db: FirestoreDb,
    tokens: TokenIssuer,
}

impl SessionService {
    pub fn new(db: FirestoreDb, tokens: TokenIssuer) -> Self {
        Self { db, tokens }
    }

    /// Register a new account after checking username/email uniqueness.
    ///
    /// The check-then-create pair is not transactional; a racing duplicate
    /// registration can slip past it.
    pub async fn register(&self, new_user: NewUser) -> Result<UserProfile> {
        let username = new_user.username.trim().to_lowercase();
        let email = new_user.email.trim().to_lowercase();

        if self.db.find_by_username(&username).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "Username '{}' is already taken",
                username
            )));
        }
        if self.db.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "Email '{}' is already registered",
                email
            )));
        }

        let password_hash = hash_password(&new_user.password)?;
        let now = chrono::Utc::now().to_rfc3339();

        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            username,
            email,
            fullname: new_user.fullname.trim().to_string(),
            password_hash,
            avatar: new_user.avatar,
            cover_image: new_user.cover_image,
            refresh_token: None,
            created_at: now.clone(),
            updated_at: now,
        };

        self.db.create_user(&user).await?;

        tracing::info!(user_id = %user.id, username = %user.username, "User registered");

        Ok(UserProfile::from(&user))
    }

    /// Authenticate with a username-or-email identifier and password.
    ///
    /// On success issues a fresh token pair and overwrites the stored
    /// refresh token, invalidating any previous session.
    pub async fn login(&self, identifier: &str, password: &str) -> Result<(TokenPair, UserProfile)> {
        let identifier = identifier.trim().to_lowercase();

        let user = self
            .db
            .find_by_identifier(&identifier)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No user matching '{}'", identifier)))?;

        if !verify_password(password, &user.password_hash)? {
            tracing::info!(user_id = %user.id, "Login rejected: password mismatch");
            return Err(AppError::InvalidCredentials);
        }

        let access_token = self.tokens.issue_access(&user)?;
        let refresh_token = self.tokens.issue_refresh(&user.id)?;

        // Rotation point: any previously issued refresh token dies here.
        self.db
            .update_refresh_token(&user.id, Some(&refresh_token))
            .await?;

        tracing::info!(user_id = %user.id, username = %user.username, "Login successful");

        Ok((
            TokenPair {
                access_token,
                refresh_token,
            },
            UserProfile::from(&user),
        ))
    }

    /// Exchange a still-valid refresh token for a fresh token pair.
    ///
    /// The presented token must match the stored value byte-for-byte; a
    /// mismatch means it was already rotated away (stale or stolen) and
    /// the session is invalidated instead of silently succeeding.
    pub async fn refresh(&self, presented: Option<&str>) -> Result<TokenPair> {
        let presented = presented.ok_or(AppError::MissingToken)?;

        let claims = self.tokens.verify_refresh(presented).map_err(|e| {
            tracing::info!(reason = %e, "Refresh token verification failed");
            AppError::from(e)
        })?;

        let new_refresh = self.tokens.issue_refresh(&claims.sub)?;

        // Compare-and-rotate against the stored value; also reloads the
        // user so the new access token reflects current identity fields.
        let user = self
            .db
            .rotate_refresh_token(&claims.sub, presented, &new_refresh)
            .await?;

        let access_token = self.tokens.issue_access(&user)?;

        tracing::info!(user_id = %user.id, "Session refreshed");

        Ok(TokenPair {
            access_token,
            refresh_token: new_refresh,
        })
    }

    /// Invalidate the current session by clearing the stored refresh token.
    /// Idempotent: logging out twice is not an error.
    pub async fn logout(&self, user_id: &str) -> Result<()> {
        self.db.update_refresh_token(user_id, None).await?;
        tracing::info!(user_id, "Logged out");
        Ok(())
    }

    /// Change the account password after verifying the current one.
    ///
    /// Outstanding tokens are NOT revoked; they remain valid until their
    /// natural expiry. Known limitation of the single-token revocation model.
    pub async fn change_password(
        &self,
        user_id: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<()> {
        let user = self
            .db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        if !verify_password(current_password, &user.password_hash)? {
            return Err(AppError::InvalidCredentials);
        }

        let new_hash = hash_password(new_password)?;
        self.db.update_password_hash(user_id, &new_hash).await?;

        tracing::info!(user_id, "Password changed");
        Ok(())
    }

    /// Fetch the sanitized profile for an authenticated user.
    pub async fn current_user(&self, user_id: &str) -> Result<UserProfile> {
        let user = self
            .db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        Ok(UserProfile::from(&user))
    }
}
