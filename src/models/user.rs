// SPDX-License-Identifier: MIT

//! User model for storage and API.

use serde::{Deserialize, Serialize};

/// User account stored in Firestore.
///
/// `password_hash` and `refresh_token` never leave the credential store
/// and session layer; API responses use [`UserProfile`] instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// UUID v4, also used as document ID
    pub id: String,
    /// Unique handle, stored lowercased
    pub username: String,
    /// Unique email, stored lowercased
    pub email: String,
    /// Display name
    pub fullname: String,
    /// Argon2id PHC string
    pub password_hash: String,
    /// Avatar URL (owned by the external upload service)
    pub avatar: Option<String>,
    /// Cover image URL
    pub cover_image: Option<String>,
    /// Currently valid refresh token; at most one live value.
    /// None once the user has logged out.
    pub refresh_token: Option<String>,
    /// Creation timestamp (RFC3339)
    pub created_at: String,
    /// Last mutation timestamp (RFC3339)
    pub updated_at: String,
}

/// Sanitized user view returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    pub fullname: String,
    pub avatar: Option<String>,
    pub cover_image: Option<String>,
    pub created_at: String,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            fullname: user.fullname.clone(),
            avatar: user.avatar.clone(),
            cover_image: user.cover_image.clone(),
            created_at: user.created_at.clone(),
        }
    }
}
