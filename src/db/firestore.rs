// SPDX-License-Identifier: MIT

//! Firestore client wrapper with typed operations.
//!
//! The credential store for user accounts. Lookups by id, username, or
//! email; creation; and the refresh-token compare-and-rotate step used
//! by the session layer. Password hashes and refresh tokens never leave
//! this layer except through the session manager.

use subtle::ConstantTimeEq;

use crate::db::collections;
use crate::error::AppError;
use crate::models::User;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── User Lookups ────────────────────────────────────────────

    /// Get a user by their id (document id).
    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by exact username.
    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        self.find_by_field("username", username).await
    }

    /// Find a user by exact email.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.find_by_field("email", email).await
    }

    /// Find a user by username or email (login identifier).
    pub async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>, AppError> {
        if let Some(user) = self.find_by_username(identifier).await? {
            return Ok(Some(user));
        }
        self.find_by_email(identifier).await
    }

    async fn find_by_field(&self, field: &str, value: &str) -> Result<Option<User>, AppError> {
        let field = field.to_string();
        let value = value.to_string();

        let users: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.field(field.clone()).eq(value.clone()))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(users.into_iter().next())
    }

    // ─── User Mutations ──────────────────────────────────────────

    /// Create a new user document. Fails if the document id already exists.
    ///
    /// Uniqueness of username/email is checked by the caller before this;
    /// the check-then-create is not transactional.
    pub async fn create_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Overwrite the stored refresh token (login rotation, or None on logout).
    ///
    /// Last-writer-wins: a new login replaces whatever token was stored
    /// before. Missing user is treated as a no-op so logout stays
    /// idempotent. The write is field-masked so a concurrent password
    /// change on the same document is never clobbered.
    pub async fn update_refresh_token(
        &self,
        user_id: &str,
        token: Option<&str>,
    ) -> Result<(), AppError> {
        let Some(mut user) = self.get_user(user_id).await? else {
            return Ok(());
        };

        user.refresh_token = token.map(|t| t.to_string());
        user.updated_at = chrono::Utc::now().to_rfc3339();

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(firestore::paths!(User::{refresh_token, updated_at}))
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(&user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Replace the stored password hash. Field-masked for the same
    /// reason as `update_refresh_token`.
    pub async fn update_password_hash(&self, user_id: &str, hash: &str) -> Result<(), AppError> {
        let Some(mut user) = self.get_user(user_id).await? else {
            return Err(AppError::NotFound(format!("User {} not found", user_id)));
        };

        user.password_hash = hash.to_string();
        user.updated_at = chrono::Utc::now().to_rfc3339();

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(firestore::paths!(User::{password_hash, updated_at}))
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(&user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Refresh Token Rotation (compare-and-swap) ───────────────

    /// Atomically compare the presented refresh token against the stored one
    /// and replace it with `new_token`.
    ///
    /// Runs inside a Firestore transaction so two refresh calls racing on the
    /// same stored value cannot both rotate: the losing writer's commit is
    /// rejected, re-checked, and reported as token reuse.
    ///
    /// Errors: `NotFound` if the user vanished, `TokenReuse` if the presented
    /// token no longer matches the stored value.
    pub async fn rotate_refresh_token(
        &self,
        user_id: &str,
        presented: &str,
        new_token: &str,
    ) -> Result<User, AppError> {
        let client = self.get_client()?;

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        // The read must go through a handle carrying the transaction id,
        // or it never registers for conflict detection and a concurrent
        // rotation would not abort the commit.
        let txn_client = client.clone_with_consistency_selector(
            firestore::FirestoreConsistencySelector::Transaction(
                transaction.transaction_id().clone(),
            ),
        );

        let user: Option<User> = txn_client
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to read user in transaction: {}", e)))?;

        let Some(mut user) = user else {
            let _ = transaction.rollback().await;
            return Err(AppError::NotFound(format!("User {} not found", user_id)));
        };

        if !stored_token_matches(user.refresh_token.as_deref(), presented) {
            // Already rotated away (stale or stolen credential).
            let _ = transaction.rollback().await;
            tracing::warn!(user_id, "Refresh token reuse detected");
            return Err(AppError::TokenReuse);
        }

        user.refresh_token = Some(new_token.to_string());
        user.updated_at = chrono::Utc::now().to_rfc3339();

        client
            .fluent()
            .update()
            .fields(firestore::paths!(User::{refresh_token, updated_at}))
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(&user)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add rotation to transaction: {}", e))
            })?;

        if let Err(commit_err) = transaction.commit().await {
            // A concurrent rotation on the same document aborts this commit.
            // Re-read once to distinguish losing the race from a transient
            // database failure.
            let current = self.get_user(user_id).await?;
            let still_matches = current
                .map(|u| stored_token_matches(u.refresh_token.as_deref(), presented))
                .unwrap_or(false);

            if still_matches {
                return Err(AppError::Database(format!(
                    "Rotation commit failed: {}",
                    commit_err
                )));
            }

            tracing::warn!(user_id, "Refresh token rotated concurrently");
            return Err(AppError::TokenReuse);
        }

        Ok(user)
    }
}

/// Constant-time comparison of the presented token with the stored value.
/// An absent stored value (logged out) never matches.
fn stored_token_matches(stored: Option<&str>, presented: &str) -> bool {
    match stored {
        Some(stored) => stored.as_bytes().ct_eq(presented.as_bytes()).into(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_token_matches() {
        assert!(stored_token_matches(Some("abc.def.ghi"), "abc.def.ghi"));
        assert!(!stored_token_matches(Some("abc.def.ghi"), "abc.def.ghj"));
        assert!(!stored_token_matches(Some("abc"), "abcd"));
        assert!(!stored_token_matches(None, "abc.def.ghi"));
        assert!(!stored_token_matches(Some(""), "x"));
    }

    #[tokio::test]
    async fn test_offline_mock_reports_database_error() {
        let db = FirestoreDb::new_mock();

        let err = db.get_user("u1").await.unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
    }
}
