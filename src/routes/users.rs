// SPDX-License-Identifier: MIT

//! User account and session routes.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::middleware::auth::{AuthUser, ACCESS_TOKEN_COOKIE};
use crate::models::UserProfile;
use crate::services::{NewUser, TokenPair};
use crate::AppState;

/// Cookie carrying the refresh token.
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

/// Public session routes (no access token required).
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/users/register", post(register))
        .route("/api/v1/users/login", post(login))
        .route("/api/v1/users/refresh-token", post(refresh))
}

/// Protected session routes (auth middleware applied in routes/mod.rs).
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/users/logout", post(logout))
        .route("/api/v1/users/change-password", post(change_password))
        .route("/api/v1/users/me", get(get_me))
}

// ─── Registration ────────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "username is required"))]
    username: String,
    #[validate(email(message = "email must be a valid address"))]
    email: String,
    #[validate(length(min = 1, message = "fullname is required"))]
    fullname: String,
    #[validate(length(min = 1, message = "password is required"))]
    password: String,
    /// Opaque URL from the external upload service
    #[serde(default)]
    avatar: Option<String>,
    #[serde(default)]
    cover_image: Option<String>,
}

/// Register a new user account.
async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let profile = state
        .sessions
        .register(NewUser {
            username: payload.username,
            email: payload.email,
            fullname: payload.fullname,
            password: payload.password,
            avatar: payload.avatar,
            cover_image: payload.cover_image,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(profile)))
}

// ─── Login ───────────────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    /// Username or email
    #[validate(length(min = 1, message = "identifier is required"))]
    identifier: String,
    #[validate(length(min = 1, message = "password is required"))]
    password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub user: UserProfile,
    /// Tokens are also set as http-only cookies; the body copy is for
    /// clients that cannot use them.
    pub access_token: String,
    pub refresh_token: String,
}

/// Authenticate and start a session.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let (pair, user) = state
        .sessions
        .login(&payload.identifier, &payload.password)
        .await?;

    let jar = add_session_cookies(jar, &state.config, &pair);

    Ok((
        jar,
        Json(LoginResponse {
            user,
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        }),
    ))
}

// ─── Refresh ─────────────────────────────────────────────────

#[derive(Deserialize, Default)]
pub struct RefreshRequest {
    refresh_token: Option<String>,
}

#[derive(Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
}

/// Exchange a refresh token for a new token pair.
///
/// The token is read from the `refresh_token` cookie, falling back to
/// the request body.
async fn refresh(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    body: Option<Json<RefreshRequest>>,
) -> Result<impl IntoResponse> {
    let from_cookie = jar.get(REFRESH_TOKEN_COOKIE).map(|c| c.value().to_string());
    let from_body = body.and_then(|Json(b)| b.refresh_token);
    let presented = from_cookie.or(from_body);

    let pair = state.sessions.refresh(presented.as_deref()).await?;

    let jar = add_session_cookies(jar, &state.config, &pair);

    Ok((
        jar,
        Json(RefreshResponse {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        }),
    ))
}

// ─── Logout ──────────────────────────────────────────────────

/// End the session: revoke the stored refresh token, remove cookies.
async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    jar: CookieJar,
) -> Result<impl IntoResponse> {
    state.sessions.logout(&user.user_id).await?;

    let jar = add_removal_cookies(jar, &state.config);

    Ok((jar, StatusCode::NO_CONTENT))
}

// ─── Password Change ─────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "current_password is required"))]
    current_password: String,
    #[validate(length(min = 1, message = "new_password is required"))]
    new_password: String,
}

#[derive(Serialize)]
pub struct ChangePasswordResponse {
    pub success: bool,
}

/// Change the caller's password after verifying the current one.
async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<ChangePasswordResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    state
        .sessions
        .change_password(&user.user_id, &payload.current_password, &payload.new_password)
        .await?;

    Ok(Json(ChangePasswordResponse { success: true }))
}

// ─── Current User ────────────────────────────────────────────

/// Get the authenticated user's profile.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserProfile>> {
    let profile = state.sessions.current_user(&user.user_id).await?;
    Ok(Json(profile))
}

// ─── Cookie Helpers ──────────────────────────────────────────

/// Secure cookies everywhere except plain-http localhost development.
fn cookies_are_secure(config: &Config) -> bool {
    config.frontend_url.starts_with("https://")
}

fn session_cookie(name: &'static str, value: String, max_age_secs: u64, secure: bool) -> Cookie<'static> {
    let mut cookie = Cookie::new(name, value);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_secure(secure);
    cookie.set_max_age(time::Duration::seconds(max_age_secs as i64));
    cookie
}

fn add_session_cookies(jar: CookieJar, config: &Config, pair: &TokenPair) -> CookieJar {
    let secure = cookies_are_secure(config);
    jar.add(session_cookie(
        ACCESS_TOKEN_COOKIE,
        pair.access_token.clone(),
        config.access_token_ttl_secs,
        secure,
    ))
    .add(session_cookie(
        REFRESH_TOKEN_COOKIE,
        pair.refresh_token.clone(),
        config.refresh_token_ttl_secs,
        secure,
    ))
}

/// Removal cookies must match the creation attributes or browsers will
/// keep the originals.
fn add_removal_cookies(jar: CookieJar, config: &Config) -> CookieJar {
    let secure = cookies_are_secure(config);
    jar.add(session_cookie(ACCESS_TOKEN_COOKIE, String::new(), 0, secure))
        .add(session_cookie(REFRESH_TOKEN_COOKIE, String::new(), 0, secure))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_localhost_attributes() {
        let config = Config::test_default();
        assert!(!cookies_are_secure(&config));

        let cookie = session_cookie(ACCESS_TOKEN_COOKIE, "tok".to_string(), 3600, false);
        let rendered = cookie.to_string();

        assert!(rendered.contains("Path=/"));
        assert!(rendered.contains("HttpOnly"));
        assert!(rendered.contains("SameSite=Lax"));
        assert!(rendered.contains("Max-Age=3600"));
        assert!(!rendered.contains("Secure"));
    }

    #[test]
    fn test_session_cookie_production_attributes() {
        let mut config = Config::test_default();
        config.frontend_url = "https://vidtube.example.com".to_string();
        assert!(cookies_are_secure(&config));

        let cookie = session_cookie(REFRESH_TOKEN_COOKIE, "tok".to_string(), 3600, true);
        let rendered = cookie.to_string();

        assert!(rendered.contains("HttpOnly"));
        assert!(rendered.contains("Secure"));
    }

    #[test]
    fn test_removal_cookies_expire_both_tokens() {
        let config = Config::test_default();
        let jar = add_removal_cookies(CookieJar::default(), &config);

        let rendered: Vec<String> = jar.iter().map(|c| c.to_string()).collect();
        assert_eq!(rendered.len(), 2);
        for cookie in &rendered {
            assert!(cookie.contains("Max-Age=0"));
            assert!(cookie.contains("Path=/"));
        }
    }

    #[test]
    fn test_register_request_validation() {
        let valid = RegisterRequest {
            username: "alice".to_string(),
            email: "alice@x.com".to_string(),
            fullname: "Alice".to_string(),
            password: "pw123".to_string(),
            avatar: None,
            cover_image: None,
        };
        assert!(valid.validate().is_ok());

        let empty_username = RegisterRequest {
            username: String::new(),
            ..valid_clone(&valid)
        };
        assert!(empty_username.validate().is_err());

        let bad_email = RegisterRequest {
            email: "not-an-email".to_string(),
            ..valid_clone(&valid)
        };
        assert!(bad_email.validate().is_err());
    }

    fn valid_clone(req: &RegisterRequest) -> RegisterRequest {
        RegisterRequest {
            username: req.username.clone(),
            email: req.email.clone(),
            fullname: req.fullname.clone(),
            password: req.password.clone(),
            avatar: req.avatar.clone(),
            cover_image: req.cover_image.clone(),
        }
    }
}
