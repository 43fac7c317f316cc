// SPDX-License-Identifier: MIT

//! Vidtube user-account backend.
//!
//! Registration, login, logout, and token refresh over HTTP, backed by
//! Firestore. Sessions use paired access/refresh JWTs with single-active
//! refresh-token rotation and reuse detection.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use auth::TokenIssuer;
use config::Config;
use db::FirestoreDb;
use services::SessionService;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub tokens: TokenIssuer,
    pub sessions: SessionService,
}

impl AppState {
    pub fn new(config: Config, db: FirestoreDb) -> Self {
        let tokens = TokenIssuer::from_config(&config);
        let sessions = SessionService::new(db.clone(), tokens.clone());
        Self {
            config,
            db,
            tokens,
            sessions,
        }
    }
}
