//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::auth::TokenIssuer;
use crate::config::Config;
use commit_core::ports::{DatabaseService, TokenStore};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub tokens: Arc<dyn TokenStore>,
    pub issuer: Arc<TokenIssuer>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        tokens: Arc<dyn TokenStore>,
        config: Arc<Config>,
    ) -> Self {
        let issuer = Arc::new(TokenIssuer::new(
            &config.jwt_secret,
            &config.refresh_token_secret,
        ));
        Self {
            db,
            tokens,
            issuer,
            config,
        }
    }
}
