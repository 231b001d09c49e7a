//! Platform OAuth flows. Each platform module builds its authorization URL
//! and completes the code-for-token exchange; the pending state (and PKCE
//! verifier where used) lives in the TTL-bounded [`StateStore`].

pub mod handlers;
mod linkedin;
mod reddit;
pub mod state_store;
mod twitter;

pub use state_store::StateStore;

use crate::state::AppState;
use crate::vault::CryptoError;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::routes()
}

#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    #[error("Invalid state - possible CSRF attack")]
    InvalidState,
    #[error("Token exchange failed: {0}")]
    Exchange(String),
    #[error("Failed to get user info: {0}")]
    Profile(String),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
