mod dto;
pub mod handlers;
pub mod repo;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::account_routes()
}

/// Mounted under /api for compatibility with the mobile client.
pub fn device_router() -> Router<AppState> {
    handlers::device_routes()
}
