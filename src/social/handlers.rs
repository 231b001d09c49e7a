use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::AuthUser,
    publish::Platform,
    social::dto::{DisconnectResponse, FcmTokenRequest, OkResponse},
    social::repo::{DeviceRegistration, SocialAccount, SocialAccountInfo},
    state::AppState,
};

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/accounts", get(list_accounts))
        .route("/accounts/:platform", delete(disconnect_account))
}

pub fn device_routes() -> Router<AppState> {
    Router::new().route("/user/fcm-token", post(update_fcm_token))
}

#[instrument(skip(state))]
pub async fn list_accounts(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<SocialAccountInfo>>, (StatusCode, String)> {
    let accounts = SocialAccount::list_for_user(&state.db, user_id)
        .await
        .map_err(|e| {
            error!(error = %e, %user_id, "list social accounts failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;
    Ok(Json(accounts))
}

#[instrument(skip(state))]
pub async fn disconnect_account(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(platform): Path<String>,
) -> Result<Json<DisconnectResponse>, (StatusCode, String)> {
    let platform: Platform = platform
        .parse()
        .map_err(|_| (StatusCode::BAD_REQUEST, format!("Unknown platform: {platform}")))?;

    let deleted = SocialAccount::delete_for_platform(&state.db, user_id, platform.as_str())
        .await
        .map_err(|e| {
            error!(error = %e, %user_id, platform = platform.as_str(), "disconnect failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    if deleted == 0 {
        warn!(%user_id, platform = platform.as_str(), "disconnect: no account connected");
    } else {
        info!(%user_id, platform = platform.as_str(), "social account disconnected");
    }

    Ok(Json(DisconnectResponse {
        success: true,
        message: format!("{} disconnected successfully", platform.as_str()),
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_fcm_token(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<FcmTokenRequest>,
) -> Result<Json<OkResponse>, (StatusCode, String)> {
    if payload.fcm_token.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "fcm_token must be non-empty".into()));
    }
    DeviceRegistration::upsert(&state.db, user_id, payload.fcm_token.trim())
        .await
        .map_err(|e| {
            error!(error = %e, %user_id, "fcm token upsert failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;
    Ok(Json(OkResponse { success: true }))
}
