use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Html,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::AuthUser,
    oauth::{linkedin, reddit, twitter, OAuthError},
    social::repo::SocialAccountInfo,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/:platform/connect", get(connect))
        .route("/:platform/callback", get(callback))
        .route("/twitter/complete", post(twitter_complete))
        .route("/linkedin/complete", post(linkedin_complete))
}

#[derive(Debug, Serialize)]
pub struct ConnectResponse {
    pub authorization_url: String,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: String,
    pub state: String,
}

#[derive(Debug, Deserialize)]
pub struct CompleteRequest {
    pub code: String,
    pub state: String,
}

#[derive(Debug, Serialize)]
pub struct CompleteResponse {
    pub success: bool,
    pub account: SocialAccountInfo,
}

#[instrument(skip(state))]
pub async fn connect(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(platform): Path<String>,
) -> Result<Json<ConnectResponse>, (StatusCode, String)> {
    let authorization_url = match platform.as_str() {
        "twitter" => twitter::authorization_url(&state, user_id),
        "linkedin" => linkedin::authorization_url(&state, user_id),
        "reddit" => reddit::authorization_url(&state, user_id),
        other => {
            return Err((
                StatusCode::NOT_FOUND,
                format!("Unknown platform: {other}"),
            ))
        }
    };
    info!(%user_id, %platform, "oauth flow started");
    Ok(Json(ConnectResponse { authorization_url }))
}

/// Landing page for the provider redirect. The browser cannot carry the
/// user's JWT, so this only bounces code and state into the app via deep
/// link; the authenticated `complete` call finishes the flow.
#[instrument(skip(state, query))]
pub async fn callback(
    State(state): State<AppState>,
    Path(platform): Path<String>,
    Query(query): Query<CallbackQuery>,
) -> Html<String> {
    let deep_link = deep_link(&state.config.frontend_url, &query.code, &query.state, &platform);
    Html(format!(
        r#"<html>
    <head><title>Connecting {platform}...</title></head>
    <body>
        <h2>Authorization successful!</h2>
        <p>Redirecting back to app...</p>
        <script>
            window.location.href = '{deep_link}';
            setTimeout(function() {{
                document.body.innerHTML = '<h3>Please return to the app</h3>';
            }}, 2000);
        </script>
    </body>
</html>"#
    ))
}

#[instrument(skip(state, payload))]
pub async fn twitter_complete(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CompleteRequest>,
) -> Result<Json<CompleteResponse>, (StatusCode, String)> {
    let account = twitter::complete(&state, user_id, &payload.code, &payload.state)
        .await
        .map_err(|e| reject("twitter", user_id, e))?;
    Ok(Json(CompleteResponse {
        success: true,
        account,
    }))
}

#[instrument(skip(state, payload))]
pub async fn linkedin_complete(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CompleteRequest>,
) -> Result<Json<CompleteResponse>, (StatusCode, String)> {
    let account = linkedin::complete(&state, user_id, &payload.code, &payload.state)
        .await
        .map_err(|e| reject("linkedin", user_id, e))?;
    Ok(Json(CompleteResponse {
        success: true,
        account,
    }))
}

/// Provider-supplied values are percent-encoded so they cannot break out
/// of the inline script the bounce page embeds the link in.
fn deep_link(frontend_url: &str, code: &str, state: &str, platform: &str) -> String {
    format!(
        "{frontend_url}?code={}&state={}&platform={}",
        urlencoding::encode(code),
        urlencoding::encode(state),
        urlencoding::encode(platform),
    )
}

fn reject(platform: &str, user_id: uuid::Uuid, e: OAuthError) -> (StatusCode, String) {
    match &e {
        OAuthError::InvalidState => {
            warn!(%user_id, platform, "oauth completion with invalid state");
            (StatusCode::BAD_REQUEST, e.to_string())
        }
        _ => {
            error!(error = %e, %user_id, platform, "oauth completion failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deep_link_passes_plain_values_through() {
        let link = deep_link("lockin://oauth/callback", "abc123", "st-ate_1", "twitter");
        assert_eq!(
            link,
            "lockin://oauth/callback?code=abc123&state=st-ate_1&platform=twitter"
        );
    }

    #[test]
    fn deep_link_encodes_script_breaking_characters() {
        let link = deep_link(
            "lockin://oauth/callback",
            "ab'; window.close(); '",
            "st\"ate&extra=1",
            "twitter",
        );
        assert!(!link.contains('\''));
        assert!(!link.contains('"'));
        assert!(!link.contains(' '));
        assert!(link.contains("code=ab%27%3B%20window.close%28%29%3B%20%27"));
        assert!(link.contains("state=st%22ate%26extra%3D1"));
    }
}
