//! LinkedIn OAuth 2.0 (plain state, no PKCE).

use serde_json::Value;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::oauth::OAuthError;
use crate::social::repo::{NewSocialAccount, SocialAccount, SocialAccountInfo};
use crate::state::AppState;

const AUTHORIZE_URL: &str = "https://www.linkedin.com/oauth/v2/authorization";
const TOKEN_URL: &str = "https://www.linkedin.com/oauth/v2/accessToken";
const USERINFO_URL: &str = "https://api.linkedin.com/v2/userinfo";
const SCOPE: &str = "openid profile email w_member_social";

pub fn authorization_url(state: &AppState, user_id: Uuid) -> String {
    let csrf_state = state.oauth_states.issue(user_id, None);
    let oauth = &state.config.linkedin;
    format!(
        "{AUTHORIZE_URL}?response_type=code&client_id={}&redirect_uri={}&state={}&scope={}",
        oauth.client_id,
        oauth.redirect_uri,
        csrf_state,
        SCOPE.replace(' ', "%20"),
    )
}

pub async fn complete(
    state: &AppState,
    user_id: Uuid,
    code: &str,
    csrf_state: &str,
) -> Result<SocialAccountInfo, OAuthError> {
    state
        .oauth_states
        .consume(csrf_state, user_id)
        .ok_or(OAuthError::InvalidState)?;

    let oauth = &state.config.linkedin;
    let token_response = state
        .http
        .post(TOKEN_URL)
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", &oauth.redirect_uri),
            ("client_id", &oauth.client_id),
            ("client_secret", &oauth.client_secret),
        ])
        .send()
        .await?;

    if !token_response.status().is_success() {
        return Err(OAuthError::Exchange(
            token_response.text().await.unwrap_or_default(),
        ));
    }
    let token_data: Value = token_response.json().await?;
    let access_token = token_data["access_token"]
        .as_str()
        .ok_or_else(|| OAuthError::Exchange("reply missing access_token".into()))?;

    let user_response = state
        .http
        .get(USERINFO_URL)
        .bearer_auth(access_token)
        .send()
        .await?;
    if !user_response.status().is_success() {
        return Err(OAuthError::Profile(
            user_response.text().await.unwrap_or_default(),
        ));
    }
    let profile: Value = user_response.json().await?;

    let username = profile["name"]
        .as_str()
        .or_else(|| profile["email"].as_str())
        .unwrap_or("Unknown")
        .to_string();

    // LinkedIn tokens expire in 60 days
    let expires_in = token_data["expires_in"].as_i64().unwrap_or(5_184_000);
    let refresh_token = token_data["refresh_token"].as_str().unwrap_or_default();

    let account = NewSocialAccount {
        user_id,
        platform: "linkedin".into(),
        platform_user_id: profile["sub"].as_str().unwrap_or_default().into(),
        username,
        access_token_encrypted: state.vault.encrypt(access_token)?,
        refresh_token_encrypted: Some(state.vault.encrypt(refresh_token)?),
        token_expires_at: Some(OffsetDateTime::now_utc() + Duration::seconds(expires_in)),
    };

    let info = SocialAccount::upsert(&state.db, account).await?;
    Ok(info)
}
