//! Twitter OAuth 2.0 with PKCE (S256).

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde_json::Value;
use sha2::{Digest, Sha256};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::oauth::state_store::random_token;
use crate::oauth::OAuthError;
use crate::social::repo::{NewSocialAccount, SocialAccount, SocialAccountInfo};
use crate::state::AppState;

const AUTHORIZE_URL: &str = "https://twitter.com/i/oauth2/authorize";
const TOKEN_URL: &str = "https://api.twitter.com/2/oauth2/token";
const ME_URL: &str = "https://api.twitter.com/2/users/me";
const SCOPE: &str = "tweet.read tweet.write users.read offline.access";

fn code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Build the authorization URL and park state + verifier in the store.
pub fn authorization_url(state: &AppState, user_id: Uuid) -> String {
    let verifier = random_token();
    let challenge = code_challenge(&verifier);
    let csrf_state = state.oauth_states.issue(user_id, Some(verifier));

    let oauth = &state.config.twitter;
    format!(
        "{AUTHORIZE_URL}?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}&code_challenge={}&code_challenge_method=S256",
        oauth.client_id,
        oauth.redirect_uri,
        SCOPE.replace(' ', "%20"),
        csrf_state,
        challenge,
    )
}

/// Exchange the callback code, fetch the profile, store the encrypted
/// tokens; upserts on (user, platform).
pub async fn complete(
    state: &AppState,
    user_id: Uuid,
    code: &str,
    csrf_state: &str,
) -> Result<SocialAccountInfo, OAuthError> {
    let flow = state
        .oauth_states
        .consume(csrf_state, user_id)
        .ok_or(OAuthError::InvalidState)?;
    let verifier = flow.pkce_verifier.ok_or(OAuthError::InvalidState)?;

    let oauth = &state.config.twitter;
    let token_response = state
        .http
        .post(TOKEN_URL)
        .basic_auth(&oauth.client_id, Some(&oauth.client_secret))
        .form(&[
            ("code", code),
            ("grant_type", "authorization_code"),
            ("client_id", &oauth.client_id),
            ("redirect_uri", &oauth.redirect_uri),
            ("code_verifier", &verifier),
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
        .get(ME_URL)
        .bearer_auth(access_token)
        .send()
        .await?;
    if !user_response.status().is_success() {
        return Err(OAuthError::Profile(
            user_response.text().await.unwrap_or_default(),
        ));
    }
    let profile: Value = user_response.json().await?;
    let twitter_user = &profile["data"];

    // Twitter access tokens expire in 2 hours
    let expires_in = token_data["expires_in"].as_i64().unwrap_or(7200);
    let refresh_token = token_data["refresh_token"].as_str().unwrap_or_default();

    let account = NewSocialAccount {
        user_id,
        platform: "twitter".into(),
        platform_user_id: twitter_user["id"].as_str().unwrap_or_default().into(),
        username: twitter_user["username"].as_str().unwrap_or_default().into(),
        access_token_encrypted: state.vault.encrypt(access_token)?,
        refresh_token_encrypted: Some(state.vault.encrypt(refresh_token)?),
        token_expires_at: Some(OffsetDateTime::now_utc() + Duration::seconds(expires_in)),
    };

    let info = SocialAccount::upsert(&state.db, account).await?;
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn challenge_is_urlsafe_sha256_of_verifier() {
        // RFC 7636 appendix B test vector
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        assert_eq!(
            code_challenge(verifier),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }
}
