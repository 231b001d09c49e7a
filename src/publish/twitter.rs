use async_trait::async_trait;
use serde_json::json;

use crate::config::OAuthProviderConfig;
use crate::social::repo::SocialAccount;

use super::{Platform, PlatformPort, PortReply, TokenGrant};

const TWEET_URL: &str = "https://api.twitter.com/2/tweets";
const TOKEN_URL: &str = "https://api.twitter.com/2/oauth2/token";

/// Twitter API v2. Tweets are created with a bare `{"text": ...}` payload
/// and acknowledged with 201; access tokens are short-lived (2h) and
/// rotated through the OAuth 2.0 refresh grant.
pub struct TwitterPort {
    http: reqwest::Client,
    oauth: OAuthProviderConfig,
}

impl TwitterPort {
    pub fn new(http: reqwest::Client, oauth: OAuthProviderConfig) -> Self {
        Self { http, oauth }
    }
}

#[async_trait]
impl PlatformPort for TwitterPort {
    fn platform(&self) -> Platform {
        Platform::Twitter
    }

    async fn publish(
        &self,
        text: &str,
        _account: &SocialAccount,
        access_token: &str,
    ) -> anyhow::Result<PortReply> {
        let response = self
            .http
            .post(TWEET_URL)
            .bearer_auth(access_token)
            .json(&json!({ "text": text }))
            .send()
            .await?;

        Ok(PortReply {
            status: response.status().as_u16(),
            body: response.text().await.unwrap_or_default(),
        })
    }

    async fn refresh(&self, refresh_token: &str) -> anyhow::Result<TokenGrant> {
        let response = self
            .http
            .post(TOKEN_URL)
            .basic_auth(&self.oauth.client_id, Some(&self.oauth.client_secret))
            .form(&[
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
                ("client_id", &self.oauth.client_id),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Token refresh failed: {status}: {body}");
        }

        let data: serde_json::Value = response.json().await?;
        let access_token = data["access_token"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("refresh reply missing access_token"))?
            .to_string();

        Ok(TokenGrant {
            access_token,
            refresh_token: data["refresh_token"].as_str().map(str::to_string),
            expires_in: data["expires_in"].as_i64().unwrap_or(7200),
        })
    }

    fn accepts(&self, status: u16) -> bool {
        status == 201
    }
}
