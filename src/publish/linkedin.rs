use async_trait::async_trait;
use serde_json::json;

use crate::config::OAuthProviderConfig;
use crate::social::repo::SocialAccount;

use super::{Platform, PlatformPort, PortReply, TokenGrant};

const UGC_POST_URL: &str = "https://api.linkedin.com/v2/ugcPosts";
const TOKEN_URL: &str = "https://www.linkedin.com/oauth/v2/accessToken";

/// LinkedIn UGC posts. Requires the structured share payload with the
/// member URN as author and the Restli protocol header; both 200 and 201
/// count as published.
pub struct LinkedinPort {
    http: reqwest::Client,
    oauth: OAuthProviderConfig,
}

impl LinkedinPort {
    pub fn new(http: reqwest::Client, oauth: OAuthProviderConfig) -> Self {
        Self { http, oauth }
    }
}

#[async_trait]
impl PlatformPort for LinkedinPort {
    fn platform(&self) -> Platform {
        Platform::Linkedin
    }

    async fn publish(
        &self,
        text: &str,
        account: &SocialAccount,
        access_token: &str,
    ) -> anyhow::Result<PortReply> {
        let payload = json!({
            "author": format!("urn:li:person:{}", account.platform_user_id),
            "lifecycleState": "PUBLISHED",
            "specificContent": {
                "com.linkedin.ugc.ShareContent": {
                    "shareCommentary": { "text": text },
                    "shareMediaCategory": "NONE"
                }
            },
            "visibility": { "com.linkedin.ugc.MemberNetworkVisibility": "PUBLIC" }
        });

        let response = self
            .http
            .post(UGC_POST_URL)
            .bearer_auth(access_token)
            .header("X-Restli-Protocol-Version", "2.0.0")
            .json(&payload)
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
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", &self.oauth.client_id),
                ("client_secret", &self.oauth.client_secret),
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
            // LinkedIn tokens last ~60 days
            expires_in: data["expires_in"].as_i64().unwrap_or(5_184_000),
        })
    }

    fn accepts(&self, status: u16) -> bool {
        matches!(status, 200 | 201)
    }
}
