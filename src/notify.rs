//! Push delivery behind a narrow seam: the loops only care about a boolean
//! delivered/not-delivered answer.

use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

#[async_trait]
pub trait PushGateway: Send + Sync {
    /// Fire one push at a device token. `Ok(false)` means the transport
    /// answered but did not deliver; errors are transport failures.
    async fn send(
        &self,
        device_token: &str,
        title: &str,
        body: &str,
        goal_id: Uuid,
        preview: &str,
    ) -> anyhow::Result<bool>;
}

const FCM_SEND_URL: &str = "https://fcm.googleapis.com/fcm/send";

/// Firebase Cloud Messaging gateway.
pub struct FcmGateway {
    http: reqwest::Client,
    server_key: String,
}

impl FcmGateway {
    pub fn new(http: reqwest::Client, server_key: String) -> Self {
        Self { http, server_key }
    }
}

#[async_trait]
impl PushGateway for FcmGateway {
    async fn send(
        &self,
        device_token: &str,
        title: &str,
        body: &str,
        goal_id: Uuid,
        preview: &str,
    ) -> anyhow::Result<bool> {
        let payload = json!({
            "to": device_token,
            "notification": { "title": title, "body": body },
            "data": {
                "goal_id": goal_id,
                "preview": preview,
                "type": "goal_deadline"
            }
        });

        let response = self
            .http
            .post(FCM_SEND_URL)
            .header("Authorization", format!("key={}", self.server_key))
            .json(&payload)
            .send()
            .await?;

        if response.status().is_success() {
            info!(%goal_id, "push notification sent");
            Ok(true)
        } else {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            warn!(%goal_id, %status, body = %text, "push notification rejected");
            Ok(false)
        }
    }
}

/// Stand-in when no FCM credential is configured; reports non-delivery so
/// the notified flag is never set on a silent drop.
pub struct DisabledPush;

#[async_trait]
impl PushGateway for DisabledPush {
    async fn send(
        &self,
        _device_token: &str,
        _title: &str,
        _body: &str,
        goal_id: Uuid,
        _preview: &str,
    ) -> anyhow::Result<bool> {
        warn!(%goal_id, "push disabled (FCM_SERVER_KEY not set), notification dropped");
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_push_reports_non_delivery() {
        // Non-delivery keeps notification_sent false, so nothing is
        // silently marked notified on a misconfigured deployment.
        let delivered = DisabledPush
            .send("token", "title", "body", Uuid::new_v4(), "preview")
            .await
            .unwrap();
        assert!(!delivered);
    }
}
