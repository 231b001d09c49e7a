//! AI text generation collaborator: one short celebratory post per
//! platform. The core only needs `generate`; the OpenAI wiring stays here.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
const MODEL: &str = "gpt-4o-mini";

#[async_trait]
pub trait PostGenerator: Send + Sync {
    async fn generate(
        &self,
        platform: &str,
        title: &str,
        description: &str,
    ) -> anyhow::Result<String>;
}

pub struct OpenAiGenerator {
    http: reqwest::Client,
    api_key: String,
}

impl OpenAiGenerator {
    pub fn new(http: reqwest::Client, api_key: String) -> Self {
        Self { http, api_key }
    }

    fn prompt(platform: &str, title: &str, description: &str) -> String {
        let char_limit = if platform == "twitter" {
            "\n- Keep under 280 characters"
        } else {
            ""
        };
        format!(
            "Generate a celebratory social media post for {platform} announcing completion of this goal:\n\n\
             Title: {title}\n\
             Description: {description}\n\n\
             Requirements for {platform}:\n\
             - Authentic and personal tone\n\
             - 1-3 sentences\n\
             - Include relevant emoji\n\
             - No generic corporate speak{char_limit}\n"
        )
    }
}

#[async_trait]
impl PostGenerator for OpenAiGenerator {
    async fn generate(
        &self,
        platform: &str,
        title: &str,
        description: &str,
    ) -> anyhow::Result<String> {
        let body = json!({
            "model": MODEL,
            "messages": [{ "role": "user", "content": Self::prompt(platform, title, description) }],
            "max_tokens": 100
        });

        let response = self
            .http
            .post(CHAT_COMPLETIONS_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("generation request failed: {status}: {text}");
        }

        let data: Value = response.json().await?;
        let content = data["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("generation reply missing content"))?
            .trim()
            .to_string();

        debug!(platform, chars = content.len(), "post generated");
        Ok(content)
    }
}

/// Used when no API key is configured; goals are created without posts.
pub struct DisabledGenerator;

#[async_trait]
impl PostGenerator for DisabledGenerator {
    async fn generate(
        &self,
        _platform: &str,
        _title: &str,
        _description: &str,
    ) -> anyhow::Result<String> {
        anyhow::bail!("post generation disabled (OPENAI_API_KEY not set)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twitter_prompt_carries_character_limit() {
        let prompt = OpenAiGenerator::prompt("twitter", "Run a 10k", "Sub 50 minutes");
        assert!(prompt.contains("Keep under 280 characters"));
        assert!(prompt.contains("Run a 10k"));
    }

    #[test]
    fn other_platforms_have_no_character_limit() {
        let prompt = OpenAiGenerator::prompt("linkedin", "Run a 10k", "Sub 50 minutes");
        assert!(!prompt.contains("280"));
    }
}
