use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::{http_client, read_json, Provider};
use crate::errors::ProviderError;

const DEFAULT_BASE: &str = "https://api.openai.com";

/// OpenAI chat completions; the whole stage prompt goes out as a single
/// user message.
pub struct OpenAIProvider {
    model: String,
    api_key: String,
    api_base: String,
    client: Client,
}

impl OpenAIProvider {
    pub fn new(
        model: String,
        api_key: String,
        timeout: Duration,
        api_base: Option<String>,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            model,
            api_key,
            api_base: api_base.unwrap_or_else(|| DEFAULT_BASE.to_string()),
            client: http_client(timeout)?,
        })
    }
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[async_trait]
impl Provider for OpenAIProvider {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let url = format!("{}/v1/chat/completions", self.api_base.trim_end_matches('/'));
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "user", "content": prompt }
            ],
        });
        tracing::debug!(%url, model = %self.model, "POST");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let parsed: ChatResponse = read_json("openai", resp).await?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}
