use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{http_client, read_json, Provider};
use crate::errors::ProviderError;

const DEFAULT_BASE: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

pub struct Anthropic {
    model: String,
    api_key: String,
    api_base: String,
    client: Client,
}

impl Anthropic {
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

#[derive(Serialize)]
struct MsgRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Msg<'a>>,
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MsgResponse {
    #[serde(default)]
    content: Vec<Block>,
}

#[derive(Deserialize)]
struct Block {
    #[serde(default)]
    text: String,
    #[serde(default)]
    r#type: String,
}

#[async_trait]
impl Provider for Anthropic {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let url = format!("{}/v1/messages", self.api_base.trim_end_matches('/'));
        let body = MsgRequest {
            model: &self.model,
            max_tokens: 8192,
            messages: vec![Msg { role: "user", content: prompt }],
        };
        tracing::debug!(%url, "POST");

        let resp = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await?;
        let parsed: MsgResponse = read_json("anthropic", resp).await?;

        Ok(parsed
            .content
            .into_iter()
            .filter(|b| b.r#type == "text")
            .map(|b| b.text)
            .collect::<Vec<_>>()
            .join(""))
    }
}
