use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{http_client, read_json, Provider};
use crate::errors::ProviderError;

pub struct Ollama {
    model: String,
    url: String,
    client: Client,
}

impl Ollama {
    pub fn new(model: String, url: String, timeout: Duration) -> Result<Self, ProviderError> {
        Ok(Self { model, url, client: http_client(timeout)? })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: MsgOut,
}

#[derive(Deserialize)]
struct MsgOut {
    #[serde(default)]
    content: String,
}

#[async_trait]
impl Provider for Ollama {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let url = format!("{}/api/chat", self.url.trim_end_matches('/'));
        let body = ChatRequest {
            model: &self.model,
            messages: vec![Msg { role: "user", content: prompt }],
            stream: false,
        };
        tracing::debug!(%url, "POST");

        let resp = self.client.post(&url).json(&body).send().await?;
        let parsed: ChatResponse = read_json("ollama", resp).await?;
        Ok(parsed.message.content)
    }
}
