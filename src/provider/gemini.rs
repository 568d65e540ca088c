use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{http_client, read_json, Provider};
use crate::errors::ProviderError;

const DEFAULT_BASE: &str = "https://generativelanguage.googleapis.com";

/// Google Generative Language API (`models/{model}:generateContent`).
pub struct GeminiProvider {
    model: String,
    api_key: String,
    api_base: String,
    client: Client,
}

impl GeminiProvider {
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
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<PartIn<'a>>,
}

#[derive(Serialize)]
struct PartIn<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ContentOut>,
}

#[derive(Deserialize)]
struct ContentOut {
    #[serde(default)]
    parts: Vec<PartOut>,
}

#[derive(Deserialize)]
struct PartOut {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl Provider for GeminiProvider {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base.trim_end_matches('/'),
            self.model
        );
        let body = GenerateRequest {
            contents: vec![Content { role: "user", parts: vec![PartIn { text: prompt }] }],
        };
        tracing::debug!(%url, "POST");

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;
        let parsed: GenerateResponse = read_json("gemini", resp).await?;

        // A blocked or filtered prompt comes back without candidates; that is
        // an empty answer, not a transport failure.
        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect::<String>())
            .unwrap_or_default();
        Ok(text)
    }
}
