use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

use crate::cli::ProviderKind;
use crate::config::Config;
use crate::errors::{CoachError, ProviderError};

pub mod anthropic;
pub mod gemini;
pub mod ollama;
pub mod openai;

/// Opaque text-generation backend: one prompt in, one completion out.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Provider: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;
}

pub type DynProvider = Arc<dyn Provider>;

pub fn make_provider(cfg: &Config) -> Result<DynProvider, CoachError> {
    let model = cfg.model_or_default();
    let timeout = Duration::from_secs(cfg.timeout_secs);
    let key = |var: &'static str| {
        cfg.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ProviderError::MissingCredential(var))
    };

    let provider: DynProvider = match cfg.provider {
        ProviderKind::Gemini => Arc::new(gemini::GeminiProvider::new(
            model,
            key("GEMINI_API_KEY")?,
            timeout,
            cfg.api_base.clone(),
        )?),
        ProviderKind::OpenAI => Arc::new(openai::OpenAIProvider::new(
            model,
            key("OPENAI_API_KEY")?,
            timeout,
            cfg.api_base.clone(),
        )?),
        ProviderKind::Anthropic => Arc::new(anthropic::Anthropic::new(
            model,
            key("ANTHROPIC_API_KEY")?,
            timeout,
            cfg.api_base.clone(),
        )?),
        ProviderKind::Ollama => Arc::new(ollama::Ollama::new(
            model,
            cfg.ollama_url.clone(),
            timeout,
        )?),
    };
    tracing::debug!(provider = ?cfg.provider, timeout_secs = cfg.timeout_secs, "provider ready");
    Ok(provider)
}

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, ProviderError> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// Reads the body, turns non-2xx statuses into `ProviderError::Api` and
/// decodes the JSON payload.
pub(crate) async fn read_json<T: DeserializeOwned>(
    backend: &'static str,
    resp: reqwest::Response,
) -> Result<T, ProviderError> {
    let status = resp.status();
    let text = resp.text().await?;
    tracing::debug!(backend, status = status.as_u16(), bytes = text.len(), "raw response");
    tracing::trace!(backend, body = %text);

    if !status.is_success() {
        return Err(ProviderError::Api { status: status.as_u16(), body: text });
    }
    serde_json::from_str(&text).map_err(|e| ProviderError::Decode(format!("{backend}: {e}")))
}
