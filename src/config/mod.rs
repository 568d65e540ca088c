use anyhow::{Context, Result};
use fs_err as fs;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::cli::ProviderKind;
use crate::pipeline::UpstreamPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: ProviderKind,
    /// Falls back to a per-provider default when unset.
    pub model: Option<String>,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub api_base: Option<String>,
    pub timeout_secs: u64,
    pub ollama_url: String,
    pub upstream_policy: UpstreamPolicy,
    pub out_dir: String,
    pub save_log: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Gemini,
            model: None,
            api_key: None,
            api_base: None,
            timeout_secs: 2400,
            ollama_url: "http://localhost:11434".into(),
            upstream_policy: UpstreamPolicy::Propagate,
            out_dir: ".".into(),
            save_log: false,
        }
    }
}

impl Config {
    /// Defaults, then the optional TOML file, then credentials from the
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(p) => {
                let raw = fs::read_to_string(p)?;
                toml::from_str::<Config>(&raw)
                    .with_context(|| format!("invalid config file {}", p.display()))?
            }
            None => Config::default(),
        };
        cfg.load_credentials_from_env();
        if let Ok(url) = std::env::var("OLLAMA_URL") {
            cfg.ollama_url = url;
        }
        Ok(cfg)
    }

    pub fn load_credentials_from_env(&mut self) {
        if self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty()) {
            return;
        }
        self.api_key = credential_vars(self.provider)
            .iter()
            .find_map(|var| std::env::var(var).ok().filter(|v| !v.trim().is_empty()));
    }

    pub fn model_or_default(&self) -> String {
        self.model.clone().unwrap_or_else(|| {
            match self.provider {
                ProviderKind::Gemini => "gemini-2.5-pro",
                ProviderKind::OpenAI => "gpt-4.1-mini",
                ProviderKind::Anthropic => "claude-3-5-sonnet-latest",
                ProviderKind::Ollama => "llama3.1",
            }
            .to_string()
        })
    }
}

fn credential_vars(kind: ProviderKind) -> &'static [&'static str] {
    match kind {
        ProviderKind::Gemini => &["GEMINI_API_KEY", "GOOGLE_API_KEY"],
        ProviderKind::OpenAI => &["OPENAI_API_KEY"],
        ProviderKind::Anthropic => &["ANTHROPIC_API_KEY"],
        ProviderKind::Ollama => &[],
    }
}
