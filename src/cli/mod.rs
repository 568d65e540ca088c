use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::Config;
use crate::pipeline::UpstreamPolicy;
use crate::prompt;
use crate::wire::{Category, Request};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[value(alias = "google")]
    Gemini,
    #[value(name = "openai", alias = "open-ai")]
    #[serde(rename = "openai")]
    OpenAI,
    Anthropic,
    Ollama,
}

#[derive(Parser, Debug)]
#[command(name = "vibe_coach", version, about = "Three-stage vibe coding coach over a hosted LLM")]
pub struct Args {
    /// concept | code-generation | project-design | learning-plan (other tags use generic prompts)
    #[arg(long, value_parser = parse_category)]
    pub category: Category,

    /// Request field as key=value; repeatable
    #[arg(long = "field", short = 'f', value_name = "KEY=VALUE", value_parser = parse_field)]
    pub fields: Vec<(String, String)>,

    #[arg(long)]
    pub config: Option<String>,

    #[arg(long, value_enum)]
    pub provider: Option<ProviderKind>,

    #[arg(long)]
    pub model: Option<String>,

    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// What later stages receive when an earlier one fails
    #[arg(long, value_enum)]
    pub on_upstream_failure: Option<UpstreamPolicy>,

    #[arg(long)]
    pub out_dir: Option<String>,

    /// Write the fenced code blocks of the implementation to a file
    #[arg(long, default_value_t = false)]
    pub save_code: bool,

    /// Persist the run log as JSON under <out-dir>/.coach/runs
    #[arg(long, default_value_t = false)]
    pub save_log: bool,

    /// Print the result as JSON instead of coach cards
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Submit even if the category's required fields are empty
    #[arg(long, default_value_t = false)]
    pub allow_missing: bool,

    #[arg(long, default_value_t = false)]
    pub no_progress: bool,

    #[arg(long, default_value_t = false)]
    pub debug: bool,
}

impl Args {
    pub fn request(&self) -> Request {
        let fields: BTreeMap<String, String> = self.fields.iter().cloned().collect();
        Request::new(self.category.clone(), fields)
    }

    /// Command-line flags win over the config file and environment.
    pub fn apply_to(&self, cfg: &mut Config) {
        if let Some(p) = self.provider {
            if p != cfg.provider {
                // A key read for another backend is no use here.
                cfg.api_key = None;
            }
            cfg.provider = p;
            cfg.load_credentials_from_env();
        }
        if let Some(m) = &self.model {
            cfg.model = Some(m.clone());
        }
        if let Some(t) = self.timeout_secs {
            cfg.timeout_secs = t;
        }
        if let Some(p) = self.on_upstream_failure {
            cfg.upstream_policy = p;
        }
        if let Some(d) = &self.out_dir {
            cfg.out_dir = d.clone();
        }
        if self.save_log {
            cfg.save_log = true;
        }
    }
}

pub fn parse_category(s: &str) -> Result<Category, String> {
    if s.trim().is_empty() {
        return Err("category must not be empty".into());
    }
    Ok(Category::parse(s))
}

pub fn parse_field(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.to_string())),
        _ => Err(format!("expected KEY=VALUE, got `{s}`")),
    }
}

/// Required fields the submission left empty. Unknown categories have none.
pub fn missing_required(request: &Request) -> Vec<&'static str> {
    prompt::templates_for(request.category())
        .map(|row| {
            row.required
                .iter()
                .copied()
                .filter(|f| request.field(f).trim().is_empty())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_field_splits_on_first_equals() {
        assert_eq!(parse_field("question=a=b").unwrap(), ("question".into(), "a=b".into()));
        assert_eq!(parse_field("tech_stack=").unwrap(), ("tech_stack".into(), String::new()));
        assert!(parse_field("no-equals").is_err());
        assert!(parse_field("=value").is_err());
    }

    #[test]
    fn blank_category_is_rejected() {
        assert!(Args::try_parse_from(["vibe_coach", "--category", ""]).is_err());
        assert!(Args::try_parse_from(["vibe_coach", "--category", "   "]).is_err());

        let args = Args::try_parse_from(["vibe_coach", "--category", "code-review"]).unwrap();
        assert_eq!(args.request().category(), &Category::Other("code-review".into()));
    }

    #[test]
    fn args_build_request() {
        let args = Args::try_parse_from([
            "vibe_coach",
            "--category",
            "Code-Generation",
            "-f",
            "code_request=todo app",
            "--field",
            "programming_language=Go",
        ])
        .unwrap();
        let req = args.request();
        assert_eq!(req.category(), &Category::CodeGeneration);
        assert_eq!(req.field("programming_language"), "Go");
        assert!(missing_required(&req).is_empty());
    }

    #[test]
    fn missing_required_lists_empty_fields() {
        let args = Args::try_parse_from([
            "vibe_coach",
            "--category",
            "learning-plan",
            "--field",
            "learning_goals=  ",
        ])
        .unwrap();
        assert_eq!(missing_required(&args.request()), vec!["learning_goals", "preferred_languages"]);
    }

    #[test]
    fn flags_override_config() {
        let args = Args::try_parse_from([
            "vibe_coach",
            "--category",
            "concept",
            "--model",
            "m-1",
            "--timeout-secs",
            "30",
            "--on-upstream-failure",
            "abort",
        ])
        .unwrap();
        let mut cfg = Config::default();
        args.apply_to(&mut cfg);
        assert_eq!(cfg.model.as_deref(), Some("m-1"));
        assert_eq!(cfg.timeout_secs, 30);
        assert_eq!(cfg.upstream_policy, UpstreamPolicy::Abort);
    }

    #[test]
    fn switching_provider_drops_the_old_key() {
        let mut cfg = Config { api_key: Some("gemini-key".into()), ..Config::default() };
        let args = Args::try_parse_from(["vibe_coach", "--category", "concept", "--provider", "ollama"]).unwrap();
        args.apply_to(&mut cfg);
        assert_eq!(cfg.provider, ProviderKind::Ollama);
        assert_eq!(cfg.api_key, None);
    }

    #[test]
    fn same_provider_keeps_the_key() {
        let mut cfg = Config { api_key: Some("gemini-key".into()), ..Config::default() };
        let args = Args::try_parse_from(["vibe_coach", "--category", "concept", "--provider", "google"]).unwrap();
        args.apply_to(&mut cfg);
        assert_eq!(cfg.provider, ProviderKind::Gemini);
        assert_eq!(cfg.api_key.as_deref(), Some("gemini-key"));
    }
}
