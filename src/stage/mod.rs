use std::time::Instant;

use crate::prompt;
use crate::provider::Provider;
use crate::wire::{Request, Stage, StageOutcome};

/// Runs one stage against the provider. Provider failures and empty answers
/// come back as outcomes; nothing escapes as an error.
pub async fn run_stage(
    provider: &dyn Provider,
    stage: Stage,
    prior: Option<&str>,
    request: &Request,
) -> StageOutcome {
    let prompt = prompt::stage_prompt(stage, prior, request);
    let started = Instant::now();
    tracing::debug!(%stage, category = %request.category(), prompt_chars = prompt.len(), "calling model");

    let outcome = match provider.generate(&prompt).await {
        Ok(text) if text.trim().is_empty() => StageOutcome::EmptyResponse,
        Ok(text) => StageOutcome::Generated(text),
        Err(e) => StageOutcome::ServiceError { detail: e.to_string() },
    };

    let elapsed_ms = started.elapsed().as_millis() as u64;
    match &outcome {
        StageOutcome::Generated(text) => {
            tracing::info!(%stage, elapsed_ms, chars = text.len(), "stage completed")
        }
        StageOutcome::ServiceError { detail } => {
            tracing::error!(%stage, elapsed_ms, error = %detail, "stage failed")
        }
        StageOutcome::EmptyResponse => tracing::warn!(%stage, elapsed_ms, "model returned no text"),
        StageOutcome::Skipped => {}
    }
    outcome
}
