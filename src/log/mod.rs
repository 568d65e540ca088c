use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::prompt;
use crate::wire::{Stage, StageOutcome};

mod sink;

pub use sink::{JsonFileSink, LogSink, MemorySink};

/// Installs the global subscriber. Logs go to stderr so stdout only carries
/// the coaching result.
pub fn init_tracing(debug: bool) {
    let default = if debug { "info,vibe_coach=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Success,
    Error,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: Stage,
    pub coach: String,
    pub status: StageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StageRecord {
    pub fn from_outcome(stage: Stage, outcome: &StageOutcome) -> Self {
        let (status, error) = match outcome {
            StageOutcome::Generated(_) => (StageStatus::Success, None),
            StageOutcome::ServiceError { detail } => (StageStatus::Error, Some(detail.clone())),
            StageOutcome::EmptyResponse => (StageStatus::Error, Some("empty response from model".to_string())),
            StageOutcome::Skipped => (StageStatus::Skipped, None),
        };
        Self {
            stage,
            coach: prompt::persona(stage).name.to_string(),
            status,
            error,
        }
    }
}

/// Record of one pipeline run: one entry per stage, in execution order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineLog {
    pub run_id: Uuid,
    pub category: String,
    pub started_at: DateTime<Utc>,
    pub steps: Vec<StageRecord>,
}

impl PipelineLog {
    pub fn start(category: &str) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            category: category.to_string(),
            started_at: Utc::now(),
            steps: Vec::with_capacity(Stage::ORDER.len()),
        }
    }

    pub fn push(&mut self, stage: Stage, outcome: &StageOutcome) {
        self.steps.push(StageRecord::from_outcome(stage, outcome));
    }

    pub fn failed_stages(&self) -> usize {
        self.steps.iter().filter(|s| s.status != StageStatus::Success).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_map_outcomes_to_status() {
        let mut log = PipelineLog::start("concept");
        log.push(Stage::Explain, &StageOutcome::Generated("ok".into()));
        log.push(Stage::Design, &StageOutcome::ServiceError { detail: "timeout".into() });
        log.push(Stage::Implement, &StageOutcome::Skipped);

        assert_eq!(log.steps[0].status, StageStatus::Success);
        assert_eq!(log.steps[0].coach, "Concept Coach");
        assert_eq!(log.steps[1].error.as_deref(), Some("timeout"));
        assert_eq!(log.steps[2].status, StageStatus::Skipped);
        assert_eq!(log.failed_stages(), 2);
    }

    #[test]
    fn empty_response_is_logged_as_error() {
        let r = StageRecord::from_outcome(Stage::Design, &StageOutcome::EmptyResponse);
        assert_eq!(r.status, StageStatus::Error);
        assert!(r.error.is_some());
    }
}
