use clap::ValueEnum;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::Instrument;

use crate::config::Config;
use crate::errors::CoachError;
use crate::log::{JsonFileSink, LogSink, MemorySink, PipelineLog};
use crate::provider::{self, DynProvider};
use crate::stage::run_stage;
use crate::wire::{PipelineResult, Request, Stage, StageOutcome};

/// What a stage receives when the stage before it did not produce content.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpstreamPolicy {
    /// Hand over the previous stage's text as-is, error message included.
    #[default]
    Propagate,
    /// Hand over a neutral placeholder instead of the error message.
    Placeholder,
    /// Do not call the model for any later stage.
    Abort,
}

pub const UPSTREAM_PLACEHOLDER: &str =
    "(The previous coach could not provide any input. Work from the request alone.)";

/// Progress hooks around each stage.
pub trait StageObserver: Send + Sync {
    fn stage_started(&self, _stage: Stage) {}
    fn stage_finished(&self, _stage: Stage, _outcome: &StageOutcome) {}
    fn run_aborted(&self) {}
}

impl StageObserver for () {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub result: PipelineResult,
    /// `None` when the run hit an internal failure and fell back to the
    /// system error result.
    pub log: Option<PipelineLog>,
}

impl PipelineRun {
    pub fn system_error() -> Self {
        Self { result: PipelineResult::system_error(), log: None }
    }
}

/// Runs explain → design → implement, threading each stage's text into the
/// next one.
pub struct CoachTeam {
    provider: DynProvider,
    policy: UpstreamPolicy,
    sink: Arc<dyn LogSink>,
    observer: Arc<dyn StageObserver>,
}

impl CoachTeam {
    pub fn new(provider: DynProvider) -> Self {
        Self {
            provider,
            policy: UpstreamPolicy::default(),
            sink: Arc::new(MemorySink::new()),
            observer: Arc::new(()),
        }
    }

    pub fn from_config(cfg: &Config) -> Result<Self, CoachError> {
        let provider = provider::make_provider(cfg)?;
        let sink: Arc<dyn LogSink> = if cfg.save_log {
            Arc::new(JsonFileSink::new(&cfg.out_dir))
        } else {
            Arc::new(MemorySink::new())
        };
        Ok(Self::new(provider).with_policy(cfg.upstream_policy).with_sink(sink))
    }

    pub fn with_policy(mut self, policy: UpstreamPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn StageObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Always returns three text fields. Stage failures are folded into the
    /// stage's text; anything else falls back to the system error result
    /// and leaves the sink untouched.
    pub async fn advise(&self, request: Request) -> PipelineRun {
        let span = tracing::info_span!("advise", category = %request.category());
        match self.try_advise(request).instrument(span).await {
            Ok(run) => run,
            Err(e) => {
                tracing::error!(error = %e, "pipeline failed; returning system error");
                self.observer.run_aborted();
                PipelineRun::system_error()
            }
        }
    }

    async fn try_advise(&self, request: Request) -> Result<PipelineRun, CoachError> {
        let mut log = PipelineLog::start(request.category().tag());
        tracing::debug!(run_id = %log.run_id, policy = ?self.policy, "pipeline started");

        let mut texts = Vec::with_capacity(Stage::ORDER.len());
        let mut prior: Option<String> = None;
        let mut upstream_failed = false;

        for stage in Stage::ORDER {
            self.observer.stage_started(stage);
            let outcome = if upstream_failed && self.policy == UpstreamPolicy::Abort {
                StageOutcome::Skipped
            } else {
                let input = prior.take();
                // Runs inline so dropping `advise` also drops the model call.
                AssertUnwindSafe(run_stage(self.provider.as_ref(), stage, input.as_deref(), &request))
                    .catch_unwind()
                    .await
                    .map_err(|panic| {
                        CoachError::Internal(format!("{stage} stage panicked: {}", panic_message(&*panic)))
                    })?
            };
            self.observer.stage_finished(stage, &outcome);

            let text = outcome.text(stage);
            prior = Some(if !outcome.is_success() && self.policy == UpstreamPolicy::Placeholder {
                UPSTREAM_PLACEHOLDER.to_string()
            } else {
                text.clone()
            });
            upstream_failed |= !outcome.is_success();
            log.push(stage, &outcome);
            texts.push(text);
        }

        let [explanation, design_notes, implementation]: [String; 3] = texts
            .try_into()
            .map_err(|_| CoachError::Internal("stage count mismatch".into()))?;

        if let Err(e) = self.sink.append(&log) {
            tracing::warn!(error = %e, "could not record run log");
        }
        tracing::info!(run_id = %log.run_id, failed = log.failed_stages(), "pipeline finished");

        Ok(PipelineRun {
            result: PipelineResult { explanation, design_notes, implementation },
            log: Some(log),
        })
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Builds the team from configuration and runs it. A setup failure such as
/// a missing credential yields the system error result.
pub async fn advise_with_config(
    cfg: &Config,
    request: Request,
    observer: Arc<dyn StageObserver>,
) -> PipelineRun {
    match CoachTeam::from_config(cfg) {
        Ok(team) => team.with_observer(observer).advise(request).await,
        Err(e) => {
            tracing::error!(error = %e, "could not set up the coach team");
            PipelineRun::system_error()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ProviderError;
    use crate::log::StageStatus;
    use crate::provider::{MockProvider, Provider};
    use crate::wire::{Category, SKIPPED_MESSAGE, SYSTEM_ERROR_MESSAGE};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::{BTreeMap, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Replays canned answers in order and records every prompt it saw.
    struct ScriptedProvider {
        answers: Mutex<VecDeque<Result<String, ProviderError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn new(answers: Vec<Result<String, ProviderError>>) -> Arc<Self> {
            Arc::new(Self { answers: Mutex::new(answers.into()), prompts: Mutex::new(Vec::new()) })
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().clone()
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
            self.prompts.lock().push(prompt.to_string());
            self.answers.lock().pop_front().unwrap_or_else(|| Ok(String::new()))
        }
    }

    fn concept_request() -> Request {
        let mut fields = BTreeMap::new();
        fields.insert("question".to_string(), "What is vibe coding?".to_string());
        Request::new(Category::Concept, fields)
    }

    fn api_error(body: &str) -> ProviderError {
        ProviderError::Api { status: 500, body: body.to_string() }
    }

    #[tokio::test]
    async fn outputs_thread_into_next_stage() {
        let stub = ScriptedProvider::new(vec![
            Ok("EXPLAIN-OUT".into()),
            Ok("DESIGN-OUT".into()),
            Ok("IMPL-OUT".into()),
        ]);
        let sink = Arc::new(MemorySink::new());
        let team = CoachTeam::new(stub.clone()).with_sink(sink.clone());

        let run = team.advise(concept_request()).await;
        assert_eq!(run.result.explanation, "EXPLAIN-OUT");
        assert_eq!(run.result.design_notes, "DESIGN-OUT");
        assert_eq!(run.result.implementation, "IMPL-OUT");

        let prompts = stub.prompts();
        assert_eq!(prompts.len(), 3);
        assert!(prompts[0].contains("What is vibe coding?"));
        assert!(prompts[1].contains("EXPLAIN-OUT"));
        assert!(prompts[2].contains("DESIGN-OUT"));
        assert!(!prompts[2].contains("EXPLAIN-OUT"));

        let logs = sink.snapshot();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].steps.len(), 3);
        assert!(logs[0].steps.iter().all(|s| s.status == StageStatus::Success));
        assert_eq!(run.log.as_ref(), Some(&logs[0]));
    }

    #[tokio::test]
    async fn failed_stage_text_is_propagated_by_default() {
        let stub = ScriptedProvider::new(vec![
            Err(api_error("backend exploded")),
            Ok("DESIGN-OUT".into()),
            Ok("IMPL-OUT".into()),
        ]);
        let team = CoachTeam::new(stub.clone());

        let run = team.advise(concept_request()).await;
        assert!(run.result.explanation.contains("backend exploded"));
        assert_eq!(run.result.design_notes, "DESIGN-OUT");
        assert!(stub.prompts()[1].contains(&run.result.explanation));

        let log = run.log.unwrap();
        assert_eq!(log.steps[0].status, StageStatus::Error);
        assert!(log.steps[0].error.as_deref().unwrap().contains("backend exploded"));
        assert_eq!(log.steps[1].status, StageStatus::Success);
    }

    #[tokio::test]
    async fn placeholder_policy_hides_error_text() {
        let stub = ScriptedProvider::new(vec![
            Ok("EXPLAIN-OUT".into()),
            Ok(String::new()),
            Ok("IMPL-OUT".into()),
        ]);
        let team = CoachTeam::new(stub.clone()).with_policy(UpstreamPolicy::Placeholder);

        let run = team.advise(concept_request()).await;
        let prompts = stub.prompts();
        assert!(prompts[2].contains(UPSTREAM_PLACEHOLDER));
        assert!(!prompts[2].contains(&run.result.design_notes));
        assert_eq!(run.result.implementation, "IMPL-OUT");
    }

    #[tokio::test]
    async fn abort_policy_skips_later_stages() {
        let mut mock = MockProvider::new();
        mock.expect_generate().times(1).returning(|_| Err(api_error("auth")));
        let team = CoachTeam::new(Arc::new(mock)).with_policy(UpstreamPolicy::Abort);

        let run = team.advise(concept_request()).await;
        assert!(run.result.explanation.contains("auth"));
        assert_eq!(run.result.design_notes, SKIPPED_MESSAGE);
        assert_eq!(run.result.implementation, SKIPPED_MESSAGE);

        let statuses: Vec<_> = run.log.unwrap().steps.iter().map(|s| s.status).collect();
        assert_eq!(statuses, vec![StageStatus::Error, StageStatus::Skipped, StageStatus::Skipped]);
    }

    #[tokio::test]
    async fn every_stage_failing_still_returns_three_fields() {
        let mut mock = MockProvider::new();
        mock.expect_generate().times(3).returning(|_| Err(api_error("down")));
        let team = CoachTeam::new(Arc::new(mock));

        let run = team.advise(concept_request()).await;
        for stage in Stage::ORDER {
            assert!(run.result.get(stage).contains("down"), "{stage}");
        }
        assert_eq!(run.log.unwrap().failed_stages(), 3);
    }

    struct PanickingProvider;

    #[async_trait]
    impl Provider for PanickingProvider {
        async fn generate(&self, _prompt: &str) -> Result<String, ProviderError> {
            panic!("provider bug")
        }
    }

    #[tokio::test]
    async fn panic_falls_back_to_system_error_without_log() {
        let sink = Arc::new(MemorySink::new());
        let team = CoachTeam::new(Arc::new(PanickingProvider)).with_sink(sink.clone());

        let run = team.advise(concept_request()).await;
        assert_eq!(run.result, PipelineResult::system_error());
        assert!(run.log.is_none());
        assert!(sink.is_empty());
        assert_eq!(run.result.explanation, SYSTEM_ERROR_MESSAGE);
    }

    /// Counts only the calls that ran to completion.
    struct SlowProvider {
        completed: AtomicUsize,
    }

    #[async_trait]
    impl Provider for SlowProvider {
        async fn generate(&self, _prompt: &str) -> Result<String, ProviderError> {
            tokio::time::sleep(Duration::from_millis(300)).await;
            self.completed.fetch_add(1, Ordering::SeqCst);
            Ok("late".into())
        }
    }

    #[tokio::test]
    async fn cancelled_run_stops_the_model_call() {
        let slow = Arc::new(SlowProvider { completed: AtomicUsize::new(0) });
        let sink = Arc::new(MemorySink::new());
        let team = CoachTeam::new(slow.clone()).with_sink(sink.clone());

        let res = tokio::time::timeout(Duration::from_millis(50), team.advise(concept_request())).await;
        assert!(res.is_err());

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(slow.completed.load(Ordering::SeqCst), 0);
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn logs_accumulate_across_runs() {
        let mut mock = MockProvider::new();
        mock.expect_generate().returning(|_| Ok("text".into()));
        let sink = Arc::new(MemorySink::new());
        let team = CoachTeam::new(Arc::new(mock)).with_sink(sink.clone());

        let (a, b) = tokio::join!(team.advise(concept_request()), team.advise(concept_request()));
        assert_ne!(a.log.unwrap().run_id, b.log.unwrap().run_id);
        let logs = sink.snapshot();
        assert_eq!(logs.len(), 2);
        assert!(logs.iter().all(|l| l.steps.len() == 3));
    }

    #[tokio::test]
    async fn setup_failure_yields_system_error() {
        let cfg = Config { api_key: None, ..Config::default() };
        let run = advise_with_config(&cfg, concept_request(), Arc::new(())).await;
        assert_eq!(run.result, PipelineResult::system_error());
        assert!(run.log.is_none());
    }
}
