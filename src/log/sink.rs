use anyhow::Result;
use fs_err as fs;
use parking_lot::Mutex;
use serde_json::to_string_pretty;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::PipelineLog;

/// Append-only destination for run logs.
pub trait LogSink: Send + Sync {
    fn append(&self, log: &PipelineLog) -> Result<()>;
}

/// Keeps every log for the lifetime of the sink.
#[derive(Default)]
pub struct MemorySink {
    logs: Mutex<Vec<PipelineLog>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<PipelineLog> {
        self.logs.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.logs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LogSink for MemorySink {
    fn append(&self, log: &PipelineLog) -> Result<()> {
        self.logs.lock().push(log.clone());
        Ok(())
    }
}

/// Writes each run to `<root>/.coach/runs/<run_id>.json`.
pub struct JsonFileSink {
    root: PathBuf,
}

impl JsonFileSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, run_id: Uuid) -> PathBuf {
        runs_dir(&self.root).join(format!("{run_id}.json"))
    }
}

fn runs_dir(root: &Path) -> PathBuf {
    root.join(".coach").join("runs")
}

impl LogSink for JsonFileSink {
    fn append(&self, log: &PipelineLog) -> Result<()> {
        fs::create_dir_all(runs_dir(&self.root))?;
        let path = self.path_for(log.run_id);
        fs::write(&path, to_string_pretty(log)?)?;
        tracing::debug!(path = %path.display(), "run log saved");
        Ok(())
    }
}
