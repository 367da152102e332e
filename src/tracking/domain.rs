//! Experiment runs and the tracker contract.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::common::error::SalesResult;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
}

/// One logged value of a metric.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub value: f64,
    pub step: u64,
    pub timestamp_ms: i64,
}

/// A single tracked run, persisted as `run.json`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub run_id: String,
    pub experiment: String,
    pub status: RunStatus,
    pub start_ms: i64,
    pub end_ms: Option<i64>,
    pub params: BTreeMap<String, String>,
    pub metrics: BTreeMap<String, Vec<MetricPoint>>,
    /// Artifact paths relative to the run's `artifacts/` directory.
    pub artifacts: Vec<String>,
}

impl Run {
    /// Most recently logged value of `key`.
    pub fn latest_metric(&self, key: &str) -> Option<f64> {
        self.metrics.get(key)?.last().map(|p| p.value)
    }

    pub fn is_active(&self) -> bool {
        self.status == RunStatus::Running
    }
}

/// Experiment tracker: records params, metrics and artifacts per run.
pub trait Tracker {
    fn start_run(&self, experiment: &str) -> SalesResult<Run>;
    /// Params are write-once; re-logging a key with a different value fails.
    fn log_param(&self, run: &mut Run, key: &str, value: &str) -> SalesResult<()>;
    fn log_metric(&self, run: &mut Run, key: &str, value: f64, step: u64) -> SalesResult<()>;
    /// Store `bytes` at `rel_path` under the run's artifact directory.
    fn log_artifact(&self, run: &mut Run, rel_path: &str, bytes: &[u8]) -> SalesResult<PathBuf>;
    fn end_run(&self, run: &mut Run, status: RunStatus) -> SalesResult<()>;
    fn get_run(&self, experiment: &str, run_id: &str) -> SalesResult<Run>;
    /// Runs of `experiment`, newest first.
    fn list_runs(&self, experiment: &str) -> SalesResult<Vec<Run>>;
}
