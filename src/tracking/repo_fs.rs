//! Filesystem tracker.
//!
//! Layout: `<data_root>/mlruns/<experiment>/<run_id>/run.json` with artifacts
//! under `<run_id>/artifacts/`. `run.json` is rewritten after every change.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info};
use uuid::Uuid;

use crate::common::config::AppCfg;
use crate::common::error::{SalesError, SalesResult};
use crate::common::time;

use super::domain::{MetricPoint, Run, RunStatus, Tracker};

pub struct FsTracker {
    root: PathBuf,
}

impl FsTracker {
    pub fn new(cfg: &AppCfg) -> Self {
        Self {
            root: cfg.data_root.join("mlruns"),
        }
    }

    fn run_dir(&self, experiment: &str, run_id: &str) -> PathBuf {
        self.root.join(experiment).join(run_id)
    }

    /// Directory holding a run's artifacts.
    pub fn artifact_dir(&self, run: &Run) -> PathBuf {
        self.run_dir(&run.experiment, &run.run_id).join("artifacts")
    }

    fn persist(&self, run: &Run) -> SalesResult<()> {
        let dir = self.run_dir(&run.experiment, &run.run_id);
        fs::create_dir_all(&dir)?;
        fs::write(dir.join("run.json"), serde_json::to_vec_pretty(run)?)?;
        Ok(())
    }

    fn ensure_active(run: &Run) -> SalesResult<()> {
        if run.is_active() {
            Ok(())
        } else {
            Err(SalesError::tracking(format!("run {} is not active", run.run_id)))
        }
    }
}

fn check_experiment(name: &str) -> SalesResult<()> {
    let ok = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if ok {
        Ok(())
    } else {
        Err(SalesError::invalid(format!("experiment name {name:?}")))
    }
}

/// Only plain relative paths may be used inside a run's artifact directory.
fn check_rel_path(rel: &str) -> SalesResult<&Path> {
    let path = Path::new(rel);
    let plain = !rel.is_empty() && path.components().all(|c| matches!(c, Component::Normal(_)));
    if plain {
        Ok(path)
    } else {
        Err(SalesError::invalid(format!("artifact path {rel:?}")))
    }
}

impl Tracker for FsTracker {
    fn start_run(&self, experiment: &str) -> SalesResult<Run> {
        check_experiment(experiment)?;
        let run = Run {
            run_id: Uuid::new_v4().simple().to_string(),
            experiment: experiment.to_string(),
            status: RunStatus::Running,
            start_ms: time::now_ms(),
            end_ms: None,
            params: BTreeMap::new(),
            metrics: BTreeMap::new(),
            artifacts: Vec::new(),
        };
        self.persist(&run)?;
        info!(ev = "run_started", experiment, run_id = %run.run_id);
        Ok(run)
    }

    fn log_param(&self, run: &mut Run, key: &str, value: &str) -> SalesResult<()> {
        Self::ensure_active(run)?;
        match run.params.get(key) {
            Some(existing) if existing != value => {
                return Err(SalesError::tracking(format!(
                    "param {key} already logged as {existing:?}, refusing {value:?}"
                )));
            }
            Some(_) => return Ok(()),
            None => {}
        }
        run.params.insert(key.to_string(), value.to_string());
        self.persist(run)
    }

    fn log_metric(&self, run: &mut Run, key: &str, value: f64, step: u64) -> SalesResult<()> {
        Self::ensure_active(run)?;
        run.metrics
            .entry(key.to_string())
            .or_default()
            .push(MetricPoint {
                value,
                step,
                timestamp_ms: time::now_ms(),
            });
        debug!(ev = "metric_logged", run_id = %run.run_id, key, value, step);
        self.persist(run)
    }

    fn log_artifact(&self, run: &mut Run, rel_path: &str, bytes: &[u8]) -> SalesResult<PathBuf> {
        Self::ensure_active(run)?;
        let rel = check_rel_path(rel_path)?;
        let dest = self.artifact_dir(run).join(rel);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&dest, bytes)?;
        if !run.artifacts.iter().any(|a| a == rel_path) {
            run.artifacts.push(rel_path.to_string());
        }
        self.persist(run)?;
        Ok(dest)
    }

    fn end_run(&self, run: &mut Run, status: RunStatus) -> SalesResult<()> {
        Self::ensure_active(run)?;
        if status == RunStatus::Running {
            return Err(SalesError::tracking("cannot end a run as RUNNING"));
        }
        run.status = status;
        run.end_ms = Some(time::now_ms());
        self.persist(run)?;
        info!(ev = "run_ended", run_id = %run.run_id, status = ?status);
        Ok(())
    }

    fn get_run(&self, experiment: &str, run_id: &str) -> SalesResult<Run> {
        check_experiment(experiment)?;
        let path = self.run_dir(experiment, run_id).join("run.json");
        if !path.exists() {
            return Err(SalesError::tracking(format!(
                "run {run_id} not found in experiment {experiment}"
            )));
        }
        Ok(serde_json::from_slice(&fs::read(path)?)?)
    }

    fn list_runs(&self, experiment: &str) -> SalesResult<Vec<Run>> {
        check_experiment(experiment)?;
        let dir = self.root.join(experiment);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut runs: Vec<Run> = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path().join("run.json");
            if path.exists() {
                runs.push(serde_json::from_slice(&fs::read(path)?)?);
            }
        }
        runs.sort_by(|a, b| b.start_ms.cmp(&a.start_ms).then_with(|| a.run_id.cmp(&b.run_id)));
        Ok(runs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> (tempfile::TempDir, FsTracker) {
        let dir = tempfile::tempdir().unwrap();
        let tracker = FsTracker::new(&AppCfg::with_root(dir.path()));
        (dir, tracker)
    }

    #[test]
    fn run_lifecycle_is_persisted() {
        let (_dir, tracker) = tracker();
        let mut run = tracker.start_run("livraria-vendas-prediction").unwrap();
        tracker.log_param(&mut run, "n_estimators", "100").unwrap();
        tracker.log_metric(&mut run, "MAE", 1.5, 0).unwrap();
        tracker.log_metric(&mut run, "MAE", 1.25, 1).unwrap();
        let path = tracker
            .log_artifact(&mut run, "model/model.json", b"{}")
            .unwrap();
        assert!(path.ends_with("artifacts/model/model.json"));
        tracker.end_run(&mut run, RunStatus::Finished).unwrap();

        let stored = tracker
            .get_run("livraria-vendas-prediction", &run.run_id)
            .unwrap();
        assert_eq!(stored, run);
        assert_eq!(stored.latest_metric("MAE"), Some(1.25));
        assert_eq!(stored.metrics["MAE"].len(), 2);
        assert_eq!(stored.artifacts, vec!["model/model.json"]);
        assert!(stored.end_ms.is_some());
    }

    #[test]
    fn params_are_write_once() {
        let (_dir, tracker) = tracker();
        let mut run = tracker.start_run("exp").unwrap();
        tracker.log_param(&mut run, "seed", "42").unwrap();
        tracker.log_param(&mut run, "seed", "42").unwrap();
        assert!(tracker.log_param(&mut run, "seed", "7").is_err());
    }

    #[test]
    fn ended_run_rejects_writes() {
        let (_dir, tracker) = tracker();
        let mut run = tracker.start_run("exp").unwrap();
        tracker.end_run(&mut run, RunStatus::Failed).unwrap();
        assert!(tracker.log_metric(&mut run, "MSE", 1.0, 0).is_err());
        assert!(tracker.end_run(&mut run, RunStatus::Finished).is_err());
    }

    #[test]
    fn artifact_paths_must_stay_inside_run() {
        let (_dir, tracker) = tracker();
        let mut run = tracker.start_run("exp").unwrap();
        assert!(tracker.log_artifact(&mut run, "../escape", b"x").is_err());
        assert!(tracker.log_artifact(&mut run, "/abs", b"x").is_err());
        assert!(tracker.log_artifact(&mut run, "", b"x").is_err());
    }

    #[test]
    fn list_runs_of_unknown_experiment_is_empty() {
        let (_dir, tracker) = tracker();
        assert!(tracker.list_runs("nothing-here").unwrap().is_empty());
        assert!(tracker.get_run("nothing-here", "abc").is_err());
    }

    #[test]
    fn list_runs_returns_every_run() {
        let (_dir, tracker) = tracker();
        let a = tracker.start_run("exp").unwrap();
        let b = tracker.start_run("exp").unwrap();
        let runs = tracker.list_runs("exp").unwrap();
        assert_eq!(runs.len(), 2);
        assert!(runs.iter().any(|r| r.run_id == a.run_id));
        assert!(runs.iter().any(|r| r.run_id == b.run_id));
        assert!(runs[0].start_ms >= runs[1].start_ms);
    }
}
