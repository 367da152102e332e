//! `booksales train`: fit, track and register the sales model.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use crate::common::config::AppCfg;
use crate::data::repo_fs::FsDataRepo;
use crate::tracking::repo_fs::FsTracker;
use crate::training::domain::TrainConfig;
use crate::training::repo_fs::FsModelRepo;
use crate::training::service;

/// Train the sales model on a registered dataset.
///
/// Values given on the command line override the config file, which
/// overrides the runtime configuration.
#[derive(Args, Debug, Clone)]
pub struct TrainCommand {
    /// Training configuration (JSON)
    #[arg(long, short = 'c', env = "BOOKSALES_TRAIN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Dataset name to train on
    #[arg(long, short = 'd')]
    pub dataset: Option<String>,

    /// Experiment to log the run under
    #[arg(long, short = 'e')]
    pub experiment: Option<String>,

    /// Name to register the model under
    #[arg(long, short = 'm')]
    pub model_name: Option<String>,

    /// Number of trees
    #[arg(long)]
    pub n_estimators: Option<usize>,

    /// Seed for the split and the forest
    #[arg(long)]
    pub random_state: Option<u64>,
}

impl TrainCommand {
    fn resolve(&self, cfg: &AppCfg) -> Result<TrainConfig> {
        let mut train_cfg = match &self.config {
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                TrainConfig::parse(&raw)
                    .with_context(|| format!("invalid training config {}", path.display()))?
            }
            None => TrainConfig::from_app(cfg),
        };

        if let Some(v) = &self.dataset {
            train_cfg.dataset = v.clone();
        }
        if let Some(v) = &self.experiment {
            train_cfg.experiment = v.clone();
        }
        if let Some(v) = &self.model_name {
            train_cfg.model_name = v.clone();
        }
        if let Some(v) = self.n_estimators {
            train_cfg.forest.n_estimators = v;
        }
        if let Some(v) = self.random_state {
            train_cfg.random_state = v;
            train_cfg.forest.random_state = v;
        }
        Ok(train_cfg)
    }

    pub fn run(&self, cfg: &AppCfg) -> Result<()> {
        let train_cfg = self.resolve(cfg)?;
        info!(
            ev = "train_start",
            experiment = %train_cfg.experiment,
            dataset = %train_cfg.dataset,
            model = %train_cfg.model_name,
        );

        let outcome = service::train(
            &train_cfg,
            &FsDataRepo::new(cfg),
            &FsTracker::new(cfg),
            &FsModelRepo::new(cfg),
        )
        .context("training failed")?;

        println!("MAE: {}", outcome.eval.mae);
        println!("MSE: {}", outcome.eval.mse);
        println!("run: {}", outcome.run.run_id);
        println!(
            "registered: {} version {}",
            outcome.model.name, outcome.model.version
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.json");
        fs::write(&path, r#"{"dataset": "from-file", "random_state": 1}"#).unwrap();

        let cmd = TrainCommand {
            config: Some(path),
            dataset: None,
            experiment: Some("from-flag".into()),
            model_name: None,
            n_estimators: Some(7),
            random_state: None,
        };
        let resolved = cmd.resolve(&AppCfg::default()).unwrap();
        assert_eq!(resolved.dataset, "from-file");
        assert_eq!(resolved.experiment, "from-flag");
        assert_eq!(resolved.random_state, 1);
        assert_eq!(resolved.forest.n_estimators, 7);
    }
}
