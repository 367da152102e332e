//! `booksales models` and `booksales runs`: tabular listings of the registry
//! and the tracker.

use anyhow::Result;
use clap::Args;

use crate::common::config::AppCfg;
use crate::evaluation::domain::{METRIC_MAE, METRIC_MSE};
use crate::tracking::domain::Tracker;
use crate::tracking::repo_fs::FsTracker;
use crate::training::domain::ModelRepo;
use crate::training::repo_fs::FsModelRepo;

use super::format_ms;

/// List registered versions of a model.
#[derive(Args, Debug, Clone)]
pub struct ModelsCommand {
    /// Model name (defaults to the configured model)
    #[arg(long, short = 'm')]
    pub model: Option<String>,
}

impl ModelsCommand {
    pub fn run(&self, cfg: &AppCfg) -> Result<()> {
        let name = self.model.as_deref().unwrap_or(&cfg.model_name);
        let versions = FsModelRepo::new(cfg).list(name)?;
        if versions.is_empty() {
            println!("no versions registered for {name}");
            return Ok(());
        }
        println!("{:<8} {:<20} {:<34} {:>12} {:>12}", "VERSION", "CREATED", "RUN", METRIC_MAE, METRIC_MSE);
        for v in versions {
            let metric = |k: &str| {
                v.source
                    .metrics
                    .get(k)
                    .map_or_else(|| "-".to_string(), |m| format!("{m:.4}"))
            };
            println!(
                "{:<8} {:<20} {:<34} {:>12} {:>12}",
                v.version,
                format_ms(v.created_ms),
                v.source.run_id,
                metric(METRIC_MAE),
                metric(METRIC_MSE),
            );
        }
        Ok(())
    }
}

/// List tracked runs, newest first.
#[derive(Args, Debug, Clone)]
pub struct RunsCommand {
    /// Experiment name (defaults to the configured experiment)
    #[arg(long, short = 'e')]
    pub experiment: Option<String>,
}

impl RunsCommand {
    pub fn run(&self, cfg: &AppCfg) -> Result<()> {
        let experiment = self.experiment.as_deref().unwrap_or(&cfg.experiment);
        let runs = FsTracker::new(cfg).list_runs(experiment)?;
        if runs.is_empty() {
            println!("no runs in {experiment}");
            return Ok(());
        }
        println!("{:<34} {:<9} {:<20} {:>12} {:>12}", "RUN", "STATUS", "STARTED", METRIC_MAE, METRIC_MSE);
        for run in runs {
            let metric = |k: &str| {
                run.latest_metric(k)
                    .map_or_else(|| "-".to_string(), |m| format!("{m:.4}"))
            };
            println!(
                "{:<34} {:<9} {:<20} {:>12} {:>12}",
                run.run_id,
                format!("{:?}", run.status).to_uppercase(),
                format_ms(run.start_ms),
                metric(METRIC_MAE),
                metric(METRIC_MSE),
            );
        }
        Ok(())
    }
}
