//! `booksales score`: run a request through a registered model.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use crate::common::config::AppCfg;
use crate::inference::service::Scorer;

/// Score a `{"data": [...]}` request with a registered model.
///
/// Prints `{"predictions": [...]}` or `{"error": "..."}`; a bad request is
/// reported in the body, not through the exit status.
#[derive(Args, Debug, Clone)]
pub struct ScoreCommand {
    /// Request file, or `-` for stdin
    #[arg(long, short = 'i', default_value = "-")]
    pub input: PathBuf,

    /// Registered model name (defaults to the configured model)
    #[arg(long, short = 'm')]
    pub model: Option<String>,

    /// Model version (defaults to the latest)
    #[arg(long = "model-version", short = 'v')]
    pub model_version: Option<u32>,
}

impl ScoreCommand {
    pub fn run(&self, cfg: &AppCfg) -> Result<()> {
        let mut cfg = cfg.clone();
        if let Some(model) = &self.model {
            cfg.model_name = model.clone();
        }
        let scorer = Scorer::init(&cfg, self.model_version)
            .with_context(|| format!("failed to load model {}", cfg.model_name))?;

        let raw = read_input(&self.input)?;
        println!("{}", scorer.run_json(&raw));
        Ok(())
    }
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut raw = String::new();
        std::io::stdin()
            .read_to_string(&mut raw)
            .context("failed to read request from stdin")?;
        Ok(raw)
    } else {
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
    }
}
