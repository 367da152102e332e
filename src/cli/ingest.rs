//! `booksales ingest`: register a sales CSV as a named dataset.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::common::config::AppCfg;
use crate::data::repo_fs::FsDataRepo;
use crate::data::service;

/// Register a CSV with columns `Mes,Titulo,Assunto,Vendas` under a dataset name.
#[derive(Args, Debug, Clone)]
pub struct IngestCommand {
    /// CSV file to ingest
    #[arg(long, short = 'p')]
    pub path: PathBuf,

    /// Dataset name (defaults to the configured dataset)
    #[arg(long, short = 'n')]
    pub name: Option<String>,
}

impl IngestCommand {
    pub fn run(&self, cfg: &AppCfg) -> Result<()> {
        let name = self.name.as_deref().unwrap_or(&cfg.dataset);
        let repo = FsDataRepo::new(cfg);
        let id = service::ingest_file(&repo, &self.path, name)
            .with_context(|| format!("failed to ingest {}", self.path.display()))?;
        println!("{name}: {id}");
        Ok(())
    }
}
