//! Command-line interface.
//!
//! ```bash
//! booksales ingest --path vendas.csv --name vendas_livros
//! booksales train --config train.json
//! booksales score --input request.json
//! booksales models
//! booksales runs
//! ```

mod ingest;
mod inspect;
mod score;
mod train;

use clap::{Parser, Subcommand};

use crate::common::config::AppCfg;

pub use ingest::IngestCommand;
pub use inspect::{ModelsCommand, RunsCommand};
pub use score::ScoreCommand;
pub use train::TrainCommand;

/// Train, register and score the book sales regression model.
#[derive(Parser, Debug)]
#[command(name = "booksales")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Root directory for datasets, runs and registered models
    #[arg(long, global = true, env = "BOOKSALES_DATA_ROOT")]
    pub data_root: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Register a sales CSV as a named dataset
    Ingest(IngestCommand),

    /// Train the model, log the run and register the result
    Train(TrainCommand),

    /// Score a JSON request with a registered model
    Score(ScoreCommand),

    /// List registered versions of a model
    Models(ModelsCommand),

    /// List tracked runs of an experiment
    Runs(RunsCommand),
}

impl Cli {
    /// Apply global flags on top of the loaded configuration.
    pub fn apply(&self, cfg: &mut AppCfg) {
        if let Some(root) = &self.data_root {
            cfg.data_root = root.clone();
        }
    }

    pub fn run(&self, cfg: &AppCfg) -> anyhow::Result<()> {
        match &self.command {
            Commands::Ingest(cmd) => cmd.run(cfg),
            Commands::Train(cmd) => cmd.run(cfg),
            Commands::Score(cmd) => cmd.run(cfg),
            Commands::Models(cmd) => cmd.run(cfg),
            Commands::Runs(cmd) => cmd.run(cfg),
        }
    }
}

fn format_ms(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ms.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_train_overrides() {
        let cli = Cli::try_parse_from([
            "booksales",
            "--data-root",
            "/tmp/books",
            "train",
            "--dataset",
            "vendas_2024",
            "--n-estimators",
            "10",
        ])
        .unwrap();
        let mut cfg = AppCfg::default();
        cli.apply(&mut cfg);
        assert_eq!(cfg.data_root, std::path::PathBuf::from("/tmp/books"));
        match cli.command {
            Commands::Train(cmd) => {
                assert_eq!(cmd.dataset.as_deref(), Some("vendas_2024"));
                assert_eq!(cmd.n_estimators, Some(10));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn score_defaults_to_stdin() {
        let cli = Cli::try_parse_from(["booksales", "score"]).unwrap();
        match cli.command {
            Commands::Score(cmd) => assert_eq!(cmd.input, std::path::PathBuf::from("-")),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn formats_timestamps() {
        assert_eq!(format_ms(0), "1970-01-01 00:00:00");
    }
}
