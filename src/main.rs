//! `booksales` binary: dispatches to the CLI commands.

use anyhow::Result;
use clap::Parser;
use tracing::info;

use booksales::cli::Cli;
use booksales::common::{log, AppCfg};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut cfg = AppCfg::load()?;
    cli.apply(&mut cfg);
    log::init(&cfg);

    info!(ev = "cli_start", data_root = %cfg.data_root.display());
    cli.run(&cfg)
}
