//! Logging setup on top of `tracing`.
//!
//! Events carry an `ev` field naming what happened and, where it applies, a
//! `dur_ms` field, so both the pretty and the JSON formats stay greppable.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::common::config::AppCfg;

/// Install the global subscriber. A second call is a no-op.
///
/// `RUST_LOG` wins over `cfg.log_level` when set.
pub fn init(cfg: &AppCfg) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cfg.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if cfg.log_json {
        registry
            .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .try_init()
    };

    if result.is_err() {
        tracing::debug!(ev = "log_init_skipped", "global subscriber already installed");
    }
}
