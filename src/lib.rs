//! Book sales regression: training, experiment tracking, model registry and
//! JSON scoring.
pub mod api;
pub mod cli;
pub mod common;
pub mod data;
pub mod evaluation;
pub mod inference;
pub mod tracking;
pub mod training;

pub use common::{AppCfg, SalesError, SalesResult};
pub use inference::{ScoreResponse, Scorer};
pub use training::{Pipeline, TrainConfig};
