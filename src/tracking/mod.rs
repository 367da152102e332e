//! Experiment tracking: runs with params, metric history and artifacts.

pub mod domain;
pub mod repo_fs;

pub use domain::{MetricPoint, Run, RunStatus, Tracker};
pub use repo_fs::FsTracker;
