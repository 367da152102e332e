//! Training domain: preprocessing, the forest regressor, the fitted pipeline
//! and the model registry.

pub mod domain;
pub mod forest;
pub mod pipeline;
pub mod preprocess;
pub mod repo_fs;
pub mod service;

pub use domain::{ModelArtifact, ModelRepo, ModelVersion, TrainConfig};
pub use forest::ForestParams;
pub use pipeline::Pipeline;
pub use repo_fs::FsModelRepo;
