//! Inference domain: the JSON scoring envelope and the model-backed scorer.

pub mod domain;
pub mod service;

pub use domain::ScoreResponse;
pub use service::Scorer;
