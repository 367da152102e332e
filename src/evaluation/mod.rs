//! Regression metrics and hold-out evaluation.

pub mod domain;
pub mod service;

pub use domain::EvalSuite;
