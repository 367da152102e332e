//! Evaluation summary for a fitted pipeline.

use serde::{Deserialize, Serialize};

pub const METRIC_MAE: &str = "MAE";
pub const METRIC_MSE: &str = "MSE";
pub const METRIC_R2: &str = "R2";

/// Hold-out metrics for one model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvalSuite {
    pub mae: f64,
    pub mse: f64,
    /// `None` when the test targets are constant.
    pub r2: Option<f64>,
    pub n_test: usize,
}

impl EvalSuite {
    /// Name/value pairs in the order they are logged.
    pub fn metrics(&self) -> Vec<(&'static str, f64)> {
        let mut out = vec![(METRIC_MAE, self.mae), (METRIC_MSE, self.mse)];
        if let Some(r2) = self.r2 {
            out.push((METRIC_R2, r2));
        }
        out
    }
}
