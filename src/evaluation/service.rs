//! Regression metrics and hold-out evaluation of a fitted pipeline.

use crate::common::error::{SalesError, SalesResult};
use crate::data::domain::{Dataset, SalesRecord};
use crate::training::pipeline::Pipeline;

use super::domain::EvalSuite;

fn check_pair(y_true: &[f64], y_pred: &[f64]) -> SalesResult<()> {
    if y_true.is_empty() {
        return Err(SalesError::invalid("metrics need at least one sample"));
    }
    if y_true.len() != y_pred.len() {
        return Err(SalesError::invalid(format!(
            "{} targets but {} predictions",
            y_true.len(),
            y_pred.len()
        )));
    }
    Ok(())
}

pub fn mean_absolute_error(y_true: &[f64], y_pred: &[f64]) -> SalesResult<f64> {
    check_pair(y_true, y_pred)?;
    let total: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).abs()).sum();
    Ok(total / y_true.len() as f64)
}

pub fn mean_squared_error(y_true: &[f64], y_pred: &[f64]) -> SalesResult<f64> {
    check_pair(y_true, y_pred)?;
    let total: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).powi(2)).sum();
    Ok(total / y_true.len() as f64)
}

/// Coefficient of determination; `None` if `y_true` has zero variance.
pub fn r2_score(y_true: &[f64], y_pred: &[f64]) -> SalesResult<Option<f64>> {
    check_pair(y_true, y_pred)?;
    let mean = y_true.iter().sum::<f64>() / y_true.len() as f64;
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();
    if ss_tot == 0.0 {
        return Ok(None);
    }
    let ss_res: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).powi(2)).sum();
    Ok(Some(1.0 - ss_res / ss_tot))
}

/// Score `pipeline` on held-out records.
pub fn evaluate(pipeline: &Pipeline, test: &[SalesRecord]) -> SalesResult<EvalSuite> {
    let (rows, y_true) = Dataset::features_and_target(test);
    let y_pred = pipeline.predict(&rows)?;
    Ok(EvalSuite {
        mae: mean_absolute_error(&y_true, &y_pred)?,
        mse: mean_squared_error(&y_true, &y_pred)?,
        r2: r2_score(&y_true, &y_pred)?,
        n_test: test.len(),
    })
}
