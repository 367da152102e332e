//! Preprocessor and regressor fitted and invoked as one unit.

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

use crate::common::error::{SalesError, SalesResult};
use crate::data::domain::FeatureRow;

use super::forest::{ForestParams, RandomForestRegressor};
use super::preprocess::ColumnTransformer;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    preprocessor: ColumnTransformer,
    regressor: RandomForestRegressor,
}

impl Pipeline {
    pub fn fit(rows: &[FeatureRow], targets: &[f64], params: &ForestParams) -> SalesResult<Self> {
        if rows.len() != targets.len() {
            return Err(SalesError::invalid(format!(
                "{} rows but {} targets",
                rows.len(),
                targets.len()
            )));
        }
        let preprocessor = ColumnTransformer::fit(rows)?;
        let x = preprocessor.transform(rows);
        let regressor = RandomForestRegressor::fit(x.view(), ArrayView1::from(targets), params)?;
        Ok(Self {
            preprocessor,
            regressor,
        })
    }

    pub fn predict(&self, rows: &[FeatureRow]) -> SalesResult<Vec<f64>> {
        if let Some(row) = rows.iter().find(|r| !r.month.is_finite()) {
            return Err(SalesError::invalid(format!("Mes is not finite: {}", row.month)));
        }
        let x = self.preprocessor.transform(rows);
        self.regressor.predict(x.view())
    }

    pub fn preprocessor(&self) -> &ColumnTransformer {
        &self.preprocessor
    }

    pub fn regressor(&self) -> &RandomForestRegressor {
        &self.regressor
    }
}
