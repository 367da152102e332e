//! Column preprocessing: one-hot encoding of the categorical columns with the
//! month passed through as the last feature.

use std::collections::BTreeSet;

use ndarray::{Array1, Array2, ArrayViewMut1};
use serde::{Deserialize, Serialize};

use crate::common::error::{SalesError, SalesResult};
use crate::data::domain::{FeatureRow, COL_MONTH, COL_SUBJECT, COL_TITLE};

/// One-hot encoder for a single categorical column.
///
/// Categories are kept sorted. A value not seen during fit encodes to all
/// zeros instead of failing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    column: String,
    categories: Vec<String>,
}

impl OneHotEncoder {
    pub fn fit<'v>(column: &str, values: impl IntoIterator<Item = &'v str>) -> Self {
        let categories: BTreeSet<&str> = values.into_iter().collect();
        Self {
            column: column.to_string(),
            categories: categories.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn width(&self) -> usize {
        self.categories.len()
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Column of `value` within this encoder's block, if it was seen at fit.
    pub fn position(&self, value: &str) -> Option<usize> {
        self.categories
            .binary_search_by(|c| c.as_str().cmp(value))
            .ok()
    }

    pub fn feature_names(&self) -> impl Iterator<Item = String> + '_ {
        self.categories
            .iter()
            .map(move |c| format!("cat__{}_{}", self.column, c))
    }
}

/// Fixed column layout: `Titulo` one-hot, `Assunto` one-hot, then `Mes`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnTransformer {
    title: OneHotEncoder,
    subject: OneHotEncoder,
}

impl ColumnTransformer {
    pub fn fit(rows: &[FeatureRow]) -> SalesResult<Self> {
        if rows.is_empty() {
            return Err(SalesError::invalid("cannot fit preprocessor on zero rows"));
        }
        Ok(Self {
            title: OneHotEncoder::fit(COL_TITLE, rows.iter().map(|r| r.title.as_str())),
            subject: OneHotEncoder::fit(COL_SUBJECT, rows.iter().map(|r| r.subject.as_str())),
        })
    }

    pub fn n_features_out(&self) -> usize {
        self.title.width() + self.subject.width() + 1
    }

    /// Write one encoded row into a zeroed `out`.
    fn fill(&self, row: &FeatureRow, mut out: ArrayViewMut1<'_, f64>) {
        if let Some(pos) = self.title.position(&row.title) {
            out[pos] = 1.0;
        }
        if let Some(pos) = self.subject.position(&row.subject) {
            out[self.title.width() + pos] = 1.0;
        }
        out[self.n_features_out() - 1] = row.month;
    }

    pub fn transform_row(&self, row: &FeatureRow) -> Array1<f64> {
        let mut out = Array1::zeros(self.n_features_out());
        self.fill(row, out.view_mut());
        out
    }

    /// Encode `rows` into a dense `rows.len() x n_features_out()` matrix.
    pub fn transform(&self, rows: &[FeatureRow]) -> Array2<f64> {
        let mut x = Array2::zeros((rows.len(), self.n_features_out()));
        for (out, row) in x.rows_mut().into_iter().zip(rows) {
            self.fill(row, out);
        }
        x
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.title
            .feature_names()
            .chain(self.subject.feature_names())
            .chain(std::iter::once(format!("remainder__{COL_MONTH}")))
            .collect()
    }
}
