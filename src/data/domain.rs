//! Core dataset definitions and contracts.

use serde::{Deserialize, Serialize};

use crate::common::error::SalesResult;

pub const COL_MONTH: &str = "Mes";
pub const COL_TITLE: &str = "Titulo";
pub const COL_SUBJECT: &str = "Assunto";
pub const COL_SALES: &str = "Vendas";

/// Feature columns in the order the pipeline expects them.
pub const FEATURE_COLUMNS: [&str; 3] = [COL_MONTH, COL_TITLE, COL_SUBJECT];

/// Content-derived identifier for datasets (`ds-<fnv hex>`).
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct DatasetId(String);

impl DatasetId {
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DatasetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One row of the sales table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    #[serde(rename = "Mes")]
    pub month: f64,
    #[serde(rename = "Titulo")]
    pub title: String,
    #[serde(rename = "Assunto")]
    pub subject: String,
    #[serde(rename = "Vendas")]
    pub sales: f64,
}

/// Model input: a sales record without its target.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    #[serde(rename = "Mes")]
    pub month: f64,
    #[serde(rename = "Titulo")]
    pub title: String,
    #[serde(rename = "Assunto")]
    pub subject: String,
}

impl FeatureRow {
    pub fn new(month: f64, title: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            month,
            title: title.into(),
            subject: subject.into(),
        }
    }
}

impl SalesRecord {
    pub fn features(&self) -> FeatureRow {
        FeatureRow {
            month: self.month,
            title: self.title.clone(),
            subject: self.subject.clone(),
        }
    }
}

/// Metadata stored next to the raw CSV in the registry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DatasetMeta {
    pub name: String,
    pub id: DatasetId,
    pub rows: u64,
    pub created_ms: i64,
}

/// A registered dataset with its records loaded.
#[derive(Clone, Debug)]
pub struct Dataset {
    pub meta: DatasetMeta,
    pub records: Vec<SalesRecord>,
}

impl Dataset {
    /// Split records into feature rows and targets, keeping positions aligned.
    pub fn features_and_target(records: &[SalesRecord]) -> (Vec<FeatureRow>, Vec<f64>) {
        records.iter().map(|r| (r.features(), r.sales)).unzip()
    }
}

/// Repository contract for dataset persistence.
pub trait DataRepo {
    /// Store the raw CSV bytes under `meta.name`, replacing any previous copy.
    fn put_dataset(&self, meta: &DatasetMeta, raw_csv: &[u8]) -> SalesResult<()>;
    fn get_dataset(&self, name: &str) -> SalesResult<Dataset>;
    fn list_datasets(&self) -> SalesResult<Vec<DatasetMeta>>;
}
