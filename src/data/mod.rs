//! Data domain: ingest, validation and persistence of sales datasets.

pub mod domain;
pub mod repo_fs;
pub mod service;

pub use domain::{DataRepo, Dataset, DatasetId, DatasetMeta, FeatureRow, SalesRecord};
pub use repo_fs::FsDataRepo;
