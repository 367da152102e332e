//! Domain types for model training and versioning.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::common::config::AppCfg;
use crate::common::error::{SalesError, SalesResult};
use crate::data::domain::{DatasetId, FEATURE_COLUMNS};

use super::forest::ForestParams;
use super::pipeline::Pipeline;

pub const ARTIFACT_FORMAT_VERSION: u32 = 1;
pub const ARTIFACT_FLAVOR: &str = "booksales.pipeline";

/// Training configuration, usually read from a JSON file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainConfig {
    pub experiment: String,
    pub dataset: String,
    pub model_name: String,
    pub test_size: f64,
    pub random_state: u64,
    pub forest: ForestParams,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self::from_app(&AppCfg::default())
    }
}

impl TrainConfig {
    /// Defaults with names taken from the runtime configuration.
    pub fn from_app(cfg: &AppCfg) -> Self {
        Self {
            experiment: cfg.experiment.clone(),
            dataset: cfg.dataset.clone(),
            model_name: cfg.model_name.clone(),
            test_size: 0.2,
            random_state: 42,
            forest: ForestParams::default(),
        }
    }

    pub fn parse(raw: &str) -> SalesResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Flattened parameters as logged to the tracker.
    pub fn params(&self) -> BTreeMap<String, String> {
        let f = &self.forest;
        let mut out = BTreeMap::new();
        out.insert("dataset".into(), self.dataset.clone());
        out.insert("test_size".into(), self.test_size.to_string());
        out.insert("random_state".into(), self.random_state.to_string());
        out.insert("n_estimators".into(), f.n_estimators.to_string());
        out.insert("forest_random_state".into(), f.random_state.to_string());
        out.insert(
            "max_depth".into(),
            f.max_depth.map_or_else(|| "None".to_string(), |d| d.to_string()),
        );
        out.insert("min_samples_split".into(), f.min_samples_split.to_string());
        out.insert("min_samples_leaf".into(), f.min_samples_leaf.to_string());
        out.insert("bootstrap".into(), f.bootstrap.to_string());
        out
    }
}

/// Serialized model as written to the tracker and the registry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub flavor: String,
    pub feature_columns: Vec<String>,
    pub created_ms: i64,
    pub pipeline: Pipeline,
}

impl ModelArtifact {
    pub fn new(pipeline: Pipeline, created_ms: i64) -> Self {
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            flavor: ARTIFACT_FLAVOR.to_string(),
            feature_columns: FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            created_ms,
            pipeline,
        }
    }

    pub fn to_bytes(&self) -> SalesResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> SalesResult<Self> {
        let artifact: Self = serde_json::from_slice(bytes)?;
        if artifact.flavor != ARTIFACT_FLAVOR {
            return Err(SalesError::invalid(format!(
                "unsupported model flavor {:?}",
                artifact.flavor
            )));
        }
        if artifact.format_version > ARTIFACT_FORMAT_VERSION {
            return Err(SalesError::invalid(format!(
                "model format version {} is newer than supported {}",
                artifact.format_version, ARTIFACT_FORMAT_VERSION
            )));
        }
        Ok(artifact)
    }
}

/// Where a registered version came from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelSource {
    pub experiment: String,
    pub run_id: String,
    pub dataset: DatasetId,
    pub metrics: BTreeMap<String, f64>,
}

/// Registry entry for one model version.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelVersion {
    pub name: String,
    pub version: u32,
    pub created_ms: i64,
    pub source: ModelSource,
    /// Absolute path of the stored `model.json`.
    pub artefact_path: PathBuf,
}

/// Repository contract for registered models.
pub trait ModelRepo {
    /// Store `artifact` as the next version of `name`.
    fn register(
        &self,
        name: &str,
        artifact: &ModelArtifact,
        source: ModelSource,
    ) -> SalesResult<ModelVersion>;

    /// A specific version, or the latest when `version` is `None`.
    fn get(&self, name: &str, version: Option<u32>) -> SalesResult<ModelVersion>;

    /// All versions of `name` in ascending order.
    fn list(&self, name: &str) -> SalesResult<Vec<ModelVersion>>;

    fn load_artifact(&self, version: &ModelVersion) -> SalesResult<ModelArtifact>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_match_reference_pipeline() {
        let cfg = TrainConfig::default();
        assert_eq!(cfg.test_size, 0.2);
        assert_eq!(cfg.random_state, 42);
        assert_eq!(cfg.forest.n_estimators, 100);
        assert_eq!(cfg.forest.random_state, 42);
        assert_eq!(cfg.model_name, "livraria-vendas-model");
    }

    #[test]
    fn partial_config_fills_defaults() {
        let cfg = TrainConfig::parse(r#"{"dataset": "vendas_2024", "forest": {"n_estimators": 10}}"#)
            .unwrap();
        assert_eq!(cfg.dataset, "vendas_2024");
        assert_eq!(cfg.forest.n_estimators, 10);
        assert_eq!(cfg.forest.min_samples_leaf, 1);
        assert_eq!(cfg.experiment, "livraria-vendas-prediction");
    }

    #[test]
    fn unknown_config_key_is_rejected() {
        assert!(TrainConfig::parse(r#"{"learning_rate": 0.1}"#).is_err());
    }

    #[test]
    fn params_are_flattened() {
        let params = TrainConfig::default().params();
        assert_eq!(params["n_estimators"], "100");
        assert_eq!(params["max_depth"], "None");
        assert_eq!(params["test_size"], "0.2");
    }

    #[test]
    fn foreign_flavor_is_rejected() {
        let raw = br#"{"format_version":1,"flavor":"sklearn","feature_columns":[],"created_ms":0,"pipeline":null}"#;
        assert!(ModelArtifact::from_bytes(raw).is_err());
    }
}
