//! Scoring service: load a registered model once, then answer raw JSON requests.

use std::time::Instant;

use tracing::{info, warn};

use crate::common::config::AppCfg;
use crate::common::error::SalesResult;
use crate::common::time;
use crate::data::domain::FeatureRow;
use crate::training::domain::{ModelRepo, ModelVersion};
use crate::training::pipeline::Pipeline;
use crate::training::repo_fs::FsModelRepo;
use crate::training::service as training_service;

use super::domain::{parse_request, ScoreResponse};

const FALLBACK_ERROR_JSON: &str = r#"{"error":"failed to encode response"}"#;

/// A loaded model ready to score requests.
#[derive(Clone, Debug)]
pub struct Scorer {
    model: Option<ModelVersion>,
    pipeline: Pipeline,
}

impl Scorer {
    /// Load `cfg.model_name` from the filesystem registry; `None` picks the latest version.
    pub fn init(cfg: &AppCfg, version: Option<u32>) -> SalesResult<Self> {
        Self::from_registry(&FsModelRepo::new(cfg), &cfg.model_name, version)
    }

    pub fn from_registry(
        models: &dyn ModelRepo,
        name: &str,
        version: Option<u32>,
    ) -> SalesResult<Self> {
        let (model, pipeline) = training_service::load_model(models, name, version)?;
        Ok(Self {
            model: Some(model),
            pipeline,
        })
    }

    /// Wrap an in-memory pipeline that never went through the registry.
    pub fn from_pipeline(pipeline: Pipeline) -> Self {
        Self {
            model: None,
            pipeline,
        }
    }

    pub fn model(&self) -> Option<&ModelVersion> {
        self.model.as_ref()
    }

    pub fn predict_rows(&self, rows: &[FeatureRow]) -> SalesResult<Vec<f64>> {
        self.pipeline.predict(rows)
    }

    /// Score a raw request. Never fails: any error becomes `{"error": ..}`.
    pub fn run(&self, raw: &str) -> ScoreResponse {
        let start = Instant::now();
        let result = parse_request(raw).and_then(|rows| self.predict_rows(&rows));
        match result {
            Ok(predictions) => {
                info!(ev = "scored", rows = predictions.len(), dur_ms = time::elapsed_ms(start));
                ScoreResponse::Predictions { predictions }
            }
            Err(err) => {
                warn!(ev = "score_failed", error = %err, dur_ms = time::elapsed_ms(start));
                ScoreResponse::error(&err)
            }
        }
    }

    /// [`Scorer::run`] serialized to a JSON string.
    pub fn run_json(&self, raw: &str) -> String {
        serde_json::to_string(&self.run(raw)).unwrap_or_else(|_| FALLBACK_ERROR_JSON.to_string())
    }
}
