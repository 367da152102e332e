//! Training workflow: load, split, fit, evaluate, track and register.

use std::time::Instant;

use tracing::{error, info, warn};

use crate::common::error::SalesResult;
use crate::common::time;
use crate::data::domain::{DataRepo, Dataset, DatasetId, SalesRecord};
use crate::data::service as data_service;
use crate::evaluation::domain::EvalSuite;
use crate::evaluation::service as eval_service;
use crate::tracking::domain::{Run, RunStatus, Tracker};

use super::domain::{ModelArtifact, ModelRepo, ModelSource, ModelVersion, TrainConfig};
use super::pipeline::Pipeline;

/// Artifact path of the model inside a tracked run.
pub const MODEL_ARTIFACT_PATH: &str = "model/model.json";

/// Everything a finished training run produced.
#[derive(Debug)]
pub struct TrainOutcome {
    pub run: Run,
    pub dataset: DatasetId,
    pub eval: EvalSuite,
    pub model: ModelVersion,
    pub pipeline: Pipeline,
}

/// Split `records`, fit the pipeline on the training side and score the rest.
///
/// Pure apart from logging; the same records and config give the same result.
pub fn fit_and_evaluate(
    cfg: &TrainConfig,
    records: &[SalesRecord],
) -> SalesResult<(Pipeline, EvalSuite)> {
    let (train, test) = data_service::train_test_split(records, cfg.test_size, cfg.random_state)?;
    let (rows, targets) = Dataset::features_and_target(&train);

    let start = Instant::now();
    let pipeline = Pipeline::fit(&rows, &targets, &cfg.forest)?;
    info!(
        ev = "model_fitted",
        n_train = train.len(),
        n_features = pipeline.preprocessor().n_features_out(),
        n_estimators = cfg.forest.n_estimators,
        dur_ms = time::elapsed_ms(start),
    );

    let eval = eval_service::evaluate(&pipeline, &test)?;
    info!(ev = "model_evaluated", n_test = eval.n_test, mae = eval.mae, mse = eval.mse);
    Ok((pipeline, eval))
}

/// Run the full training workflow inside a tracked run.
///
/// Any failure ends the run as `FAILED` and is returned unchanged.
pub fn train(
    cfg: &TrainConfig,
    data: &dyn DataRepo,
    tracker: &dyn Tracker,
    models: &dyn ModelRepo,
) -> SalesResult<TrainOutcome> {
    let mut run = tracker.start_run(&cfg.experiment)?;

    match train_in_run(cfg, data, tracker, models, &mut run) {
        Ok((dataset, eval, model, pipeline)) => {
            tracker.end_run(&mut run, RunStatus::Finished)?;
            Ok(TrainOutcome {
                run,
                dataset,
                eval,
                model,
                pipeline,
            })
        }
        Err(err) => {
            error!(ev = "train_failed", run_id = %run.run_id, error = %err);
            if let Err(end_err) = tracker.end_run(&mut run, RunStatus::Failed) {
                warn!(ev = "run_end_failed", run_id = %run.run_id, error = %end_err);
            }
            Err(err)
        }
    }
}

fn train_in_run(
    cfg: &TrainConfig,
    data: &dyn DataRepo,
    tracker: &dyn Tracker,
    models: &dyn ModelRepo,
    run: &mut Run,
) -> SalesResult<(DatasetId, EvalSuite, ModelVersion, Pipeline)> {
    for (key, value) in cfg.params() {
        tracker.log_param(run, &key, &value)?;
    }

    let dataset = data_service::load_by_name(data, &cfg.dataset)?;
    tracker.log_param(run, "dataset_id", dataset.meta.id.as_str())?;

    let (pipeline, eval) = fit_and_evaluate(cfg, &dataset.records)?;
    for (key, value) in eval.metrics() {
        tracker.log_metric(run, key, value, 0)?;
    }

    let artifact = ModelArtifact::new(pipeline.clone(), time::now_ms());
    tracker.log_artifact(run, MODEL_ARTIFACT_PATH, &artifact.to_bytes()?)?;

    let source = ModelSource {
        experiment: run.experiment.clone(),
        run_id: run.run_id.clone(),
        dataset: dataset.meta.id.clone(),
        metrics: eval.metrics().into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
    };
    let model = models.register(&cfg.model_name, &artifact, source)?;

    Ok((dataset.meta.id, eval, model, pipeline))
}

/// Resolve a registered model and load its pipeline.
pub fn load_model(
    models: &dyn ModelRepo,
    name: &str,
    version: Option<u32>,
) -> SalesResult<(ModelVersion, Pipeline)> {
    let entry = models.get(name, version)?;
    let artifact = models.load_artifact(&entry)?;
    info!(ev = "model_loaded", model = name, version = entry.version);
    Ok((entry, artifact.pipeline))
}
