//! Filesystem model registry.
//!
//! Layout: `<data_root>/models/<name>/<version>/{model.json,version.json}`.
//! Versions start at 1 and only ever grow.

use std::fs;
use std::path::PathBuf;

use tracing::info;

use crate::common::config::AppCfg;
use crate::common::error::{SalesError, SalesResult};
use crate::common::time;

use super::domain::{ModelArtifact, ModelRepo, ModelSource, ModelVersion};

pub struct FsModelRepo {
    root: PathBuf,
}

impl FsModelRepo {
    pub fn new(cfg: &AppCfg) -> Self {
        Self {
            root: cfg.data_root.join("models"),
        }
    }

    fn model_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn version_dir(&self, name: &str, version: u32) -> PathBuf {
        self.model_dir(name).join(version.to_string())
    }

    fn versions_on_disk(&self, name: &str) -> SalesResult<Vec<u32>> {
        let dir = self.model_dir(name);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut versions = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let parsed = entry.file_name().to_str().and_then(|s| s.parse::<u32>().ok());
            if let Some(v) = parsed {
                if entry.path().join("version.json").exists() {
                    versions.push(v);
                }
            }
        }
        versions.sort_unstable();
        Ok(versions)
    }
}

fn check_name(name: &str) -> SalesResult<()> {
    let ok = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if ok {
        Ok(())
    } else {
        Err(SalesError::invalid(format!("model name {name:?}")))
    }
}

impl ModelRepo for FsModelRepo {
    fn register(
        &self,
        name: &str,
        artifact: &ModelArtifact,
        source: ModelSource,
    ) -> SalesResult<ModelVersion> {
        check_name(name)?;
        let version = self.versions_on_disk(name)?.last().map_or(1, |v| v + 1);
        let dir = self.version_dir(name, version);
        fs::create_dir_all(&dir)?;

        let artefact_path = dir.join("model.json");
        fs::write(&artefact_path, artifact.to_bytes()?)?;

        let entry = ModelVersion {
            name: name.to_string(),
            version,
            created_ms: time::now_ms(),
            source,
            artefact_path,
        };
        // version.json last: a directory without it is not a registered version
        fs::write(dir.join("version.json"), serde_json::to_vec_pretty(&entry)?)?;

        info!(ev = "model_registered", model = name, version, run_id = %entry.source.run_id);
        Ok(entry)
    }

    fn get(&self, name: &str, version: Option<u32>) -> SalesResult<ModelVersion> {
        check_name(name)?;
        let resolved = match version {
            Some(v) => v,
            None => *self
                .versions_on_disk(name)?
                .last()
                .ok_or_else(|| SalesError::model_missing(name, None))?,
        };
        let path = self.version_dir(name, resolved).join("version.json");
        if !path.exists() {
            return Err(SalesError::model_missing(name, version));
        }
        Ok(serde_json::from_slice(&fs::read(path)?)?)
    }

    fn list(&self, name: &str) -> SalesResult<Vec<ModelVersion>> {
        check_name(name)?;
        self.versions_on_disk(name)?
            .into_iter()
            .map(|v| self.get(name, Some(v)))
            .collect()
    }

    fn load_artifact(&self, version: &ModelVersion) -> SalesResult<ModelArtifact> {
        let bytes = fs::read(&version.artefact_path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                SalesError::model_missing(&version.name, Some(version.version))
            } else {
                SalesError::Io(err)
            }
        })?;
        ModelArtifact::from_bytes(&bytes)
    }
}
