//! Filesystem-backed dataset registry.
//!
//! Layout: `<data_root>/datasets/<name>/data.csv` plus `meta.json`.

use std::fs;
use std::path::PathBuf;

use crate::common::config::AppCfg;
use crate::common::error::{SalesError, SalesResult};

use super::domain::{DataRepo, Dataset, DatasetMeta};
use super::service::parse_records;

/// Filesystem repository rooted at `cfg.data_root`.
pub struct FsDataRepo {
    root: PathBuf,
}

impl FsDataRepo {
    pub fn new(cfg: &AppCfg) -> Self {
        Self {
            root: cfg.data_root.join("datasets"),
        }
    }

    fn dataset_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

fn check_name(name: &str) -> SalesResult<()> {
    let ok = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        && !name.starts_with('.');
    if ok {
        Ok(())
    } else {
        Err(SalesError::invalid(format!("dataset name {name:?}")))
    }
}

impl DataRepo for FsDataRepo {
    fn put_dataset(&self, meta: &DatasetMeta, raw_csv: &[u8]) -> SalesResult<()> {
        check_name(&meta.name)?;
        let dir = self.dataset_dir(&meta.name);
        fs::create_dir_all(&dir)?;
        fs::write(dir.join("data.csv"), raw_csv)?;
        fs::write(dir.join("meta.json"), serde_json::to_vec_pretty(meta)?)?;
        Ok(())
    }

    fn get_dataset(&self, name: &str) -> SalesResult<Dataset> {
        check_name(name)?;
        let dir = self.dataset_dir(name);
        if !dir.join("meta.json").exists() {
            return Err(SalesError::DatasetNotFound(name.to_string()));
        }
        let meta: DatasetMeta = serde_json::from_slice(&fs::read(dir.join("meta.json"))?)?;
        let raw = fs::read(dir.join("data.csv"))?;
        let records = parse_records(raw.as_slice())?;
        Ok(Dataset { meta, records })
    }

    fn list_datasets(&self) -> SalesResult<Vec<DatasetMeta>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let meta_path = entry?.path().join("meta.json");
            if meta_path.exists() {
                out.push(serde_json::from_slice(&fs::read(meta_path)?)?);
            }
        }
        out.sort_by(|a: &DatasetMeta, b| a.name.cmp(&b.name));
        Ok(out)
    }
}
