//! Runtime configuration loaded from environment and an optional JSON file.
//!
//! Precedence, lowest first: built-in defaults, the JSON file named by
//! `BOOKSALES_CONFIG`, then individual `BOOKSALES_*` variables.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::common::error::{SalesError, SalesResult};

pub const DEFAULT_EXPERIMENT: &str = "livraria-vendas-prediction";
pub const DEFAULT_DATASET: &str = "vendas_livros";
pub const DEFAULT_MODEL_NAME: &str = "livraria-vendas-model";

/// Snapshot of configuration values consumed by the core.
#[derive(Clone, Debug, PartialEq)]
pub struct AppCfg {
    pub data_root: PathBuf,
    pub experiment: String,
    pub dataset: String,
    pub model_name: String,
    pub log_level: String,
    pub log_json: bool,
}

/// File overlay; every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CfgFile {
    data_root: Option<PathBuf>,
    experiment: Option<String>,
    dataset: Option<String>,
    model_name: Option<String>,
    log_level: Option<String>,
    log_json: Option<bool>,
}

impl Default for AppCfg {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("./data"),
            experiment: DEFAULT_EXPERIMENT.to_string(),
            dataset: DEFAULT_DATASET.to_string(),
            model_name: DEFAULT_MODEL_NAME.to_string(),
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

impl AppCfg {
    /// Create a configuration snapshot from the process environment.
    pub fn load() -> SalesResult<Self> {
        Self::load_from(|key| env::var(key).ok())
    }

    /// Same as [`AppCfg::load`] but with an injectable variable lookup.
    pub fn load_from<F>(lookup: F) -> SalesResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(path) = lookup("BOOKSALES_CONFIG") {
            cfg.apply_file(Path::new(&path))?;
        }

        if let Some(v) = lookup("BOOKSALES_DATA_ROOT") {
            cfg.data_root = PathBuf::from(v);
        }
        if let Some(v) = lookup("BOOKSALES_EXPERIMENT") {
            cfg.experiment = v;
        }
        if let Some(v) = lookup("BOOKSALES_DATASET") {
            cfg.dataset = v;
        }
        if let Some(v) = lookup("BOOKSALES_MODEL_NAME") {
            cfg.model_name = v;
        }
        if let Some(v) = lookup("BOOKSALES_LOG") {
            cfg.log_level = v;
        }
        if let Some(v) = lookup("BOOKSALES_LOG_JSON") {
            cfg.log_json = parse_flag(&v)
                .ok_or_else(|| SalesError::invalid(format!("BOOKSALES_LOG_JSON={v}")))?;
        }

        Ok(cfg)
    }

    /// Convenience constructor for tests and tools that only care about the root.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            data_root: root.into(),
            ..Self::default()
        }
    }

    fn apply_file(&mut self, path: &Path) -> SalesResult<()> {
        let raw = fs::read_to_string(path)?;
        let file: CfgFile = serde_json::from_str(&raw)?;

        if let Some(v) = file.data_root {
            self.data_root = v;
        }
        if let Some(v) = file.experiment {
            self.experiment = v;
        }
        if let Some(v) = file.dataset {
            self.dataset = v;
        }
        if let Some(v) = file.model_name {
            self.model_name = v;
        }
        if let Some(v) = file.log_level {
            self.log_level = v;
        }
        if let Some(v) = file.log_json {
            self.log_json = v;
        }
        Ok(())
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let cfg = AppCfg::load_from(lookup(&[])).unwrap();
        assert_eq!(cfg, AppCfg::default());
        assert_eq!(cfg.model_name, "livraria-vendas-model");
        assert_eq!(cfg.dataset, "vendas_livros");
    }

    #[test]
    fn env_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        fs::write(
            &path,
            r#"{"data_root": "/srv/booksales", "experiment": "from-file", "log_json": true}"#,
        )
        .unwrap();

        let cfg = AppCfg::load_from(lookup(&[
            ("BOOKSALES_CONFIG", path.to_str().unwrap()),
            ("BOOKSALES_EXPERIMENT", "from-env"),
        ]))
        .unwrap();

        assert_eq!(cfg.data_root, PathBuf::from("/srv/booksales"));
        assert_eq!(cfg.experiment, "from-env");
        assert!(cfg.log_json);
    }

    #[test]
    fn unknown_file_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        fs::write(&path, r#"{"region": "eu"}"#).unwrap();

        let err = AppCfg::load_from(lookup(&[("BOOKSALES_CONFIG", path.to_str().unwrap())]))
            .unwrap_err();
        assert!(matches!(err, SalesError::Json(_)));
    }

    #[test]
    fn bad_flag_is_invalid_input() {
        let err = AppCfg::load_from(lookup(&[("BOOKSALES_LOG_JSON", "maybe")])).unwrap_err();
        assert!(matches!(err, SalesError::InvalidInput(_)));
    }
}
