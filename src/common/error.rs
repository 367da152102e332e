//! Error handling primitives shared across the core.

use thiserror::Error;

/// Stable error codes that cross the FFI boundary.
#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorCode {
    /// Success code used as a sentinel.
    Ok = 0,
    /// Input failed validation (bad JSON, bad CSV row, missing column).
    InvalidInput = 1,
    /// Requested dataset was never ingested.
    DatasetMissing = 2,
    /// Requested model artefact was not available in the registry.
    ModelMissing = 3,
    /// Storage or serialization failure.
    Io = 4,
    /// Catch-all for bugs and unexpected states.
    Internal = 5,
}

/// Canonical error type for the core.
#[derive(Debug, Error)]
pub enum SalesError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("missing column: {0}")]
    MissingColumn(String),

    #[error("dataset not found: {0}")]
    DatasetNotFound(String),

    #[error("model not found: {name} (version {version})")]
    ModelNotFound { name: String, version: String },

    #[error("tracking error: {0}")]
    Tracking(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Result alias used throughout the crate.
pub type SalesResult<T> = Result<T, SalesError>;

impl SalesError {
    /// Validation helper.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn missing_column(column: impl Into<String>) -> Self {
        Self::MissingColumn(column.into())
    }

    /// Model missing helper. `None` means "latest".
    pub fn model_missing(name: impl Into<String>, version: Option<u32>) -> Self {
        Self::ModelNotFound {
            name: name.into(),
            version: version.map_or_else(|| "latest".to_string(), |v| v.to_string()),
        }
    }

    pub fn tracking(msg: impl Into<String>) -> Self {
        Self::Tracking(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Map the error to the code exposed over the C ABI.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidInput(_) | Self::MissingColumn(_) | Self::Csv(_) | Self::Json(_) => {
                ErrorCode::InvalidInput
            }
            Self::DatasetNotFound(_) => ErrorCode::DatasetMissing,
            Self::ModelNotFound { .. } => ErrorCode::ModelMissing,
            Self::Io(_) | Self::Tracking(_) => ErrorCode::Io,
            Self::Internal(_) => ErrorCode::Internal,
        }
    }
}
