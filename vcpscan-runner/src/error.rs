//! Runner error type.

use std::path::PathBuf;

use thiserror::Error;
use vcpscan_core::{AnalysisError, ConfigError};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("engine config: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to parse scan config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid scan config: {0}")]
    Invalid(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error on {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("benchmark {symbol} unavailable: {source}")]
    Benchmark {
        symbol: String,
        #[source]
        source: AnalysisError,
    },

    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

impl ScanError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ScanError::Io {
            path: path.into(),
            source,
        }
    }
}
