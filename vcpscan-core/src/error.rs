//! Error kinds for the analysis engine.
//!
//! `DataFetchFailure` and `MalformedBar` abort an analysis and are surfaced
//! verbatim to the caller. `InsufficientHistory`, `NoBaseFormation` and
//! `NoPivot` are recovered locally: the affected component carries the error
//! as its failure reason. Components that could not be evaluated at all score
//! zero; a rejected base candidate keeps its weighted rule pass ratio.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::DataError;

#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisError {
    #[error("insufficient history for {indicator}: need {required} bars, have {available}")]
    InsufficientHistory {
        indicator: String,
        required: usize,
        available: usize,
    },

    #[error("no valid base formation among {contractions_found} candidate contraction(s)")]
    NoBaseFormation { contractions_found: usize },

    /// A valid base is required to resolve a pivot.
    #[error("no pivot: no valid base to resolve it from")]
    NoPivot,

    #[error("data fetch failed: {0}")]
    DataFetchFailure(DataError),

    #[error("malformed bar at index {index}: {reason}")]
    MalformedBar { index: usize, reason: String },
}

impl AnalysisError {
    /// Whether this error aborts the whole analysis instead of failing a
    /// single component.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AnalysisError::DataFetchFailure(_) | AnalysisError::MalformedBar { .. }
        )
    }

    pub(crate) fn insufficient(indicator: impl Into<String>, required: usize, available: usize) -> Self {
        AnalysisError::InsufficientHistory {
            indicator: indicator.into(),
            required,
            available,
        }
    }
}

impl From<DataError> for AnalysisError {
    /// Provider errors become `DataFetchFailure`, except bars the provider
    /// rejected during validation, which stay `MalformedBar`.
    fn from(err: DataError) -> Self {
        match err {
            DataError::MalformedBar { index, reason, .. } => AnalysisError::MalformedBar { index, reason },
            other => AnalysisError::DataFetchFailure(other),
        }
    }
}
