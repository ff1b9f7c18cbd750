//! Data provider traits and structured error types.
//!
//! The traits abstract over data sources (CSV directories, remote APIs,
//! in-memory fixtures) so implementations can be swapped and mocked in tests.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Series;
use crate::fundamentals::FundamentalSnapshot;

/// Structured error types returned by a [`MarketDataProvider`].
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum DataError {
    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("network error: {message}")]
    NetworkError { message: String },

    #[error("invalid data for {symbol}: {message}")]
    InvalidData { symbol: String, message: String },

    /// Rows parsed but failed [`Series::new`] validation. Converts back into
    /// [`AnalysisError::MalformedBar`](crate::error::AnalysisError::MalformedBar).
    #[error("malformed bar for {symbol} at index {index}: {reason}")]
    MalformedBar { symbol: String, index: usize, reason: String },
}

/// Source of daily OHLCV history.
///
/// Implementations return an already-validated [`Series`] (see
/// [`Series::new`]) holding at most `lookback_days` of the most recent bars.
/// Validation failures are reported as [`DataError::MalformedBar`].
pub trait MarketDataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    fn fetch(&self, symbol: &str, lookback_days: usize) -> Result<Series, DataError>;
}

/// Outcome of a fundamentals lookup. `Unavailable` is never a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FundamentalsLookup {
    Available(FundamentalSnapshot),
    Unavailable,
}

/// Optional source of fundamental data, used only as a confidence modifier.
pub trait FundamentalsProvider: Send + Sync {
    fn name(&self) -> &str;

    fn fetch_fundamentals(&self, symbol: &str) -> FundamentalsLookup;
}
