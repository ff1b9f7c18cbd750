//! File-backed data providers.
//!
//! [`CsvProvider`] reads `<data_dir>/<SYMBOL>.csv` with columns
//! `date,open,high,low,close,volume`. [`JsonFundamentalsProvider`] reads one
//! JSON object keyed by symbol. Neither ever substitutes generated data: a
//! missing or malformed file is an error for that symbol.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use vcpscan_core::data::{DataError, FundamentalsLookup, FundamentalsProvider, MarketDataProvider};
use vcpscan_core::domain::{PriceBar, Series};
use vcpscan_core::error::AnalysisError;
use vcpscan_core::fundamentals::FundamentalSnapshot;

use crate::error::ScanError;

/// One CSV row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct CsvBar {
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: u64,
}

impl From<CsvBar> for PriceBar {
    fn from(r: CsvBar) -> Self {
        PriceBar::new(r.date, r.open, r.high, r.low, r.close, r.volume)
    }
}

impl From<&PriceBar> for CsvBar {
    fn from(b: &PriceBar) -> Self {
        Self {
            date: b.date,
            open: b.open,
            high: b.high,
            low: b.low,
            close: b.close,
            volume: b.volume,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CsvProvider {
    dir: PathBuf,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.csv"))
    }

    /// Read every bar for `symbol` in file order.
    pub fn read_bars(&self, symbol: &str) -> Result<Vec<PriceBar>, DataError> {
        let path = self.path_for(symbol);
        let mut reader = match csv::Reader::from_path(&path) {
            Ok(r) => r,
            Err(e) => {
                return Err(match e.kind() {
                    csv::ErrorKind::Io(err) if err.kind() == io::ErrorKind::NotFound => DataError::SymbolNotFound {
                        symbol: symbol.to_string(),
                    },
                    _ => DataError::NetworkError {
                        message: format!("{}: {e}", path.display()),
                    },
                })
            }
        };

        reader
            .deserialize::<CsvBar>()
            .enumerate()
            .map(|(row, record)| {
                record.map(PriceBar::from).map_err(|e| DataError::InvalidData {
                    symbol: symbol.to_string(),
                    message: format!("row {}: {e}", row + 1),
                })
            })
            .collect()
    }
}

impl MarketDataProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch(&self, symbol: &str, lookback_days: usize) -> Result<Series, DataError> {
        let bars = self.read_bars(symbol)?;
        let total = bars.len();
        let series = Series::new(symbol, bars).map_err(|e| match e {
            AnalysisError::MalformedBar { index, reason } => DataError::MalformedBar {
                symbol: symbol.to_string(),
                index,
                reason,
            },
            other => DataError::InvalidData {
                symbol: symbol.to_string(),
                message: other.to_string(),
            },
        })?;
        debug!(symbol, total, lookback_days, "loaded bars");
        Ok(series.tail(lookback_days))
    }
}

/// Write bars in the format [`CsvProvider`] reads.
pub fn write_bars_csv(path: &Path, bars: &[PriceBar]) -> Result<(), ScanError> {
    let csv_err = |source| ScanError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    for bar in bars {
        writer.serialize(CsvBar::from(bar)).map_err(csv_err)?;
    }
    writer.flush().map_err(|e| ScanError::io(path, e))
}

/// Fundamentals keyed by symbol, loaded once from a JSON file.
#[derive(Debug, Clone, Default)]
pub struct JsonFundamentalsProvider {
    snapshots: HashMap<String, FundamentalSnapshot>,
}

impl JsonFundamentalsProvider {
    pub fn new(snapshots: HashMap<String, FundamentalSnapshot>) -> Self {
        let snapshots = snapshots.into_iter().map(|(k, v)| (k.to_uppercase(), v)).collect();
        Self { snapshots }
    }

    pub fn from_json_str(s: &str) -> Result<Self, ScanError> {
        Ok(Self::new(serde_json::from_str(s)?))
    }

    pub fn from_file(path: &Path) -> Result<Self, ScanError> {
        let text = std::fs::read_to_string(path).map_err(|e| ScanError::io(path, e))?;
        Self::from_json_str(&text)
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

impl FundamentalsProvider for JsonFundamentalsProvider {
    fn name(&self) -> &str {
        "json"
    }

    fn fetch_fundamentals(&self, symbol: &str) -> FundamentalsLookup {
        match self.snapshots.get(&symbol.to_uppercase()) {
            Some(snapshot) => FundamentalsLookup::Available(snapshot.clone()),
            None => {
                warn!(symbol, "no fundamentals on file");
                FundamentalsLookup::Unavailable
            }
        }
    }
}
