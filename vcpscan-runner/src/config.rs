//! Scan configuration loaded from TOML.
//!
//! ```toml
//! symbols = ["AAPL", "NVDA"]
//! benchmark = "SPY"
//! data_dir = "data"
//! lookback_days = 400
//!
//! [engine.risk]
//! portfolio_value = 250000.0
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use vcpscan_core::EngineConfig;

use crate::error::ScanError;

pub const DEFAULT_LOOKBACK_DAYS: usize = 400;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub symbols: Vec<String>,
    /// Benchmark symbol for relative strength, loaded from the same data
    /// directory. Without it RS is undefined and no symbol can qualify.
    pub benchmark: Option<String>,
    /// Directory holding one `<SYMBOL>.csv` per symbol.
    pub data_dir: PathBuf,
    /// JSON object keyed by symbol.
    pub fundamentals_file: Option<PathBuf>,
    pub lookback_days: usize,
    pub parallel: bool,
    pub engine: EngineConfig,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            symbols: Vec::new(),
            benchmark: None,
            data_dir: PathBuf::from("data"),
            fundamentals_file: None,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            parallel: true,
            engine: EngineConfig::default(),
        }
    }
}

impl ScanConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ScanError> {
        let config: ScanConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ScanError> {
        let text = std::fs::read_to_string(path).map_err(|e| ScanError::io(path, e))?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ScanError> {
        if self.lookback_days == 0 {
            return Err(ScanError::Invalid("lookback_days must be at least 1".into()));
        }
        if let Some(blank) = self.symbols.iter().find(|s| s.trim().is_empty()) {
            return Err(ScanError::Invalid(format!("blank symbol {blank:?}")));
        }
        self.engine.validate()?;
        Ok(())
    }

    /// Symbols upper-cased and de-duplicated, first occurrence wins.
    pub fn normalized_symbols(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::with_capacity(self.symbols.len());
        for s in &self.symbols {
            let s = s.trim().to_uppercase();
            if !out.contains(&s) {
                out.push(s);
            }
        }
        out
    }
}
