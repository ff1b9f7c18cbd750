//! Precomputed indicator view over a [`Series`].
//!
//! Holds the fixed trend-template indicator set keyed by bar index. A value
//! whose window exceeds the available history is undefined (`None`), never
//! zero.

use tracing::debug;

use crate::domain::Series;
use crate::error::AnalysisError;
use crate::indicators::{AverageVolume, Ema, Indicator, IndicatorValues, RollingExtreme, Sma};

pub const SMA_50: &str = "sma_50";
pub const SMA_150: &str = "sma_150";
pub const SMA_200: &str = "sma_200";
pub const EMA_10: &str = "ema_10";
pub const EMA_21: &str = "ema_21";
pub const HIGH_252: &str = "high_252";
pub const LOW_252: &str = "low_252";
pub const AVG_VOLUME_20: &str = "avg_volume_20";
pub const AVG_VOLUME_50: &str = "avg_volume_50";

fn standard_indicators() -> Vec<Box<dyn Indicator>> {
    vec![
        Box::new(Sma::new(50)),
        Box::new(Sma::new(150)),
        Box::new(Sma::new(200)),
        Box::new(Ema::new(10)),
        Box::new(Ema::new(21)),
        Box::new(RollingExtreme::high(252)),
        Box::new(RollingExtreme::low(252)),
        Box::new(AverageVolume::new(20)),
        Box::new(AverageVolume::new(50)),
    ]
}

#[derive(Debug, Clone)]
pub struct IndicatorSet {
    values: IndicatorValues,
    windows: Vec<(String, usize)>,
    len: usize,
}

impl IndicatorSet {
    pub fn build(series: &Series) -> Self {
        let bars = series.bars();
        let mut values = IndicatorValues::new();
        let mut windows = Vec::new();

        for indicator in standard_indicators() {
            values.insert(indicator.name(), indicator.compute(bars));
            windows.push((indicator.name().to_string(), indicator.window()));
        }

        let set = Self {
            values,
            windows,
            len: bars.len(),
        };
        let missing = set.insufficient_history();
        if !missing.is_empty() {
            debug!(
                symbol = series.symbol(),
                bars = set.len,
                undefined = missing.len(),
                "indicators undefined at latest bar"
            );
        }
        set
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn latest_index(&self) -> usize {
        self.len.saturating_sub(1)
    }

    /// Value of `name` at `index`, `None` when undefined.
    pub fn get(&self, name: &str, index: usize) -> Option<f64> {
        self.values.get(name, index)
    }

    /// Like [`get`](Self::get) but reports why the value is missing.
    pub fn require(&self, name: &str, index: usize) -> Result<f64, AnalysisError> {
        self.get(name, index).ok_or_else(|| {
            let required = self.window(name).unwrap_or(usize::MAX);
            AnalysisError::insufficient(name, required, index.saturating_add(1).min(self.len))
        })
    }

    pub fn window(&self, name: &str) -> Option<usize> {
        self.windows.iter().find(|(n, _)| n == name).map(|(_, w)| *w)
    }

    pub fn sma_50(&self, index: usize) -> Option<f64> {
        self.get(SMA_50, index)
    }

    pub fn sma_150(&self, index: usize) -> Option<f64> {
        self.get(SMA_150, index)
    }

    pub fn sma_200(&self, index: usize) -> Option<f64> {
        self.get(SMA_200, index)
    }

    pub fn ema_10(&self, index: usize) -> Option<f64> {
        self.get(EMA_10, index)
    }

    pub fn ema_21(&self, index: usize) -> Option<f64> {
        self.get(EMA_21, index)
    }

    pub fn high_252(&self, index: usize) -> Option<f64> {
        self.get(HIGH_252, index)
    }

    pub fn low_252(&self, index: usize) -> Option<f64> {
        self.get(LOW_252, index)
    }

    pub fn avg_volume_20(&self, index: usize) -> Option<f64> {
        self.get(AVG_VOLUME_20, index)
    }

    pub fn avg_volume_50(&self, index: usize) -> Option<f64> {
        self.get(AVG_VOLUME_50, index)
    }

    /// Every indicator undefined at the latest bar.
    pub fn insufficient_history(&self) -> Vec<AnalysisError> {
        let latest = self.latest_index();
        self.windows
            .iter()
            .filter(|(name, _)| self.get(name, latest).is_none())
            .map(|(name, window)| AnalysisError::insufficient(name.as_str(), *window, self.len))
            .collect()
    }
}
