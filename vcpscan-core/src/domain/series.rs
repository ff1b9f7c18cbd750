//! Series: an ordered, validated sequence of daily bars for one symbol.

use serde::Serialize;

use super::PriceBar;
use crate::error::AnalysisError;

/// Bars for one symbol, strictly increasing by date.
///
/// The only constructor is [`Series::new`], which validates every bar, so a
/// `Series` in hand is always well-formed. It is never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    symbol: String,
    bars: Vec<PriceBar>,
}

impl Series {
    /// Validate and wrap a bar list.
    ///
    /// Rejects with `MalformedBar` an empty list, non-increasing or duplicate
    /// dates, and bars failing [`PriceBar::sanity_issue`].
    pub fn new(symbol: impl Into<String>, bars: Vec<PriceBar>) -> Result<Self, AnalysisError> {
        if bars.is_empty() {
            return Err(AnalysisError::MalformedBar {
                index: 0,
                reason: "series contains no bars".into(),
            });
        }
        for (index, bar) in bars.iter().enumerate() {
            if let Some(reason) = bar.sanity_issue() {
                return Err(AnalysisError::MalformedBar { index, reason });
            }
            if index > 0 && bar.date <= bars[index - 1].date {
                return Err(AnalysisError::MalformedBar {
                    index,
                    reason: format!(
                        "date {} does not follow {}",
                        bar.date,
                        bars[index - 1].date
                    ),
                });
            }
        }
        Ok(Self {
            symbol: symbol.into(),
            bars,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn latest(&self) -> &PriceBar {
        // Non-empty by construction.
        &self.bars[self.bars.len() - 1]
    }

    pub fn latest_index(&self) -> usize {
        self.bars.len() - 1
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// Position of `date` in the series, if present.
    pub fn index_of(&self, date: chrono::NaiveDate) -> Option<usize> {
        self.bars.binary_search_by(|b| b.date.cmp(&date)).ok()
    }

    /// Mean volume over the inclusive index range.
    pub fn mean_volume(&self, start: usize, end: usize) -> f64 {
        let window = &self.bars[start..=end];
        window.iter().map(|b| b.volume as f64).sum::<f64>() / window.len() as f64
    }

    /// Mean daily range (percent of close) over the inclusive index range.
    pub fn mean_range_pct(&self, start: usize, end: usize) -> f64 {
        let window = &self.bars[start..=end];
        window.iter().map(|b| b.range_pct()).sum::<f64>() / window.len() as f64
    }

    /// Keep only the most recent `n` bars.
    pub fn tail(&self, n: usize) -> Series {
        let start = self.bars.len().saturating_sub(n.max(1));
        Series {
            symbol: self.symbol.clone(),
            bars: self.bars[start..].to_vec(),
        }
    }
}
