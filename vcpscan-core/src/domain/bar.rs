//! PriceBar: the fundamental market data unit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily OHLCV bar. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl PriceBar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: u64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// High minus low.
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Daily range as a percentage of the close.
    pub fn range_pct(&self) -> f64 {
        self.range() / self.close * 100.0
    }

    /// Describes the first OHLC inconsistency found, if any.
    ///
    /// Prices must be finite and positive; high must bound open/close/low
    /// from above and low must bound them from below.
    pub fn sanity_issue(&self) -> Option<String> {
        let prices = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ];
        for (name, value) in prices {
            if !value.is_finite() {
                return Some(format!("{name} is not finite"));
            }
            if value <= 0.0 {
                return Some(format!("{name} must be positive, got {value}"));
            }
        }
        if self.high < self.low {
            return Some(format!("high {} below low {}", self.high, self.low));
        }
        if self.high < self.open.max(self.close) {
            return Some(format!("high {} below open/close", self.high));
        }
        if self.low > self.open.min(self.close) {
            return Some(format!("low {} above open/close", self.low));
        }
        None
    }

    pub fn is_sane(&self) -> bool {
        self.sanity_issue().is_none()
    }
}
