//! Indicator trait and concrete indicator implementations.
//!
//! Indicators are pure functions: bar history in, numeric series out, one
//! value per bar. Warm-up positions (where the window exceeds the available
//! history) are `f64::NAN`; [`crate::indicator_set::IndicatorSet`] turns them
//! into `None` so no caller can mistake them for zero.

pub mod ema;
pub mod rolling;
pub mod sma;
pub mod volume;

pub use ema::Ema;
pub use rolling::{RollingExtreme, RollingSide};
pub use sma::Sma;
pub use volume::AverageVolume;

use crate::domain::PriceBar;
use std::collections::HashMap;

/// Trait for indicators.
///
/// # Look-ahead contamination guard
/// No value at bar t may depend on data from bar t+1 or later.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "sma_50", "high_252").
    fn name(&self) -> &str;

    /// Number of bars required before the first defined value.
    fn window(&self) -> usize;

    /// Compute the indicator for the entire bar series.
    ///
    /// Returns a `Vec<f64>` of the same length as `bars`, with the first
    /// `window() - 1` values set to `f64::NAN`.
    fn compute(&self, bars: &[PriceBar]) -> Vec<f64>;
}

/// Container for precomputed indicator series, queried by name and index.
#[derive(Debug, Clone, Default)]
pub struct IndicatorValues {
    series: HashMap<String, Vec<f64>>,
}

impl IndicatorValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) {
        self.series.insert(name.into(), values);
    }

    /// Defined value at `index`, or `None` for warm-up, NaN, missing name or
    /// out-of-range index.
    pub fn get(&self, name: &str, index: usize) -> Option<f64> {
        self.series
            .get(name)
            .and_then(|v| v.get(index).copied())
            .filter(|v| !v.is_nan())
    }

    pub fn get_series(&self, name: &str) -> Option<&[f64]> {
        self.series.get(name).map(|v| v.as_slice())
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// Rolling mean over an arbitrary value series. Lookback: `period - 1`.
pub(crate) fn rolling_mean(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period {
        return result;
    }

    let mut sum: f64 = values[..period].iter().sum();
    result[period - 1] = sum / period as f64;
    for i in period..n {
        sum += values[i] - values[i - period];
        result[i] = sum / period as f64;
    }
    result
}

/// Create synthetic bars from close prices for testing.
///
/// open = prev_close (or close for the first bar), high/low one point outside
/// the open/close span, volume 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<PriceBar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            PriceBar {
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indicator_values_insert_and_get() {
        let mut iv = IndicatorValues::new();
        iv.insert("sma_3", vec![f64::NAN, f64::NAN, 100.0, 101.0]);
        assert_eq!(iv.get("sma_3", 0), None);
        assert_eq!(iv.get("sma_3", 2), Some(100.0));
        assert_eq!(iv.get("sma_3", 3), Some(101.0));
        assert_eq!(iv.get("sma_3", 4), None);
        assert_eq!(iv.get("missing", 0), None);
        assert_eq!(iv.len(), 1);
    }

    #[test]
    fn rolling_mean_basic() {
        let out = rolling_mean(&[1.0, 2.0, 3.0, 4.0], 2);
        assert!(out[0].is_nan());
        assert_approx(out[1], 1.5, DEFAULT_EPSILON);
        assert_approx(out[3], 3.5, DEFAULT_EPSILON);
    }

    #[test]
    fn rolling_mean_short_input_is_undefined() {
        assert!(rolling_mean(&[1.0, 2.0], 5).iter().all(|v| v.is_nan()));
    }
}
