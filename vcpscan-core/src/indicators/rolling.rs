//! Rolling extreme: highest high / lowest low over a trailing window.
//!
//! Used for the 52-week (252-bar) high and low. Window includes the current
//! bar; first defined value at index `period - 1`.

use super::Indicator;
use crate::domain::PriceBar;

/// Which extreme to track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollingSide {
    High,
    Low,
}

#[derive(Debug, Clone)]
pub struct RollingExtreme {
    period: usize,
    side: RollingSide,
    name: String,
}

impl RollingExtreme {
    pub fn high(period: usize) -> Self {
        assert!(period >= 1, "rolling period must be >= 1");
        Self {
            period,
            side: RollingSide::High,
            name: format!("high_{period}"),
        }
    }

    pub fn low(period: usize) -> Self {
        assert!(period >= 1, "rolling period must be >= 1");
        Self {
            period,
            side: RollingSide::Low,
            name: format!("low_{period}"),
        }
    }
}

impl Indicator for RollingExtreme {
    fn name(&self) -> &str {
        &self.name
    }

    fn window(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[PriceBar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];

        if n < self.period {
            return result;
        }

        for i in (self.period - 1)..n {
            let window = &bars[i + 1 - self.period..=i];
            result[i] = match self.side {
                RollingSide::High => window.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max),
                RollingSide::Low => window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min),
            };
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};
    use chrono::NaiveDate;

    fn make_ohlc_bars(data: &[(f64, f64, f64, f64)]) -> Vec<PriceBar> {
        let base_date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        data.iter()
            .enumerate()
            .map(|(i, &(open, high, low, close))| PriceBar {
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high,
                low,
                close,
                volume: 1000,
            })
            .collect()
    }

    fn sample() -> Vec<PriceBar> {
        make_ohlc_bars(&[
            (10.0, 12.0, 9.0, 11.0),
            (11.0, 15.0, 10.0, 14.0),
            (14.0, 14.0, 13.0, 13.5),
            (13.5, 16.0, 12.0, 15.0),
            (15.0, 15.5, 14.0, 14.5),
        ])
    }

    #[test]
    fn rolling_high_3() {
        let result = RollingExtreme::high(3).compute(&sample());
        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        assert_approx(result[2], 15.0, DEFAULT_EPSILON);
        assert_approx(result[3], 16.0, DEFAULT_EPSILON);
        assert_approx(result[4], 16.0, DEFAULT_EPSILON);
    }

    #[test]
    fn rolling_low_3() {
        let result = RollingExtreme::low(3).compute(&sample());
        assert_approx(result[2], 9.0, DEFAULT_EPSILON);
        assert_approx(result[3], 10.0, DEFAULT_EPSILON);
        assert_approx(result[4], 12.0, DEFAULT_EPSILON);
    }

    #[test]
    fn rolling_names() {
        assert_eq!(RollingExtreme::high(252).name(), "high_252");
        assert_eq!(RollingExtreme::low(252).name(), "low_252");
    }
}
