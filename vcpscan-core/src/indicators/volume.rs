//! Average volume over a trailing window (current bar included).

use super::{rolling_mean, Indicator};
use crate::domain::PriceBar;

#[derive(Debug, Clone)]
pub struct AverageVolume {
    period: usize,
    name: String,
}

impl AverageVolume {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "volume period must be >= 1");
        Self {
            period,
            name: format!("avg_volume_{period}"),
        }
    }
}

impl Indicator for AverageVolume {
    fn name(&self) -> &str {
        &self.name
    }

    fn window(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[PriceBar]) -> Vec<f64> {
        let volumes: Vec<f64> = bars.iter().map(|b| b.volume as f64).collect();
        rolling_mean(&volumes, self.period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn average_volume_window() {
        let mut bars = make_bars(&[1.0, 2.0, 3.0, 4.0]);
        for (i, bar) in bars.iter_mut().enumerate() {
            bar.volume = (i as u64 + 1) * 100;
        }
        let result = AverageVolume::new(2).compute(&bars);
        assert!(result[0].is_nan());
        assert_approx(result[1], 150.0, DEFAULT_EPSILON);
        assert_approx(result[3], 350.0, DEFAULT_EPSILON);
    }
}
