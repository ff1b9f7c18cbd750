//! Relative strength versus an explicit benchmark.
//!
//! For each lookback window the instrument's return is compared with the
//! benchmark's return between the same two dates. The mean excess return (in
//! percentage points) maps to a 30–95 score through a fixed step table.

use serde::{Deserialize, Serialize};

use crate::domain::{PriceBar, Series};
use crate::error::AnalysisError;

pub const RS_WINDOWS: [usize; 4] = [21, 63, 125, 252];

const SCORE_STEPS: [(f64, f64); 9] = [
    (30.0, 95.0),
    (20.0, 90.0),
    (15.0, 85.0),
    (10.0, 80.0),
    (5.0, 75.0),
    (0.0, 70.0),
    (-5.0, 60.0),
    (-10.0, 50.0),
    (-15.0, 40.0),
];
const FLOOR_SCORE: f64 = 30.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowReturn {
    pub window: usize,
    pub instrument_pct: f64,
    pub benchmark_pct: f64,
    pub excess_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelativeStrength {
    pub benchmark: String,
    pub windows: Vec<WindowReturn>,
    pub mean_excess_pct: f64,
    pub score: f64,
}

/// Map a mean excess return (percentage points) to the 30–95 score.
pub fn score_from_excess(excess_pct: f64) -> f64 {
    SCORE_STEPS
        .iter()
        .find(|(min, _)| excess_pct >= *min)
        .map(|(_, score)| *score)
        .unwrap_or(FLOOR_SCORE)
}

/// Relative strength of `bars[..=end]` against `benchmark`.
///
/// Every window must be computable on both sides with the benchmark matched
/// by date; otherwise the score is undefined.
pub fn relative_strength(
    bars: &[PriceBar],
    end: usize,
    benchmark: Option<&Series>,
) -> Result<RelativeStrength, AnalysisError> {
    let benchmark = benchmark.ok_or_else(|| AnalysisError::insufficient("benchmark", 1, 0))?;
    let available = end + 1;
    let mut windows = Vec::with_capacity(RS_WINDOWS.len());

    for window in RS_WINDOWS {
        let indicator = format!("relative_strength_{window}");
        if end < window || end >= bars.len() {
            return Err(AnalysisError::insufficient(indicator, window + 1, available));
        }
        let (from, to) = (&bars[end - window], &bars[end]);

        let (Some(b_from), Some(b_to)) = (benchmark.index_of(from.date), benchmark.index_of(to.date)) else {
            let matched = benchmark.index_of(to.date).map_or(0, |i| i + 1);
            return Err(AnalysisError::insufficient(
                format!("benchmark_{window}"),
                window + 1,
                matched,
            ));
        };
        let b_bars = benchmark.bars();

        let instrument_pct = (to.close / from.close - 1.0) * 100.0;
        let benchmark_pct = (b_bars[b_to].close / b_bars[b_from].close - 1.0) * 100.0;
        windows.push(WindowReturn {
            window,
            instrument_pct,
            benchmark_pct,
            excess_pct: instrument_pct - benchmark_pct,
        });
    }

    let mean_excess_pct = windows.iter().map(|w| w.excess_pct).sum::<f64>() / windows.len() as f64;
    Ok(RelativeStrength {
        benchmark: benchmark.symbol().to_string(),
        windows,
        mean_excess_pct,
        score: score_from_excess(mean_excess_pct),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn step_table_boundaries() {
        assert_eq!(score_from_excess(35.0), 95.0);
        assert_eq!(score_from_excess(30.0), 95.0);
        assert_eq!(score_from_excess(29.99), 90.0);
        assert_eq!(score_from_excess(15.0), 85.0);
        assert_eq!(score_from_excess(0.0), 70.0);
        assert_eq!(score_from_excess(-0.01), 60.0);
        assert_eq!(score_from_excess(-10.0), 50.0);
        assert_eq!(score_from_excess(-15.0), 40.0);
        assert_eq!(score_from_excess(-40.0), 30.0);
    }

    #[test]
    fn missing_benchmark_is_undefined() {
        let bars = make_bars(&vec![100.0; 300]);
        let err = relative_strength(&bars, 299, None).unwrap_err();
        assert!(matches!(err, AnalysisError::InsufficientHistory { ref indicator, .. } if indicator == "benchmark"));
    }

    #[test]
    fn short_history_is_undefined() {
        let bars = make_bars(&vec![100.0; 200]);
        let bench = Series::new("SPY", make_bars(&vec![100.0; 200])).unwrap();
        let err = relative_strength(&bars, 199, Some(&bench)).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::InsufficientHistory {
                indicator: "relative_strength_252".into(),
                required: 253,
                available: 200,
            }
        );
    }

    #[test]
    fn outperformance_is_scored() {
        // Instrument doubles over 252 bars while the benchmark is flat.
        let closes: Vec<f64> = (0..253).map(|i| 50.0 + 50.0 * i as f64 / 252.0).collect();
        let bars = make_bars(&closes);
        let bench = Series::new("SPY", make_bars(&vec![100.0; 253])).unwrap();
        let rs = relative_strength(&bars, 252, Some(&bench)).unwrap();

        assert_eq!(rs.windows.len(), 4);
        assert!((rs.windows[3].instrument_pct - 100.0).abs() < 1e-9);
        assert_eq!(rs.windows[3].benchmark_pct, 0.0);
        assert!(rs.mean_excess_pct > 30.0);
        assert_eq!(rs.score, 95.0);
        assert_eq!(rs.benchmark, "SPY");
    }

    #[test]
    fn benchmark_date_gap_is_undefined() {
        let bars = make_bars(&vec![100.0; 260]);
        // Benchmark starts 20 days later, so the 252-bar window has no match.
        let bench = Series::new("SPY", make_bars(&vec![100.0; 280])[20..].to_vec()).unwrap();
        let err = relative_strength(&bars, 259, Some(&bench)).unwrap_err();
        assert!(matches!(err, AnalysisError::InsufficientHistory { ref indicator, .. } if indicator == "benchmark_252"));
    }
}
