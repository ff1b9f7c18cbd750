//! Pivot resolution and breakout confirmation.
//!
//! The pivot is the high of the final contraction's starting swing. Only a
//! valid base resolves one; without it breakout validation reports `NoBase`
//! and evaluates nothing.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::base::BaseAssessment;
use crate::config::BreakoutConfig;
use crate::domain::Series;
use crate::error::AnalysisError;
use crate::indicator_set::{IndicatorSet, AVG_VOLUME_50};

pub const BREAKOUT_CHECKS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pivot {
    pub price: f64,
    pub date: NaiveDate,
    pub index: usize,
}

/// Resolve the breakout pivot from a base assessment.
pub fn resolve_pivot(base: &BaseAssessment) -> Result<Pivot, AnalysisError> {
    match &base.base {
        Some(formation) => Ok(Pivot {
            price: formation.pivot_price,
            date: formation.pivot_date,
            index: formation.pivot_index,
        }),
        None => Err(base
            .failure
            .clone()
            .unwrap_or(AnalysisError::NoBaseFormation { contractions_found: 0 })),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakoutCheck {
    CloseAbovePivot,
    CloseNearHigh,
    LowHoldsPivot,
    VolumeSurge,
    VolumeAccelerating,
    TightPriorAction,
    NoWideRangeDownDays,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakoutCheckResult {
    pub check: BreakoutCheck,
    pub passed: bool,
    pub observed: Option<f64>,
    pub threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<AnalysisError>,
}

impl BreakoutCheckResult {
    fn new(check: BreakoutCheck, passed: bool, observed: f64, threshold: f64) -> Self {
        Self {
            check,
            passed,
            observed: Some(observed),
            threshold: Some(threshold),
            reason: None,
        }
    }

    fn undefined(check: BreakoutCheck, reason: AnalysisError) -> Self {
        Self {
            check,
            passed: false,
            observed: None,
            threshold: None,
            reason: Some(reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakoutReport {
    pub pivot: Pivot,
    pub checks: Vec<BreakoutCheckResult>,
    pub pass_count: usize,
    pub total: usize,
    pub confirmed: bool,
}

impl BreakoutReport {
    pub fn failed(&self) -> impl Iterator<Item = BreakoutCheck> + '_ {
        self.checks.iter().filter(|c| !c.passed).map(|c| c.check)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BreakoutAssessment {
    /// No valid base, so there is no pivot to break out of.
    NoBase { reason: AnalysisError },
    Evaluated(BreakoutReport),
}

impl BreakoutAssessment {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, BreakoutAssessment::Evaluated(r) if r.confirmed)
    }

    /// Pass ratio scaled to 0–100; zero without a base.
    pub fn score(&self) -> f64 {
        match self {
            BreakoutAssessment::NoBase { .. } => 0.0,
            BreakoutAssessment::Evaluated(r) => r.pass_count as f64 / r.total as f64 * 100.0,
        }
    }

    pub fn report(&self) -> Option<&BreakoutReport> {
        match self {
            BreakoutAssessment::Evaluated(r) => Some(r),
            BreakoutAssessment::NoBase { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BreakoutValidator {
    config: BreakoutConfig,
}

impl BreakoutValidator {
    pub fn new(config: BreakoutConfig) -> Self {
        Self { config }
    }

    pub fn assess(&self, series: &Series, indicators: &IndicatorSet, base: &BaseAssessment) -> BreakoutAssessment {
        let pivot = match resolve_pivot(base) {
            Ok(pivot) => pivot,
            Err(reason) => return BreakoutAssessment::NoBase { reason },
        };
        let base_range_pct = base.base.as_ref().map_or(0.0, |b| b.avg_range_pct);
        BreakoutAssessment::Evaluated(self.validate(series, indicators, pivot, base_range_pct))
    }

    /// Evaluate the seven checks on the latest bar against `pivot`.
    /// `base_range_pct` is the base's mean daily range in percent.
    pub fn validate(
        &self,
        series: &Series,
        indicators: &IndicatorSet,
        pivot: Pivot,
        base_range_pct: f64,
    ) -> BreakoutReport {
        let cfg = &self.config;
        let bars = series.bars();
        let t = series.latest_index();
        let bar = series.latest();
        let volume = bar.volume as f64;
        let mut checks = Vec::with_capacity(BREAKOUT_CHECKS);

        checks.push(BreakoutCheckResult::new(
            BreakoutCheck::CloseAbovePivot,
            bar.close > pivot.price,
            bar.close,
            pivot.price,
        ));

        let near_high = cfg.close_near_high_ratio * bar.high;
        checks.push(BreakoutCheckResult::new(
            BreakoutCheck::CloseNearHigh,
            bar.close >= near_high,
            bar.close,
            near_high,
        ));

        let low_floor = cfg.low_hold_ratio * pivot.price;
        checks.push(BreakoutCheckResult::new(
            BreakoutCheck::LowHoldsPivot,
            bar.low >= low_floor,
            bar.low,
            low_floor,
        ));

        let prior_avg = t
            .checked_sub(1)
            .ok_or_else(|| AnalysisError::insufficient(AVG_VOLUME_50, 51, t + 1))
            .and_then(|prev| indicators.require(AVG_VOLUME_50, prev));
        checks.push(match prior_avg {
            Ok(avg) if avg > 0.0 => {
                let ratio = volume / avg;
                BreakoutCheckResult::new(
                    BreakoutCheck::VolumeSurge,
                    ratio >= cfg.volume_surge_ratio,
                    ratio,
                    cfg.volume_surge_ratio,
                )
            }
            Ok(_) => BreakoutCheckResult::new(BreakoutCheck::VolumeSurge, false, 0.0, cfg.volume_surge_ratio),
            Err(e) => BreakoutCheckResult::undefined(BreakoutCheck::VolumeSurge, e),
        });

        let n = cfg.recent_volume_bars;
        checks.push(if t >= n {
            let recent = series.mean_volume(t - n, t - 1);
            BreakoutCheckResult::new(BreakoutCheck::VolumeAccelerating, volume > recent, volume, recent)
        } else {
            BreakoutCheckResult::undefined(
                BreakoutCheck::VolumeAccelerating,
                AnalysisError::insufficient("recent_volume", n + 1, t + 1),
            )
        });

        let w = cfg.tight_window_bars;
        checks.push(if t >= w {
            let window_range = series.mean_range_pct(t - w, t - 1);
            let limit = cfg.tightness_ratio * base_range_pct;
            BreakoutCheckResult::new(BreakoutCheck::TightPriorAction, window_range < limit, window_range, limit)
        } else {
            BreakoutCheckResult::undefined(
                BreakoutCheck::TightPriorAction,
                AnalysisError::insufficient("tight_window", w + 1, t + 1),
            )
        });

        let m = cfg.range_average_bars;
        checks.push(if t >= w + m {
            let wide_down = (t - w..t)
                .filter(|&j| {
                    let avg_range = bars[j - m..j].iter().map(|b| b.range()).sum::<f64>() / m as f64;
                    bars[j].range() > cfg.wide_range_ratio * avg_range && bars[j].close < bars[j - 1].close
                })
                .count();
            BreakoutCheckResult::new(BreakoutCheck::NoWideRangeDownDays, wide_down == 0, wide_down as f64, 0.0)
        } else {
            BreakoutCheckResult::undefined(
                BreakoutCheck::NoWideRangeDownDays,
                AnalysisError::insufficient("range_average", w + m + 1, t + 1),
            )
        });

        let pass_count = checks.iter().filter(|c| c.passed).count();
        let confirmed = pass_count == BREAKOUT_CHECKS;
        debug!(
            symbol = series.symbol(),
            pivot = pivot.price,
            pass_count,
            confirmed,
            "breakout evaluated"
        );

        BreakoutReport {
            pivot,
            checks,
            pass_count,
            total: BREAKOUT_CHECKS,
            confirmed,
        }
    }
}
