//! Contraction and base (VCP) detection.
//!
//! Swing highs are paired with the following swing low to form contractions.
//! The candidate base starts at the contraction with the highest starting
//! high inside the search window and runs through the latest contraction.
//! Each validation rule reports its observed value, threshold and shortfall.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::BaseConfig;
use crate::domain::Series;
use crate::error::AnalysisError;
use crate::indicator_set::IndicatorSet;
use crate::swing::{SwingKind, SwingPoint};

/// Bars per week used to express base duration in weeks.
const BARS_PER_WEEK: f64 = 5.0;

/// One pullback inside a base: a swing high and the swing low that follows it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contraction {
    pub start: SwingPoint,
    pub end: SwingPoint,
    /// Decline from the starting high to the ending low, in percent.
    pub pct_decline: f64,
    pub duration_bars: usize,
    pub avg_volume_during: f64,
}

/// A validated base. Only produced when every rule passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseFormation {
    pub contractions: Vec<Contraction>,
    pub duration_bars: usize,
    pub duration_weeks: f64,
    pub pivot_price: f64,
    pub pivot_date: NaiveDate,
    pub pivot_index: usize,
    /// Mean daily range (percent of close) across the base.
    pub avg_range_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseRule {
    ContractionCount,
    ProgressiveTightening,
    VolumeDryUp,
    FinalContractionTight,
    FinalContractionQuiet,
    Duration,
    PivotProximity,
}

impl BaseRule {
    pub fn weight(self) -> f64 {
        match self {
            BaseRule::FinalContractionTight => 2.0,
            _ => 1.0,
        }
    }
}

/// Total rule weight; tightness counts double.
pub const BASE_RULE_WEIGHT: f64 = 8.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseRuleResult {
    pub rule: BaseRule,
    pub passed: bool,
    pub observed: Option<f64>,
    pub threshold: Option<f64>,
    /// How far the observed value missed the threshold (0 when passed).
    pub shortfall: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<AnalysisError>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseAssessment {
    /// Contractions of the candidate base, valid or not.
    pub contractions: Vec<Contraction>,
    pub rules: Vec<BaseRuleResult>,
    /// Weighted pass ratio, 0–100.
    pub score: f64,
    pub base: Option<BaseFormation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<AnalysisError>,
}

impl BaseAssessment {
    pub fn is_valid(&self) -> bool {
        self.base.is_some()
    }

    pub fn failed_rules(&self) -> impl Iterator<Item = &BaseRuleResult> {
        self.rules.iter().filter(|r| !r.passed)
    }
}

/// Pair every swing HIGH with the swing LOW that immediately follows it.
pub fn contractions_from_swings(series: &Series, swings: &[SwingPoint]) -> Vec<Contraction> {
    swings
        .windows(2)
        .filter(|w| w[0].kind == SwingKind::High && w[1].kind == SwingKind::Low)
        .map(|w| {
            let (start, end) = (w[0], w[1]);
            Contraction {
                start,
                end,
                pct_decline: (start.price - end.price) / start.price * 100.0,
                duration_bars: end.index - start.index,
                avg_volume_during: series.mean_volume(start.index, end.index),
            }
        })
        .collect()
}

/// Pairs swings into contractions, selects the candidate base and validates it
/// against [`BaseConfig`].
#[derive(Debug, Clone)]
pub struct BaseDetector {
    config: BaseConfig,
}

impl BaseDetector {
    pub fn new(config: BaseConfig) -> Self {
        Self { config }
    }

    /// Select the candidate base: the anchor contraction and all later ones.
    pub fn candidate(&self, series: &Series, contractions: &[Contraction]) -> Vec<Contraction> {
        let earliest = series.len().saturating_sub(self.config.search_window_bars);
        let mut anchor: Option<usize> = None;
        for (pos, c) in contractions.iter().enumerate() {
            if c.start.index < earliest {
                continue;
            }
            match anchor {
                Some(a) if contractions[a].start.price >= c.start.price => {}
                _ => anchor = Some(pos),
            }
        }
        anchor.map(|a| contractions[a..].to_vec()).unwrap_or_default()
    }

    pub fn detect(&self, series: &Series, swings: &[SwingPoint], indicators: &IndicatorSet) -> BaseAssessment {
        let all = contractions_from_swings(series, swings);
        let contractions = self.candidate(series, &all);

        if contractions.len() < self.config.min_contractions {
            let found = contractions.len();
            debug!(symbol = series.symbol(), contractions = found, "no base formation");
            return BaseAssessment {
                contractions,
                rules: Vec::new(),
                score: 0.0,
                base: None,
                failure: Some(AnalysisError::NoBaseFormation {
                    contractions_found: found,
                }),
            };
        }

        let rules = self.evaluate(series, &contractions, indicators);
        let passed_weight: f64 = rules.iter().filter(|r| r.passed).map(|r| r.rule.weight()).sum();
        let score = passed_weight / BASE_RULE_WEIGHT * 100.0;
        let failed = rules.iter().filter(|r| !r.passed).count();

        if failed > 0 {
            debug!(
                symbol = series.symbol(),
                failed,
                score,
                "base candidate rejected"
            );
            let found = contractions.len();
            return BaseAssessment {
                contractions,
                rules,
                score,
                base: None,
                failure: Some(AnalysisError::NoBaseFormation {
                    contractions_found: found,
                }),
            };
        }

        let first = &contractions[0];
        let last = &contractions[contractions.len() - 1];
        let duration_bars = last.end.index - first.start.index;
        let base = BaseFormation {
            duration_bars,
            duration_weeks: duration_bars as f64 / BARS_PER_WEEK,
            pivot_price: last.start.price,
            pivot_date: last.start.date,
            pivot_index: last.start.index,
            avg_range_pct: series.mean_range_pct(first.start.index, last.end.index),
            contractions: contractions.clone(),
        };
        debug!(
            symbol = series.symbol(),
            contractions = base.contractions.len(),
            pivot = base.pivot_price,
            "valid base"
        );

        BaseAssessment {
            contractions,
            rules,
            score,
            base: Some(base),
            failure: None,
        }
    }

    fn evaluate(&self, series: &Series, cs: &[Contraction], indicators: &IndicatorSet) -> Vec<BaseRuleResult> {
        let cfg = &self.config;
        let first = &cs[0];
        let last = &cs[cs.len() - 1];
        let mut rules = Vec::with_capacity(7);

        let count = cs.len() as f64;
        let min = cfg.min_contractions as f64;
        rules.push(at_least(BaseRule::ContractionCount, count, min));

        let loosening = cs.windows(2).filter(|w| w[1].pct_decline >= w[0].pct_decline).count();
        rules.push(violations(BaseRule::ProgressiveTightening, loosening));

        let heavier = cs
            .windows(2)
            .filter(|w| w[1].avg_volume_during >= w[0].avg_volume_during)
            .count();
        rules.push(violations(BaseRule::VolumeDryUp, heavier));

        rules.push(below(
            BaseRule::FinalContractionTight,
            last.pct_decline,
            cfg.final_contraction_max_pct,
        ));

        rules.push(match indicators.require(crate::indicator_set::AVG_VOLUME_50, last.end.index) {
            Ok(avg) => below(BaseRule::FinalContractionQuiet, last.avg_volume_during, avg),
            Err(reason) => BaseRuleResult {
                rule: BaseRule::FinalContractionQuiet,
                passed: false,
                observed: Some(last.avg_volume_during),
                threshold: None,
                shortfall: 0.0,
                reason: Some(reason),
            },
        });

        let duration = (last.end.index - first.start.index) as f64;
        let (lo, hi) = (cfg.min_duration_bars as f64, cfg.max_duration_bars as f64);
        rules.push(if duration < lo {
            at_least(BaseRule::Duration, duration, lo)
        } else {
            at_most(BaseRule::Duration, duration, hi)
        });

        let pivot = last.start.price;
        let distance_pct = (series.latest().close - pivot).abs() / pivot * 100.0;
        rules.push(at_most(BaseRule::PivotProximity, distance_pct, cfg.pivot_proximity_pct));

        rules
    }
}

fn at_least(rule: BaseRule, observed: f64, threshold: f64) -> BaseRuleResult {
    BaseRuleResult {
        rule,
        passed: observed >= threshold,
        observed: Some(observed),
        threshold: Some(threshold),
        shortfall: (threshold - observed).max(0.0),
        reason: None,
    }
}

fn at_most(rule: BaseRule, observed: f64, threshold: f64) -> BaseRuleResult {
    BaseRuleResult {
        rule,
        passed: observed <= threshold,
        observed: Some(observed),
        threshold: Some(threshold),
        shortfall: (observed - threshold).max(0.0),
        reason: None,
    }
}

/// Strictly below `threshold`.
fn below(rule: BaseRule, observed: f64, threshold: f64) -> BaseRuleResult {
    BaseRuleResult {
        rule,
        passed: observed < threshold,
        observed: Some(observed),
        threshold: Some(threshold),
        shortfall: (observed - threshold).max(0.0),
        reason: None,
    }
}

fn violations(rule: BaseRule, count: usize) -> BaseRuleResult {
    BaseRuleResult {
        rule,
        passed: count == 0,
        observed: Some(count as f64),
        threshold: Some(0.0),
        shortfall: count as f64,
        reason: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::swing::SwingLocator;
    use crate::testutil::{day, vcp_series};

    fn detect(config: BaseConfig, series: &Series, swings: &[SwingPoint]) -> BaseAssessment {
        let indicators = IndicatorSet::build(series);
        BaseDetector::new(config).detect(series, swings, &indicators)
    }

    fn swing(index: usize, price: f64, kind: SwingKind) -> SwingPoint {
        SwingPoint {
            index,
            date: day(index),
            price,
            kind,
        }
    }

    #[test]
    fn detects_three_stage_contraction() {
        let series = vcp_series();
        let swings = SwingLocator::new(5).locate(series.bars());
        let result = detect(BaseConfig::default(), &series, &swings);

        assert!(result.is_valid(), "failed: {:?}", result.failed_rules().collect::<Vec<_>>());
        assert_eq!(result.score, 100.0);
        let base = result.base.unwrap();
        assert_eq!(base.contractions.len(), 3);
        assert!(base
            .contractions
            .windows(2)
            .all(|w| w[1].pct_decline < w[0].pct_decline));
        assert!((base.pivot_price - 95.5).abs() < 1e-9);
        assert_eq!(base.pivot_index, 255);
        assert_eq!(base.pivot_date, day(255));
        assert_eq!(base.duration_bars, 57);
        assert!((base.duration_weeks - 11.4).abs() < 1e-9);
        assert!((base.contractions[0].pct_decline - 2100.0 / 100.5).abs() < 1e-9);
        assert_eq!(base.contractions[2].avg_volume_during, 600_000.0);
    }

    #[test]
    fn single_contraction_is_no_base() {
        let series = vcp_series();
        let swings = [swing(205, 100.5, SwingKind::High), swing(220, 79.5, SwingKind::Low)];
        let result = detect(BaseConfig::default(), &series, &swings);

        assert!(!result.is_valid());
        assert_eq!(result.score, 0.0);
        assert_eq!(
            result.failure,
            Some(AnalysisError::NoBaseFormation {
                contractions_found: 1
            })
        );
    }

    #[test]
    fn loosening_contraction_reports_shortfall() {
        let series = vcp_series();
        let swings = [
            swing(205, 100.5, SwingKind::High),
            swing(220, 79.5, SwingKind::Low),
            swing(235, 96.5, SwingKind::High),
            swing(245, 70.0, SwingKind::Low),
            swing(255, 95.5, SwingKind::High),
            swing(262, 91.5, SwingKind::Low),
        ];
        let result = detect(BaseConfig::default(), &series, &swings);

        assert!(!result.is_valid());
        assert_eq!(
            result.failure,
            Some(AnalysisError::NoBaseFormation {
                contractions_found: 3
            })
        );
        let failed: Vec<_> = result.failed_rules().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].rule, BaseRule::ProgressiveTightening);
        assert_eq!(failed[0].shortfall, 1.0);
        // Rejected candidates keep the weighted pass ratio.
        assert!((result.score - 87.5).abs() < 1e-9);
    }

    #[test]
    fn wide_final_contraction_costs_double() {
        let series = vcp_series();
        let swings = [
            swing(205, 100.5, SwingKind::High),
            swing(220, 79.5, SwingKind::Low),
            swing(235, 96.5, SwingKind::High),
            swing(245, 85.9, SwingKind::Low),
            swing(255, 95.5, SwingKind::High),
            swing(262, 89.0, SwingKind::Low),
        ];
        let result = detect(BaseConfig::default(), &series, &swings);

        let failed: Vec<_> = result.failed_rules().map(|r| r.rule).collect();
        assert_eq!(failed, vec![BaseRule::FinalContractionTight]);
        assert!((result.score - 75.0).abs() < 1e-9);
        let tight = result.failed_rules().next().unwrap();
        assert!(tight.shortfall > 1.8 && tight.shortfall < 1.9);
    }

    #[test]
    fn anchor_respects_search_window() {
        let series = vcp_series();
        let swings = SwingLocator::new(5).locate(series.bars());
        let config = BaseConfig {
            search_window_bars: 50,
            ..BaseConfig::default()
        };
        let result = detect(config, &series, &swings);
        assert_eq!(
            result.failure,
            Some(AnalysisError::NoBaseFormation {
                contractions_found: 1
            })
        );
    }

    #[test]
    fn anchor_is_highest_starting_high() {
        let series = vcp_series();
        // An earlier, lower high inside the window is skipped.
        let swings = [
            swing(190, 90.0, SwingKind::High),
            swing(195, 88.0, SwingKind::Low),
            swing(205, 100.5, SwingKind::High),
            swing(220, 79.5, SwingKind::Low),
            swing(235, 96.5, SwingKind::High),
            swing(245, 85.9, SwingKind::Low),
        ];
        let detector = BaseDetector::new(BaseConfig::default());
        let all = contractions_from_swings(&series, &swings);
        assert_eq!(all.len(), 3);
        let candidate = detector.candidate(&series, &all);
        assert_eq!(candidate.len(), 2);
        assert_eq!(candidate[0].start.index, 205);
    }

    #[test]
    fn short_base_fails_duration() {
        let series = vcp_series();
        let swings = [
            swing(245, 96.5, SwingKind::High),
            swing(250, 88.0, SwingKind::Low),
            swing(255, 95.5, SwingKind::High),
            swing(262, 91.5, SwingKind::Low),
        ];
        let result = detect(BaseConfig::default(), &series, &swings);
        let duration = result.rules.iter().find(|r| r.rule == BaseRule::Duration).unwrap();
        assert!(!duration.passed);
        assert_eq!(duration.observed, Some(17.0));
        assert_eq!(duration.shortfall, 8.0);
    }
}
