//! Trend template qualification.
//!
//! Ten independent conditions evaluated on the latest bar. A condition that
//! references an undefined indicator fails and carries the reason.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::TrendConfig;
use crate::domain::Series;
use crate::error::AnalysisError;
use crate::indicator_set::{IndicatorSet, HIGH_252, LOW_252, SMA_150, SMA_200, SMA_50};
use crate::relative_strength::RelativeStrength;

pub const TREND_CONDITIONS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendCondition {
    CloseAboveSma50,
    CloseAboveSma150,
    CloseAboveSma200,
    Sma150AboveSma200,
    Sma50AboveSma150,
    Sma50AboveSma200,
    Sma200Rising,
    AboveLow52Week,
    NearHigh52Week,
    RelativeStrength,
}

impl TrendCondition {
    pub const ALL: [TrendCondition; TREND_CONDITIONS] = [
        TrendCondition::CloseAboveSma50,
        TrendCondition::CloseAboveSma150,
        TrendCondition::CloseAboveSma200,
        TrendCondition::Sma150AboveSma200,
        TrendCondition::Sma50AboveSma150,
        TrendCondition::Sma50AboveSma200,
        TrendCondition::Sma200Rising,
        TrendCondition::AboveLow52Week,
        TrendCondition::NearHigh52Week,
        TrendCondition::RelativeStrength,
    ];
}

/// Outcome of one condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionResult {
    pub condition: TrendCondition,
    pub passed: bool,
    pub value: Option<f64>,
    pub threshold: Option<f64>,
    /// `(value / threshold - 1) * 100`.
    pub margin_pct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<AnalysisError>,
}

impl ConditionResult {
    /// `value` must be at least `threshold` (strictly above when `strict`).
    fn compare(condition: TrendCondition, value: f64, threshold: f64, strict: bool) -> Self {
        let passed = if strict { value > threshold } else { value >= threshold };
        let margin_pct = (threshold != 0.0).then(|| (value / threshold - 1.0) * 100.0);
        Self {
            condition,
            passed,
            value: Some(value),
            threshold: Some(threshold),
            margin_pct,
            reason: None,
        }
    }

    fn undefined(condition: TrendCondition, reason: AnalysisError) -> Self {
        Self {
            condition,
            passed: false,
            value: None,
            threshold: None,
            margin_pct: None,
            reason: Some(reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendAssessment {
    pub conditions: Vec<ConditionResult>,
    pub pass_count: usize,
    pub total: usize,
    pub qualified: bool,
    pub rs_score: Option<f64>,
}

impl TrendAssessment {
    /// Pass ratio scaled to 0–100.
    pub fn score(&self) -> f64 {
        self.pass_count as f64 / self.total as f64 * 100.0
    }

    pub fn condition(&self, condition: TrendCondition) -> Option<&ConditionResult> {
        self.conditions.iter().find(|c| c.condition == condition)
    }

    pub fn failed(&self) -> impl Iterator<Item = &ConditionResult> {
        self.conditions.iter().filter(|c| !c.passed)
    }
}

/// Evaluates every [`TrendCondition`] on the latest bar. The stock qualifies
/// when at least `min_pass` conditions hold.
#[derive(Debug, Clone)]
pub struct TrendQualifier {
    config: TrendConfig,
}

impl TrendQualifier {
    pub fn new(config: TrendConfig) -> Self {
        Self { config }
    }

    pub fn qualify(
        &self,
        series: &Series,
        indicators: &IndicatorSet,
        rs: &Result<RelativeStrength, AnalysisError>,
    ) -> TrendAssessment {
        let t = series.latest_index();
        let close = series.latest().close;

        let conditions: Vec<ConditionResult> = TrendCondition::ALL
            .iter()
            .map(|&condition| self.evaluate(condition, close, t, indicators, rs))
            .collect();

        let pass_count = conditions.iter().filter(|c| c.passed).count();
        let qualified = pass_count >= self.config.min_pass;
        debug!(
            symbol = series.symbol(),
            pass_count,
            qualified,
            "trend template evaluated"
        );

        TrendAssessment {
            conditions,
            pass_count,
            total: TREND_CONDITIONS,
            qualified,
            rs_score: rs.as_ref().ok().map(|r| r.score),
        }
    }

    fn evaluate(
        &self,
        condition: TrendCondition,
        close: f64,
        t: usize,
        ind: &IndicatorSet,
        rs: &Result<RelativeStrength, AnalysisError>,
    ) -> ConditionResult {
        use TrendCondition::*;

        let pair = |a: Result<f64, AnalysisError>, b: Result<f64, AnalysisError>| match (a, b) {
            (Ok(a), Ok(b)) => ConditionResult::compare(condition, a, b, true),
            (Err(e), _) | (_, Err(e)) => ConditionResult::undefined(condition, e),
        };

        match condition {
            CloseAboveSma50 => pair(Ok(close), ind.require(SMA_50, t)),
            CloseAboveSma150 => pair(Ok(close), ind.require(SMA_150, t)),
            CloseAboveSma200 => pair(Ok(close), ind.require(SMA_200, t)),
            Sma150AboveSma200 => pair(ind.require(SMA_150, t), ind.require(SMA_200, t)),
            Sma50AboveSma150 => pair(ind.require(SMA_50, t), ind.require(SMA_150, t)),
            Sma50AboveSma200 => pair(ind.require(SMA_50, t), ind.require(SMA_200, t)),
            Sma200Rising => self.sma200_rising(t, ind),
            AboveLow52Week => match ind.require(LOW_252, t) {
                Ok(low) => ConditionResult::compare(condition, close, low * self.config.above_low_ratio, false),
                Err(e) => ConditionResult::undefined(condition, e),
            },
            NearHigh52Week => match ind.require(HIGH_252, t) {
                Ok(high) => ConditionResult::compare(condition, close, high * self.config.near_high_ratio, false),
                Err(e) => ConditionResult::undefined(condition, e),
            },
            RelativeStrength => match rs {
                Ok(rs) => ConditionResult::compare(condition, rs.score, self.config.min_rs_score, false),
                Err(e) => ConditionResult::undefined(condition, e.clone()),
            },
        }
    }

    /// Every bar-to-bar step of SMA200 over the trailing window must be
    /// non-decreasing. Value is the current SMA200, threshold the SMA200 at
    /// the start of the window.
    fn sma200_rising(&self, t: usize, ind: &IndicatorSet) -> ConditionResult {
        let condition = TrendCondition::Sma200Rising;
        let steps = self.config.sma200_rising_bars;
        let Some(start) = t.checked_sub(steps) else {
            return ConditionResult::undefined(
                condition,
                AnalysisError::insufficient("sma_200_slope", 200 + steps, t + 1),
            );
        };

        let mut window = Vec::with_capacity(steps + 1);
        for i in start..=t {
            match ind.get(SMA_200, i) {
                Some(v) => window.push(v),
                None => {
                    return ConditionResult::undefined(
                        condition,
                        AnalysisError::insufficient("sma_200_slope", 200 + steps, t + 1),
                    )
                }
            }
        }

        let rising = window.windows(2).all(|w| w[1] >= w[0]);
        let (first, last) = (window[0], window[window.len() - 1]);
        let mut result = ConditionResult::compare(condition, last, first, false);
        result.passed = rising;
        result
    }
}
