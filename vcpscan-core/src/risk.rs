//! Entry, stop, sizing and targets for a resolved pivot.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::breakout::Pivot;
use crate::config::RiskConfig;
use crate::error::AnalysisError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskStatus {
    Acceptable,
    /// Reward:risk below the minimum.
    Unacceptable,
    /// Price already ran too far past the entry; no fresh entry.
    Extended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopBasis {
    Percentage,
    SwingLow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskPlan {
    pub pivot_price: f64,
    pub entry_price: f64,
    pub stop_loss_price: f64,
    pub stop_basis: StopBasis,
    /// Always positive.
    pub risk_per_share: f64,
    pub position_size: u64,
    pub position_value: f64,
    pub max_loss: f64,
    pub reward_risk_ratio: f64,
    pub targets: [f64; 3],
    pub status: RiskStatus,
    /// Size was cut back by the position value limit.
    pub capped_by_position_limit: bool,
}

impl RiskPlan {
    pub fn is_acceptable(&self) -> bool {
        self.status == RiskStatus::Acceptable
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RiskOutcome {
    Planned(RiskPlan),
    Unavailable { reason: AnalysisError },
}

impl RiskOutcome {
    pub fn plan(&self) -> Option<&RiskPlan> {
        match self {
            RiskOutcome::Planned(plan) => Some(plan),
            RiskOutcome::Unavailable { .. } => None,
        }
    }

    /// 100 for an acceptable plan, otherwise 0.
    pub fn score(&self) -> f64 {
        match self.plan() {
            Some(plan) if plan.is_acceptable() => 100.0,
            _ => 0.0,
        }
    }
}

/// Turns a pivot into an entry, stop, size and targets.
///
/// ```text
/// entry          = pivot * (1 + entry_buffer_pct / 100)
/// stop           = max(entry * (1 - stop_pct / 100), swing_low * (1 - swing_low_buffer_pct / 100))
/// shares         = min(floor(portfolio * risk_per_trade_pct / 100 / (entry - stop)),
///                      floor(portfolio * max_position_pct / 100 / entry))
/// reward / risk  = (target_1 - entry) / (entry - stop)
/// ```
///
/// The swing-low stop is only used when it sits below the entry.
#[derive(Debug, Clone)]
pub struct RiskPlanner {
    config: RiskConfig,
}

impl RiskPlanner {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    /// Plan a trade through `pivot`. Without a pivot the plan is unavailable.
    pub fn plan(
        &self,
        pivot: Result<Pivot, AnalysisError>,
        last_close: f64,
        recent_swing_low: Option<f64>,
    ) -> RiskOutcome {
        let pivot = match pivot {
            Ok(p) => p,
            Err(_) => {
                return RiskOutcome::Unavailable {
                    reason: AnalysisError::NoPivot,
                }
            }
        };
        RiskOutcome::Planned(self.plan_for_pivot(pivot.price, last_close, recent_swing_low))
    }

    pub fn plan_for_pivot(&self, pivot_price: f64, last_close: f64, recent_swing_low: Option<f64>) -> RiskPlan {
        let cfg = &self.config;
        let entry = pivot_price * (1.0 + cfg.entry_buffer_pct / 100.0);
        let extended = last_close > entry * (1.0 + cfg.extended_pct / 100.0);

        let pct_stop = entry * (1.0 - cfg.stop_pct / 100.0);
        let swing_stop = recent_swing_low
            .map(|low| low * (1.0 - cfg.swing_low_buffer_pct / 100.0))
            .filter(|stop| *stop < entry);
        let (stop, basis) = match swing_stop {
            Some(s) if s > pct_stop => (s, StopBasis::SwingLow),
            _ => (pct_stop, StopBasis::Percentage),
        };
        let risk_per_share = entry - stop;

        let risk_budget = cfg.portfolio_value * cfg.risk_per_trade_pct / 100.0;
        let by_risk = (risk_budget / risk_per_share).floor() as u64;
        let by_value = (cfg.portfolio_value * cfg.max_position_pct / 100.0 / entry).floor() as u64;
        let capped = by_value < by_risk;
        let position_size = by_risk.min(by_value);

        let targets = cfg.target_gains_pct.map(|gain| entry * (1.0 + gain / 100.0));
        let reward_risk_ratio = (targets[0] - entry) / risk_per_share;

        let status = if extended {
            RiskStatus::Extended
        } else if reward_risk_ratio < cfg.min_reward_risk {
            RiskStatus::Unacceptable
        } else {
            RiskStatus::Acceptable
        };
        debug!(entry, stop, position_size, reward_risk_ratio, ?status, "risk plan");

        RiskPlan {
            pivot_price,
            entry_price: entry,
            stop_loss_price: stop,
            stop_basis: basis,
            risk_per_share,
            position_size,
            position_value: position_size as f64 * entry,
            max_loss: position_size as f64 * risk_per_share,
            reward_risk_ratio,
            targets,
            status,
            capped_by_position_limit: capped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::day;

    fn planner() -> RiskPlanner {
        RiskPlanner::new(RiskConfig::default())
    }

    #[test]
    fn percentage_stop_when_swing_low_is_deeper() {
        let plan = planner().plan_for_pivot(95.5, 97.5, Some(91.5));
        assert!((plan.entry_price - 96.455).abs() < 1e-9);
        assert!((plan.stop_loss_price - 96.455 * 0.93).abs() < 1e-9);
        assert_eq!(plan.stop_basis, StopBasis::Percentage);
        assert_eq!(plan.position_size, 148);
        assert!(!plan.capped_by_position_limit);
        assert!((plan.reward_risk_ratio - 0.20 / 0.07).abs() < 1e-9);
        assert_eq!(plan.status, RiskStatus::Acceptable);
        assert!((plan.targets[2] - 96.455 * 1.5).abs() < 1e-9);
    }

    #[test]
    fn swing_low_stop_when_tighter() {
        let plan = planner().plan_for_pivot(100.0, 101.0, Some(97.0));
        // entry 101, pct stop 93.93, swing stop 95.06
        assert_eq!(plan.stop_basis, StopBasis::SwingLow);
        assert!((plan.stop_loss_price - 95.06).abs() < 1e-9);
        assert!(plan.risk_per_share > 0.0);
    }

    #[test]
    fn swing_low_above_entry_is_ignored() {
        let plan = planner().plan_for_pivot(100.0, 101.0, Some(105.0));
        assert_eq!(plan.stop_basis, StopBasis::Percentage);
        assert!(plan.stop_loss_price < plan.entry_price);
    }

    #[test]
    fn extended_when_far_above_entry() {
        let plan = planner().plan_for_pivot(100.0, 107.0, None);
        assert_eq!(plan.status, RiskStatus::Extended);
        // Entry stays pivot based.
        assert!((plan.entry_price - 101.0).abs() < 1e-9);
    }

    #[test]
    fn position_value_cap() {
        let config = RiskConfig {
            max_position_pct: 5.0,
            ..RiskConfig::default()
        };
        let plan = RiskPlanner::new(config).plan_for_pivot(99.0, 100.0, None);
        // Risk sizing allows 142 shares, the 5% cap only 50.
        assert_eq!(plan.position_size, 50);
        assert!(plan.capped_by_position_limit);
    }

    #[test]
    fn risk_never_exceeds_one_percent() {
        for pivot in [5.0, 17.3, 95.5, 412.0, 2999.0] {
            let plan = planner().plan_for_pivot(pivot, pivot, Some(pivot * 0.97));
            assert!(plan.position_size as f64 * plan.risk_per_share <= 1000.0 + 1e-9);
        }
    }

    #[test]
    fn low_reward_is_unacceptable() {
        let config = RiskConfig {
            target_gains_pct: [10.0, 20.0, 30.0],
            ..RiskConfig::default()
        };
        let plan = RiskPlanner::new(config).plan_for_pivot(100.0, 101.0, None);
        assert_eq!(plan.status, RiskStatus::Unacceptable);
        let outcome = RiskOutcome::Planned(plan);
        assert_eq!(outcome.score(), 0.0);
    }

    #[test]
    fn no_pivot_is_unavailable() {
        let outcome = planner().plan(Err(AnalysisError::NoBaseFormation { contractions_found: 1 }), 50.0, None);
        assert!(matches!(outcome, RiskOutcome::Unavailable { reason: AnalysisError::NoPivot }));
        assert_eq!(outcome.score(), 0.0);

        let pivot = Pivot {
            price: 50.0,
            date: day(0),
            index: 0,
        };
        assert!(planner().plan(Ok(pivot), 50.0, None).plan().is_some());
    }
}
