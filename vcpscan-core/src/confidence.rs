//! Weighted confidence score and verdict.

use serde::{Deserialize, Serialize};

use crate::config::ConfidenceConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    AvoidViolated,
    AvoidWeak,
    Watch,
    BuyOnConfirmation,
    StrongBuy,
}

impl Verdict {
    /// Lower the verdict to `ceiling` if it is better than that.
    pub fn at_most(self, ceiling: Verdict) -> Verdict {
        self.min(ceiling)
    }

    pub fn is_buy(self) -> bool {
        matches!(self, Verdict::StrongBuy | Verdict::BuyOnConfirmation)
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Verdict::StrongBuy => "strong_buy",
            Verdict::BuyOnConfirmation => "buy_on_confirmation",
            Verdict::Watch => "watch",
            Verdict::AvoidWeak => "avoid_weak",
            Verdict::AvoidViolated => "avoid_violated",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentScore {
    /// 0–100 before weighting.
    pub score: f64,
    pub weight: f64,
    pub contribution: f64,
}

impl ComponentScore {
    fn new(score: f64, weight: f64) -> Self {
        let score = score.clamp(0.0, 100.0);
        Self {
            score,
            weight,
            contribution: score * weight,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceBreakdown {
    pub trend: ComponentScore,
    pub base: ComponentScore,
    pub breakout: ComponentScore,
    pub risk: ComponentScore,
    pub anti_rules: ComponentScore,
    pub fundamentals_bonus: f64,
    pub total: f64,
}

/// Component scores and gate inputs for one analysis.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfidenceInputs {
    pub trend_score: f64,
    pub base_score: f64,
    pub breakout_score: f64,
    pub risk_score: f64,
    pub cleanliness: f64,
    pub fundamentals_bonus: f64,
    pub hard_violation: bool,
    pub base_valid: bool,
    pub trend_qualified: bool,
    pub breakout_confirmed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfidenceResult {
    pub breakdown: ConfidenceBreakdown,
    pub verdict: Verdict,
    /// Gates that lowered the threshold verdict, in application order.
    pub gates: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ConfidenceAggregator {
    config: ConfidenceConfig,
}

impl ConfidenceAggregator {
    pub fn new(config: ConfidenceConfig) -> Self {
        Self { config }
    }

    pub fn threshold_verdict(&self, score: f64) -> Verdict {
        let c = &self.config;
        if score >= c.strong_buy_min {
            Verdict::StrongBuy
        } else if score >= c.buy_on_confirmation_min {
            Verdict::BuyOnConfirmation
        } else if score >= c.watch_min {
            Verdict::Watch
        } else if score >= c.avoid_weak_min {
            Verdict::AvoidWeak
        } else {
            Verdict::AvoidViolated
        }
    }

    pub fn aggregate(&self, inputs: &ConfidenceInputs) -> ConfidenceResult {
        let c = &self.config;
        let trend = ComponentScore::new(inputs.trend_score, c.trend_weight);
        let base = ComponentScore::new(inputs.base_score, c.base_weight);
        let breakout = ComponentScore::new(inputs.breakout_score, c.breakout_weight);
        let risk = ComponentScore::new(inputs.risk_score, c.risk_weight);
        let anti_rules = ComponentScore::new(inputs.cleanliness, c.anti_rule_weight);
        let bonus = inputs.fundamentals_bonus.clamp(0.0, c.fundamentals_max_bonus);

        let weighted = trend.contribution
            + base.contribution
            + breakout.contribution
            + risk.contribution
            + anti_rules.contribution;
        let total = (weighted + bonus).clamp(0.0, 100.0);

        let mut verdict = self.threshold_verdict(total);
        let mut gates = Vec::new();
        if inputs.hard_violation && verdict != Verdict::AvoidViolated {
            verdict = Verdict::AvoidViolated;
            gates.push("hard anti-rule violation: forced avoid_violated".to_string());
        }

        let mut cap = |verdict: &mut Verdict, ceiling: Verdict, why: &str| {
            if *verdict > ceiling {
                *verdict = ceiling;
                gates.push(format!("{why}: capped at {ceiling}"));
            }
        };
        if !inputs.base_valid {
            cap(&mut verdict, Verdict::Watch, "no valid base");
        }
        if !inputs.trend_qualified {
            cap(&mut verdict, Verdict::Watch, "trend not qualified");
        }
        if !inputs.breakout_confirmed {
            cap(&mut verdict, Verdict::BuyOnConfirmation, "breakout not confirmed");
        }

        ConfidenceResult {
            breakdown: ConfidenceBreakdown {
                trend,
                base,
                breakout,
                risk,
                anti_rules,
                fundamentals_bonus: bonus,
                total,
            },
            verdict,
            gates,
        }
    }
}
