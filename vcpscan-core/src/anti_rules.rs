//! Anti-rules: conditions that argue against buying even when the pattern
//! looks right. Soft violations cost cleanliness points; a hard violation
//! forces the avoid-violated verdict.

use serde::{Deserialize, Serialize};

use crate::config::ConfidenceConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AntiRule {
    WeakRelativeStrength,
    ThinVolume,
    ChasingExtended,
    BuyingTooEarly,
    Downtrend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Soft,
    Hard,
}

impl AntiRule {
    pub fn severity(self) -> Severity {
        match self {
            AntiRule::Downtrend => Severity::Hard,
            _ => Severity::Soft,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub rule: AntiRule,
    pub severity: Severity,
    pub detail: String,
}

/// Facts about the latest bar the anti-rules look at.
#[derive(Debug, Clone, Default)]
pub struct AntiRuleInputs {
    pub close: f64,
    pub volume: f64,
    pub avg_volume_50: Option<f64>,
    pub rs_score: Option<f64>,
    pub min_rs_score: f64,
    pub extended: bool,
    /// Pivot of a valid base, if any.
    pub pivot: Option<f64>,
    pub sma_200: Option<f64>,
    /// SMA200 at the start of the slope window.
    pub sma_200_prior: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AntiRuleReport {
    pub violations: Vec<Violation>,
    /// 0–100; zero on any hard violation.
    pub cleanliness: f64,
}

impl AntiRuleReport {
    pub fn has_hard_violation(&self) -> bool {
        self.violations.iter().any(|v| v.severity == Severity::Hard)
    }

    pub fn soft_count(&self) -> usize {
        self.violations.iter().filter(|v| v.severity == Severity::Soft).count()
    }
}

pub fn evaluate_anti_rules(inputs: &AntiRuleInputs, config: &ConfidenceConfig) -> AntiRuleReport {
    let mut violations = Vec::new();
    let mut flag = |rule: AntiRule, detail: String| {
        violations.push(Violation {
            rule,
            severity: rule.severity(),
            detail,
        })
    };

    match inputs.rs_score {
        Some(rs) if rs >= inputs.min_rs_score => {}
        Some(rs) => flag(
            AntiRule::WeakRelativeStrength,
            format!("RS score {rs:.0} below {:.0}", inputs.min_rs_score),
        ),
        None => flag(AntiRule::WeakRelativeStrength, "RS score undefined".to_string()),
    }

    if let Some(avg) = inputs.avg_volume_50 {
        if inputs.volume < config.thin_volume_ratio * avg {
            flag(
                AntiRule::ThinVolume,
                format!("volume {:.0} below {:.0}% of 50-bar average {avg:.0}", inputs.volume, config.thin_volume_ratio * 100.0),
            );
        }
    }

    if inputs.extended {
        flag(AntiRule::ChasingExtended, "price extended beyond entry".to_string());
    }

    if let Some(pivot) = inputs.pivot {
        if inputs.close <= pivot {
            flag(
                AntiRule::BuyingTooEarly,
                format!("close {:.2} not above pivot {pivot:.2}", inputs.close),
            );
        }
    }

    if let (Some(now), Some(prior)) = (inputs.sma_200, inputs.sma_200_prior) {
        if inputs.close < now && now < prior {
            flag(
                AntiRule::Downtrend,
                format!("close {:.2} below declining SMA200 {now:.2}", inputs.close),
            );
        }
    }

    let hard = violations.iter().any(|v| v.severity == Severity::Hard);
    let soft = violations.iter().filter(|v| v.severity == Severity::Soft).count();
    let cleanliness = if hard {
        0.0
    } else {
        (100.0 - config.soft_violation_penalty * soft as f64).max(0.0)
    };

    AntiRuleReport { violations, cleanliness }
}
