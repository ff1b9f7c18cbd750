//! End-to-end analysis of one symbol.
//!
//! Data flows one way: Series → IndicatorSet → trend / swings → base →
//! pivot → breakout → risk → anti-rules → confidence → [`Decision`]. The
//! analyzer is a pure function of its inputs and configuration: no I/O, no
//! clock, no shared mutable state.

use tracing::{debug, info};

use crate::anti_rules::{evaluate_anti_rules, AntiRuleInputs, AntiRuleReport};
use crate::base::{BaseAssessment, BaseDetector};
use crate::breakout::{resolve_pivot, BreakoutAssessment, BreakoutValidator};
use crate::confidence::{ConfidenceAggregator, ConfidenceInputs, ConfidenceResult};
use crate::config::{ConfigError, EngineConfig};
use crate::data::{FundamentalsLookup, FundamentalsProvider, MarketDataProvider};
use crate::decision::Decision;
use crate::domain::Series;
use crate::error::AnalysisError;
use crate::fundamentals::FundamentalsAssessment;
use crate::indicator_set::IndicatorSet;
use crate::relative_strength::relative_strength;
use crate::risk::{RiskOutcome, RiskPlanner, RiskStatus};
use crate::swing::{SwingKind, SwingLocator};
use crate::trend::{TrendAssessment, TrendQualifier};

#[derive(Debug, Clone)]
pub struct Analyzer {
    config: EngineConfig,
    config_hash: String,
    trend: TrendQualifier,
    swings: SwingLocator,
    base: BaseDetector,
    breakout: BreakoutValidator,
    risk: RiskPlanner,
    confidence: ConfidenceAggregator,
}

impl Analyzer {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let config_hash = config.config_hash()?;
        Ok(Self {
            trend: TrendQualifier::new(config.trend.clone()),
            swings: SwingLocator::new(config.swing.window),
            base: BaseDetector::new(config.base.clone()),
            breakout: BreakoutValidator::new(config.breakout.clone()),
            risk: RiskPlanner::new(config.risk.clone()),
            confidence: ConfidenceAggregator::new(config.confidence.clone()),
            config_hash,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn config_hash(&self) -> &str {
        &self.config_hash
    }

    /// Analyze an already-validated series.
    pub fn analyze(&self, series: &Series, benchmark: Option<&Series>, fundamentals: &FundamentalsLookup) -> Decision {
        let t = series.latest_index();
        let latest = *series.latest();
        let indicators = IndicatorSet::build(series);

        let rs = relative_strength(series.bars(), t, benchmark);
        let trend = self.trend.qualify(series, &indicators, &rs);

        let swings = self.swings.locate(series.bars());
        let base = self.base.detect(series, &swings, &indicators);
        let breakout = self.breakout.assess(series, &indicators, &base);

        let recent_swing_low = swings
            .iter()
            .rev()
            .find(|s| s.kind == SwingKind::Low)
            .map(|s| s.price);
        let risk = self.risk.plan(resolve_pivot(&base), latest.close, recent_swing_low);

        let sma_200_prior = t
            .checked_sub(self.config.trend.sma200_rising_bars)
            .and_then(|i| indicators.sma_200(i));
        let anti_rules = evaluate_anti_rules(
            &AntiRuleInputs {
                close: latest.close,
                volume: latest.volume as f64,
                avg_volume_50: indicators.avg_volume_50(t),
                rs_score: trend.rs_score,
                min_rs_score: self.config.trend.min_rs_score,
                extended: risk.plan().is_some_and(|p| p.status == RiskStatus::Extended),
                pivot: base.base.as_ref().map(|b| b.pivot_price),
                sma_200: indicators.sma_200(t),
                sma_200_prior,
            },
            &self.config.confidence,
        );

        let fundamentals = FundamentalsAssessment::assess(fundamentals, self.config.confidence.fundamentals_max_bonus);

        let result = self.confidence.aggregate(&ConfidenceInputs {
            trend_score: trend.score(),
            base_score: base.score,
            breakout_score: breakout.score(),
            risk_score: risk.score(),
            cleanliness: anti_rules.cleanliness,
            fundamentals_bonus: fundamentals.bonus(),
            hard_violation: anti_rules.has_hard_violation(),
            base_valid: base.is_valid(),
            trend_qualified: trend.qualified,
            breakout_confirmed: breakout.is_confirmed(),
        });

        let rationale = rationale(&trend, &base, &breakout, &risk, &anti_rules, &fundamentals, &result);
        info!(
            symbol = series.symbol(),
            score = result.breakdown.total,
            verdict = %result.verdict,
            "analysis complete"
        );

        Decision {
            symbol: series.symbol().to_string(),
            as_of: latest.date,
            last_close: latest.close,
            bars_analyzed: series.len(),
            relative_strength: rs.ok(),
            swings,
            trend,
            base,
            breakout,
            risk,
            anti_rules,
            fundamentals,
            confidence_score: result.breakdown.total,
            confidence: result.breakdown,
            verdict: result.verdict,
            rationale,
            insufficient_history: indicators.insufficient_history(),
            config_hash: self.config_hash.clone(),
        }
    }

    /// Fetch and analyze `symbol`. A provider error aborts the analysis;
    /// missing fundamentals only mean "not scored".
    pub fn analyze_symbol(
        &self,
        market: &dyn MarketDataProvider,
        fundamentals: Option<&dyn FundamentalsProvider>,
        symbol: &str,
        benchmark: Option<&Series>,
        lookback_days: usize,
    ) -> Result<Decision, AnalysisError> {
        self.fetch_and_analyze(market, fundamentals, symbol, benchmark, lookback_days)
            .map(|(decision, _)| decision)
    }

    /// Like [`Analyzer::analyze_symbol`], also handing back the fetched series.
    pub fn fetch_and_analyze(
        &self,
        market: &dyn MarketDataProvider,
        fundamentals: Option<&dyn FundamentalsProvider>,
        symbol: &str,
        benchmark: Option<&Series>,
        lookback_days: usize,
    ) -> Result<(Decision, Series), AnalysisError> {
        debug!(symbol, provider = market.name(), lookback_days, "fetching series");
        let series = market.fetch(symbol, lookback_days)?;
        let lookup = fundamentals
            .map(|p| p.fetch_fundamentals(symbol))
            .unwrap_or(FundamentalsLookup::Unavailable);
        let decision = self.analyze(&series, benchmark, &lookup);
        Ok((decision, series))
    }
}

fn rationale(
    trend: &TrendAssessment,
    base: &BaseAssessment,
    breakout: &BreakoutAssessment,
    risk: &RiskOutcome,
    anti_rules: &AntiRuleReport,
    fundamentals: &FundamentalsAssessment,
    result: &ConfidenceResult,
) -> Vec<String> {
    let mut lines = Vec::new();

    lines.push(format!(
        "trend template: {}/{} conditions passed{}",
        trend.pass_count,
        trend.total,
        if trend.qualified { " (qualified)" } else { "" }
    ));
    for cond in trend.failed() {
        match (&cond.reason, cond.margin_pct) {
            (Some(reason), _) => lines.push(format!("  {:?} undefined: {reason}", cond.condition)),
            (None, Some(margin)) => lines.push(format!("  {:?} failed ({margin:+.1}% vs threshold)", cond.condition)),
            (None, None) => lines.push(format!("  {:?} failed", cond.condition)),
        }
    }

    match (&base.base, &base.failure) {
        (Some(b), _) => lines.push(format!(
            "base: {} contractions over {:.1} weeks, pivot {:.2}",
            b.contractions.len(),
            b.duration_weeks,
            b.pivot_price
        )),
        (None, Some(reason)) => {
            lines.push(format!("base: {reason} (score {:.1})", base.score));
            for rule in base.failed_rules() {
                lines.push(format!("  {:?} missed by {:.2}", rule.rule, rule.shortfall));
            }
        }
        (None, None) => lines.push("base: none".to_string()),
    }

    match breakout {
        BreakoutAssessment::NoBase { .. } => lines.push("breakout: no base".to_string()),
        BreakoutAssessment::Evaluated(r) => {
            let failed: Vec<String> = r.failed().map(|c| format!("{c:?}")).collect();
            if failed.is_empty() {
                lines.push(format!("breakout: confirmed {}/{}", r.pass_count, r.total));
            } else {
                lines.push(format!(
                    "breakout: {}/{} checks, failed {}",
                    r.pass_count,
                    r.total,
                    failed.join(", ")
                ));
            }
        }
    }

    match risk {
        RiskOutcome::Planned(plan) => lines.push(format!(
            "risk: entry {:.2}, stop {:.2}, {} shares, reward:risk {:.2} ({:?})",
            plan.entry_price, plan.stop_loss_price, plan.position_size, plan.reward_risk_ratio, plan.status
        )),
        RiskOutcome::Unavailable { reason } => lines.push(format!("risk: unavailable ({reason})")),
    }

    for v in &anti_rules.violations {
        lines.push(format!("anti-rule {:?} ({:?}): {}", v.rule, v.severity, v.detail));
    }

    if let FundamentalsAssessment::Scored { checks, passed, bonus } = fundamentals {
        lines.push(format!("fundamentals: {passed}/{} passed, +{bonus:.1} bonus", checks.len()));
    }

    lines.extend(result.gates.iter().cloned());
    lines.push(format!(
        "confidence {:.1} => {}",
        result.breakdown.total, result.verdict
    ));
    lines
}
