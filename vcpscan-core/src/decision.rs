//! The serializable analysis record.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::anti_rules::AntiRuleReport;
use crate::base::BaseAssessment;
use crate::breakout::BreakoutAssessment;
use crate::confidence::{ConfidenceBreakdown, Verdict};
use crate::error::AnalysisError;
use crate::fundamentals::FundamentalsAssessment;
use crate::relative_strength::RelativeStrength;
use crate::risk::RiskOutcome;
use crate::swing::SwingPoint;
use crate::trend::TrendAssessment;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub symbol: String,
    pub as_of: NaiveDate,
    pub last_close: f64,
    pub bars_analyzed: usize,
    pub trend: TrendAssessment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_strength: Option<RelativeStrength>,
    pub swings: Vec<SwingPoint>,
    pub base: BaseAssessment,
    pub breakout: BreakoutAssessment,
    pub risk: RiskOutcome,
    pub anti_rules: AntiRuleReport,
    pub fundamentals: FundamentalsAssessment,
    pub confidence: ConfidenceBreakdown,
    /// 0–100.
    pub confidence_score: f64,
    pub verdict: Verdict,
    pub rationale: Vec<String>,
    /// Indicators undefined at the latest bar.
    pub insufficient_history: Vec<AnalysisError>,
    pub config_hash: String,
}

impl Decision {
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Most recent confirmed swing low.
    pub fn recent_swing_low(&self) -> Option<&SwingPoint> {
        self.swings
            .iter()
            .rev()
            .find(|s| s.kind == crate::swing::SwingKind::Low)
    }
}
