//! Optional fundamentals scoring.
//!
//! Fundamentals never penalize: only fields that are present are scored, and
//! the result is a bonus of up to `fundamentals_max_bonus` points.

use serde::{Deserialize, Serialize};

use crate::data::FundamentalsLookup;

pub const MIN_EPS_GROWTH_PCT: f64 = 25.0;
pub const MIN_SALES_GROWTH_PCT: f64 = 25.0;
pub const MIN_ROE_PCT: f64 = 17.0;
pub const MAX_SECTOR_RANK: u32 = 3;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FundamentalSnapshot {
    /// Year-over-year quarterly EPS growth.
    pub eps_growth_pct: Option<f64>,
    pub sales_growth_pct: Option<f64>,
    pub roe_pct: Option<f64>,
    pub margins_increasing: Option<bool>,
    pub earnings_accelerating: Option<bool>,
    /// Industry group rank within its sector, 1 is best.
    pub sector_rank: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundamentalCheck {
    EpsGrowth,
    SalesGrowth,
    ReturnOnEquity,
    MarginsIncreasing,
    EarningsAccelerating,
    SectorLeadership,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundamentalCheckResult {
    pub check: FundamentalCheck,
    pub passed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FundamentalsAssessment {
    NotScored,
    Scored {
        checks: Vec<FundamentalCheckResult>,
        passed: usize,
        bonus: f64,
    },
}

impl FundamentalsAssessment {
    pub fn bonus(&self) -> f64 {
        match self {
            FundamentalsAssessment::NotScored => 0.0,
            FundamentalsAssessment::Scored { bonus, .. } => *bonus,
        }
    }

    pub fn assess(lookup: &FundamentalsLookup, max_bonus: f64) -> Self {
        match lookup {
            FundamentalsLookup::Available(snapshot) => Self::score(snapshot, max_bonus),
            FundamentalsLookup::Unavailable => FundamentalsAssessment::NotScored,
        }
    }

    pub fn score(snapshot: &FundamentalSnapshot, max_bonus: f64) -> Self {
        let candidates = [
            (FundamentalCheck::EpsGrowth, snapshot.eps_growth_pct.map(|v| v >= MIN_EPS_GROWTH_PCT)),
            (FundamentalCheck::SalesGrowth, snapshot.sales_growth_pct.map(|v| v >= MIN_SALES_GROWTH_PCT)),
            (FundamentalCheck::ReturnOnEquity, snapshot.roe_pct.map(|v| v >= MIN_ROE_PCT)),
            (FundamentalCheck::MarginsIncreasing, snapshot.margins_increasing),
            (FundamentalCheck::EarningsAccelerating, snapshot.earnings_accelerating),
            (FundamentalCheck::SectorLeadership, snapshot.sector_rank.map(|r| r <= MAX_SECTOR_RANK)),
        ];
        let checks: Vec<FundamentalCheckResult> = candidates
            .into_iter()
            .filter_map(|(check, passed)| passed.map(|passed| FundamentalCheckResult { check, passed }))
            .collect();

        if checks.is_empty() {
            return FundamentalsAssessment::NotScored;
        }
        let passed = checks.iter().filter(|c| c.passed).count();
        let bonus = max_bonus * passed as f64 / checks.len() as f64;
        FundamentalsAssessment::Scored { checks, passed, bonus }
    }
}
