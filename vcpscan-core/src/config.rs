//! Engine configuration.
//!
//! Every threshold the engine uses lives here as a named, serializable value.
//! All sections default to the standard rule set, so an empty TOML document
//! is a valid configuration. Percent-valued fields (`*_pct`) are in percent
//! units (7.0 means 7%); ratio fields (`*_ratio`) are plain multipliers.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid config value for {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

fn invalid(field: &'static str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        message: message.into(),
    }
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < min || value > max {
        return Err(invalid(field, format!("{value} outside [{min}, {max}]")));
    }
    Ok(())
}

fn check_positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid(field, format!("{value} must be positive")));
    }
    Ok(())
}

/// Full engine configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub trend: TrendConfig,
    pub swing: SwingConfig,
    pub base: BaseConfig,
    pub breakout: BreakoutConfig,
    pub risk: RiskConfig,
    pub confidence: ConfidenceConfig,
    pub exit: ExitConfig,
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| invalid("config", e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.trend.validate()?;
        self.swing.validate()?;
        self.base.validate()?;
        self.breakout.validate()?;
        self.risk.validate()?;
        self.confidence.validate()?;
        self.exit.validate()?;
        Ok(())
    }

    /// BLAKE3 hash of the canonical JSON form. Two configurations with the
    /// same hash produce identical decisions for identical input.
    pub fn config_hash(&self) -> Result<String, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}

/// Trend template thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Conditions that must pass (out of 10) for the trend to qualify.
    pub min_pass: usize,
    /// SMA200 must be non-decreasing across this many bar-to-bar steps.
    pub sma200_rising_bars: usize,
    /// close ≥ ratio × 52-week low.
    pub above_low_ratio: f64,
    /// close ≥ ratio × 52-week high.
    pub near_high_ratio: f64,
    pub min_rs_score: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            min_pass: 10,
            sma200_rising_bars: 20,
            above_low_ratio: 1.30,
            near_high_ratio: 0.75,
            min_rs_score: 70.0,
        }
    }
}

impl TrendConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.min_pass > 10 {
            return Err(invalid("trend.min_pass", format!("{} exceeds 10 conditions", self.min_pass)));
        }
        if self.sma200_rising_bars == 0 {
            return Err(invalid("trend.sma200_rising_bars", "must be at least 1"));
        }
        check_positive("trend.above_low_ratio", self.above_low_ratio)?;
        check_range("trend.near_high_ratio", self.near_high_ratio, 0.0, 1.0)?;
        check_range("trend.min_rs_score", self.min_rs_score, 0.0, 100.0)
    }
}

/// Swing detection window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwingConfig {
    /// Bars on each side of a candidate bar.
    pub window: usize,
}

impl Default for SwingConfig {
    fn default() -> Self {
        Self { window: 5 }
    }
}

impl SwingConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.window == 0 || self.window > 20 {
            return Err(invalid("swing.window", format!("{} outside [1, 20]", self.window)));
        }
        Ok(())
    }
}

/// Contraction/base validation thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseConfig {
    /// Only contractions starting within this many trailing bars can anchor a base.
    pub search_window_bars: usize,
    pub min_contractions: usize,
    /// Final contraction must decline less than this.
    pub final_contraction_max_pct: f64,
    pub min_duration_bars: usize,
    pub max_duration_bars: usize,
    /// Latest close must be within this distance of the pivot.
    pub pivot_proximity_pct: f64,
}

impl Default for BaseConfig {
    fn default() -> Self {
        Self {
            search_window_bars: 120,
            min_contractions: 2,
            final_contraction_max_pct: 5.0,
            min_duration_bars: 25,
            max_duration_bars: 75,
            pivot_proximity_pct: 5.0,
        }
    }
}

impl BaseConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.min_contractions < 2 {
            return Err(invalid("base.min_contractions", "a base needs at least 2 contractions"));
        }
        if self.min_duration_bars > self.max_duration_bars {
            return Err(invalid(
                "base.min_duration_bars",
                format!("{} exceeds max_duration_bars {}", self.min_duration_bars, self.max_duration_bars),
            ));
        }
        if self.search_window_bars == 0 {
            return Err(invalid("base.search_window_bars", "must be at least 1"));
        }
        check_positive("base.final_contraction_max_pct", self.final_contraction_max_pct)?;
        check_positive("base.pivot_proximity_pct", self.pivot_proximity_pct)
    }
}

/// Breakout confirmation thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakoutConfig {
    /// close ≥ ratio × bar high.
    pub close_near_high_ratio: f64,
    /// low ≥ ratio × pivot.
    pub low_hold_ratio: f64,
    /// volume ≥ ratio × 50-bar average volume ending at the prior bar.
    pub volume_surge_ratio: f64,
    pub recent_volume_bars: usize,
    /// Bars preceding the breakout checked for tight action.
    pub tight_window_bars: usize,
    /// Tight window mean range must be below ratio × base mean range.
    pub tightness_ratio: f64,
    /// A wide-range day exceeds ratio × recent average range.
    pub wide_range_ratio: f64,
    pub range_average_bars: usize,
}

impl Default for BreakoutConfig {
    fn default() -> Self {
        Self {
            close_near_high_ratio: 0.95,
            low_hold_ratio: 0.98,
            volume_surge_ratio: 1.4,
            recent_volume_bars: 5,
            tight_window_bars: 5,
            tightness_ratio: 0.8,
            wide_range_ratio: 1.5,
            range_average_bars: 20,
        }
    }
}

impl BreakoutConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        check_range("breakout.close_near_high_ratio", self.close_near_high_ratio, 0.0, 1.0)?;
        check_range("breakout.low_hold_ratio", self.low_hold_ratio, 0.0, 1.0)?;
        check_positive("breakout.volume_surge_ratio", self.volume_surge_ratio)?;
        if self.recent_volume_bars == 0 {
            return Err(invalid("breakout.recent_volume_bars", "must be at least 1"));
        }
        if !(5..=10).contains(&self.tight_window_bars) {
            return Err(invalid(
                "breakout.tight_window_bars",
                format!("{} outside [5, 10]", self.tight_window_bars),
            ));
        }
        check_positive("breakout.tightness_ratio", self.tightness_ratio)?;
        check_positive("breakout.wide_range_ratio", self.wide_range_ratio)?;
        if self.range_average_bars == 0 {
            return Err(invalid("breakout.range_average_bars", "must be at least 1"));
        }
        Ok(())
    }
}

/// Entry, stop and sizing rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub portfolio_value: f64,
    /// Capital at risk per trade.
    pub risk_per_trade_pct: f64,
    /// Entry sits this far above the pivot.
    pub entry_buffer_pct: f64,
    /// Close beyond entry by more than this flags the plan as extended.
    pub extended_pct: f64,
    /// Percentage stop below entry (5–10).
    pub stop_pct: f64,
    /// Swing-low stop sits this far below the swing low.
    pub swing_low_buffer_pct: f64,
    /// Position value cap as a share of portfolio value.
    pub max_position_pct: f64,
    pub target_gains_pct: [f64; 3],
    pub min_reward_risk: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            portfolio_value: 100_000.0,
            risk_per_trade_pct: 1.0,
            entry_buffer_pct: 1.0,
            extended_pct: 5.0,
            stop_pct: 7.0,
            swing_low_buffer_pct: 2.0,
            max_position_pct: 20.0,
            target_gains_pct: [20.0, 35.0, 50.0],
            min_reward_risk: 2.0,
        }
    }
}

impl RiskConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        check_positive("risk.portfolio_value", self.portfolio_value)?;
        check_range("risk.risk_per_trade_pct", self.risk_per_trade_pct, 0.0, 1.0)?;
        check_range("risk.entry_buffer_pct", self.entry_buffer_pct, 0.0, 10.0)?;
        check_positive("risk.extended_pct", self.extended_pct)?;
        check_range("risk.stop_pct", self.stop_pct, 5.0, 10.0)?;
        check_range("risk.swing_low_buffer_pct", self.swing_low_buffer_pct, 0.0, 10.0)?;
        check_range("risk.max_position_pct", self.max_position_pct, 0.0, 100.0)?;
        let mut prev = 0.0;
        for gain in self.target_gains_pct {
            if !gain.is_finite() || gain <= prev {
                return Err(invalid("risk.target_gains_pct", "targets must be positive and ascending"));
            }
            prev = gain;
        }
        check_positive("risk.min_reward_risk", self.min_reward_risk)
    }
}

/// Component weights, anti-rule penalties and verdict thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    pub trend_weight: f64,
    pub base_weight: f64,
    pub breakout_weight: f64,
    pub risk_weight: f64,
    pub anti_rule_weight: f64,
    /// Cleanliness points lost per soft anti-rule violation.
    pub soft_violation_penalty: f64,
    /// Latest volume below ratio × 50-bar average is thin.
    pub thin_volume_ratio: f64,
    /// Maximum bonus points from fundamentals.
    pub fundamentals_max_bonus: f64,
    pub strong_buy_min: f64,
    pub buy_on_confirmation_min: f64,
    pub watch_min: f64,
    pub avoid_weak_min: f64,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            trend_weight: 0.40,
            base_weight: 0.25,
            breakout_weight: 0.20,
            risk_weight: 0.10,
            anti_rule_weight: 0.05,
            soft_violation_penalty: 25.0,
            thin_volume_ratio: 0.5,
            fundamentals_max_bonus: 5.0,
            strong_buy_min: 85.0,
            buy_on_confirmation_min: 60.0,
            watch_min: 40.0,
            avoid_weak_min: 16.0,
        }
    }
}

impl ConfidenceConfig {
    pub fn weight_sum(&self) -> f64 {
        self.trend_weight + self.base_weight + self.breakout_weight + self.risk_weight + self.anti_rule_weight
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (field, w) in [
            ("confidence.trend_weight", self.trend_weight),
            ("confidence.base_weight", self.base_weight),
            ("confidence.breakout_weight", self.breakout_weight),
            ("confidence.risk_weight", self.risk_weight),
            ("confidence.anti_rule_weight", self.anti_rule_weight),
        ] {
            check_range(field, w, 0.0, 1.0)?;
        }
        if (self.weight_sum() - 1.0).abs() > 1e-9 {
            return Err(invalid(
                "confidence",
                format!("component weights sum to {}, expected 1", self.weight_sum()),
            ));
        }
        check_range("confidence.soft_violation_penalty", self.soft_violation_penalty, 0.0, 100.0)?;
        check_range("confidence.thin_volume_ratio", self.thin_volume_ratio, 0.0, 1.0)?;
        check_range("confidence.fundamentals_max_bonus", self.fundamentals_max_bonus, 0.0, 100.0)?;
        let tiers = [
            self.strong_buy_min,
            self.buy_on_confirmation_min,
            self.watch_min,
            self.avoid_weak_min,
        ];
        if tiers.windows(2).any(|w| w[0] <= w[1]) || self.avoid_weak_min < 0.0 || self.strong_buy_min > 100.0 {
            return Err(invalid("confidence", "verdict thresholds must descend within [0, 100]"));
        }
        Ok(())
    }
}

/// Exit state machine thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExitConfig {
    /// Unrealized gain that triggers the one-time scale-out.
    pub partial_gain_pct: f64,
    /// Fraction of shares sold on scale-out (0.25–0.5).
    pub scale_out_fraction: f64,
    /// Close below SMA50 is a breakdown when volume ≥ ratio × average.
    pub sma50_volume_ratio: f64,
    pub climax_volume_ratio: f64,
    pub climax_drop_pct: f64,
    /// Consecutive closes below the pivot that count as a failed breakout.
    pub pivot_failure_bars: usize,
    /// Trailing stop sits this far below a new higher swing low.
    pub swing_low_buffer_pct: f64,
    /// RS score drop from qualification that forces an exit.
    pub rs_drop_points: f64,
}

impl Default for ExitConfig {
    fn default() -> Self {
        Self {
            partial_gain_pct: 20.0,
            scale_out_fraction: 0.33,
            sma50_volume_ratio: 1.2,
            climax_volume_ratio: 2.0,
            climax_drop_pct: 5.0,
            pivot_failure_bars: 3,
            swing_low_buffer_pct: 2.0,
            rs_drop_points: 15.0,
        }
    }
}

impl ExitConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        check_positive("exit.partial_gain_pct", self.partial_gain_pct)?;
        check_range("exit.scale_out_fraction", self.scale_out_fraction, 0.25, 0.5)?;
        check_positive("exit.sma50_volume_ratio", self.sma50_volume_ratio)?;
        check_positive("exit.climax_volume_ratio", self.climax_volume_ratio)?;
        check_positive("exit.climax_drop_pct", self.climax_drop_pct)?;
        if self.pivot_failure_bars == 0 {
            return Err(invalid("exit.pivot_failure_bars", "must be at least 1"));
        }
        check_range("exit.swing_low_buffer_pct", self.swing_low_buffer_pct, 0.0, 10.0)?;
        check_positive("exit.rs_drop_points", self.rs_drop_points)
    }
}
