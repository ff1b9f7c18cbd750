//! Per-bar exit transitions.
//!
//! Priority on every bar: stop-loss, then breakdown exits, then the one-time
//! scale-out, then stop trailing. `StoppedOut` and `Closed` absorb every
//! later bar. `PartialExit` lasts one bar and returns to `Open`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::ratchet::StopRatchet;
use crate::config::ExitConfig;
use crate::domain::{ExitReason, Position, PositionState};

/// Everything the machine needs to know about one bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarSnapshot {
    pub date: NaiveDate,
    pub close: f64,
    pub volume: u64,
    pub prev_close: Option<f64>,
    pub sma_50: Option<f64>,
    /// 50-bar average volume ending at the prior bar.
    pub avg_volume_50: Option<f64>,
    pub rs_score: Option<f64>,
    /// Most recent confirmed swing low.
    pub recent_swing_low: Option<f64>,
    /// Swing low confirmed on this bar, if any.
    pub new_swing_low: Option<f64>,
}

impl BarSnapshot {
    pub fn new(date: NaiveDate, close: f64, volume: u64) -> Self {
        Self {
            date,
            close,
            volume,
            prev_close: None,
            sma_50: None,
            avg_volume_50: None,
            rs_score: None,
            recent_swing_low: None,
            new_swing_low: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub date: NaiveDate,
    pub from: PositionState,
    pub to: PositionState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<ExitReason>,
    pub shares_sold: u64,
    /// Stop in force after the bar.
    pub stop_loss_price: f64,
}

impl Transition {
    pub fn is_change(&self) -> bool {
        self.from != self.to || self.shares_sold > 0
    }
}

/// Per-position exit rules applied one bar at a time.
///
/// Rules are checked in order: stop loss, breakdown signals, the one-time
/// scale-out, then the trailing stop update from a new swing low. The stop
/// never moves down.
#[derive(Debug, Clone)]
pub struct ExitStateMachine {
    config: ExitConfig,
    ratchet: StopRatchet,
    closes_below_pivot: usize,
}

impl ExitStateMachine {
    pub fn new(config: ExitConfig, position: &Position) -> Self {
        Self {
            config,
            ratchet: StopRatchet::new(position.stop_loss_price),
            closes_below_pivot: 0,
        }
    }

    pub fn stop(&self) -> f64 {
        self.ratchet.level()
    }

    /// Apply one bar to `position`.
    pub fn step(&mut self, position: &mut Position, snap: &BarSnapshot) -> Transition {
        let from = position.state;
        if from.is_terminal() {
            return self.transition(position, snap.date, from, None, 0);
        }
        if from == PositionState::PartialExit {
            position.state = PositionState::Open;
        }

        match position.pivot_price {
            Some(pivot) if snap.close < pivot => self.closes_below_pivot += 1,
            _ => self.closes_below_pivot = 0,
        }

        if snap.close < position.stop_loss_price {
            return self.exit_all(position, snap, PositionState::StoppedOut, ExitReason::StopLoss, from);
        }

        if let Some(reason) = self.breakdown(position, snap) {
            return self.exit_all(position, snap, PositionState::Closed, reason, from);
        }

        let partial_gain = self.config.partial_gain_pct / 100.0;
        if !position.partial_exit_taken && position.shares >= 2 && position.gain_pct(snap.close) >= partial_gain {
            let target = (position.shares as f64 * self.config.scale_out_fraction).floor() as u64;
            let sell = target.clamp(1, position.shares - 1);
            position.record_exit(snap.date, sell, snap.close, ExitReason::ScaleOut);
            position.partial_exit_taken = true;
            position.state = PositionState::PartialExit;
            position.stop_loss_price = self.ratchet.apply(position.entry_price);
            info!(
                symbol = %position.symbol,
                shares_sold = sell,
                stop = position.stop_loss_price,
                "scale-out"
            );
            return self.transition(position, snap.date, from, Some(ExitReason::ScaleOut), sell);
        }

        if let Some(low) = snap.new_swing_low {
            let proposed = low * (1.0 - self.config.swing_low_buffer_pct / 100.0);
            let before = position.stop_loss_price;
            position.stop_loss_price = self.ratchet.apply(proposed);
            if position.stop_loss_price > before {
                debug!(symbol = %position.symbol, from = before, to = position.stop_loss_price, "stop raised");
            }
        }

        self.transition(position, snap.date, from, None, 0)
    }

    fn breakdown(&self, position: &Position, snap: &BarSnapshot) -> Option<ExitReason> {
        let cfg = &self.config;
        let volume = snap.volume as f64;

        if let (Some(sma), Some(avg)) = (snap.sma_50, snap.avg_volume_50) {
            if snap.close < sma && volume >= cfg.sma50_volume_ratio * avg {
                return Some(ExitReason::BelowSma50OnVolume);
            }
        }

        if let (Some(prev), Some(avg)) = (snap.prev_close, snap.avg_volume_50) {
            let drop_pct = (prev - snap.close) / prev * 100.0;
            if volume >= cfg.climax_volume_ratio * avg && drop_pct >= cfg.climax_drop_pct {
                return Some(ExitReason::ClimacticReversal);
            }
        }

        if self.closes_below_pivot >= cfg.pivot_failure_bars {
            return Some(ExitReason::PivotNotReclaimed);
        }

        if let Some(low) = snap.recent_swing_low {
            if snap.close < low {
                return Some(ExitReason::SwingLowBroken);
            }
        }

        if let (Some(qualified), Some(now)) = (position.qualification_rs, snap.rs_score) {
            if now <= qualified - cfg.rs_drop_points {
                return Some(ExitReason::RelativeStrengthCollapse);
            }
        }

        None
    }

    fn exit_all(
        &mut self,
        position: &mut Position,
        snap: &BarSnapshot,
        to: PositionState,
        reason: ExitReason,
        from: PositionState,
    ) -> Transition {
        let shares = position.shares;
        position.record_exit(snap.date, shares, snap.close, reason);
        position.state = to;
        info!(symbol = %position.symbol, ?reason, close = snap.close, ?to, "position exited");
        self.transition(position, snap.date, from, Some(reason), shares)
    }

    fn transition(
        &self,
        position: &Position,
        date: NaiveDate,
        from: PositionState,
        reason: Option<ExitReason>,
        shares_sold: u64,
    ) -> Transition {
        Transition {
            date,
            from,
            to: position.state,
            reason,
            shares_sold,
            stop_loss_price: position.stop_loss_price,
        }
    }
}
