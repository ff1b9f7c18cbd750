//! Open position bookkeeping driven by the exit state machine.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::risk::RiskPlan;

/// Lifecycle state of a position.
///
/// `StoppedOut` and `Closed` are terminal. `PartialExit` marks the bar on
/// which a scale-out happened; the position returns to `Open` on the next bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionState {
    Open,
    PartialExit,
    StoppedOut,
    Closed,
}

impl PositionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PositionState::StoppedOut | PositionState::Closed)
    }
}

/// Why shares left the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    BelowSma50OnVolume,
    ClimacticReversal,
    PivotNotReclaimed,
    SwingLowBroken,
    RelativeStrengthCollapse,
    ScaleOut,
}

/// One exit execution recorded against the position (at the bar close).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitFill {
    pub date: NaiveDate,
    pub shares: u64,
    pub price: f64,
    pub reason: ExitReason,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub entry_price: f64,
    pub stop_loss_price: f64,
    pub initial_shares: u64,
    pub shares: u64,
    pub opened_at: NaiveDate,
    /// Breakout pivot the position was bought through, if known.
    pub pivot_price: Option<f64>,
    /// RS score at qualification time, used to detect a sharp RS drop.
    pub qualification_rs: Option<f64>,
    pub partial_exit_taken: bool,
    pub state: PositionState,
    pub exits: Vec<ExitFill>,
}

impl Position {
    pub fn new(
        symbol: impl Into<String>,
        entry_price: f64,
        stop_loss_price: f64,
        shares: u64,
        opened_at: NaiveDate,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            entry_price,
            stop_loss_price,
            initial_shares: shares,
            shares,
            opened_at,
            pivot_price: None,
            qualification_rs: None,
            partial_exit_taken: false,
            state: PositionState::Open,
            exits: Vec::new(),
        }
    }

    /// Open a position from an acted-upon risk plan.
    pub fn from_plan(
        symbol: impl Into<String>,
        plan: &RiskPlan,
        opened_at: NaiveDate,
        qualification_rs: Option<f64>,
    ) -> Self {
        let mut position = Self::new(
            symbol,
            plan.entry_price,
            plan.stop_loss_price,
            plan.position_size,
            opened_at,
        );
        position.pivot_price = Some(plan.pivot_price);
        position.qualification_rs = qualification_rs;
        position
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Unrealized gain of `price` versus entry, as a fraction.
    pub fn gain_pct(&self, price: f64) -> f64 {
        (price - self.entry_price) / self.entry_price
    }

    pub fn realized_pnl(&self) -> f64 {
        self.exits
            .iter()
            .map(|f| f.shares as f64 * (f.price - self.entry_price))
            .sum()
    }

    pub(crate) fn record_exit(&mut self, date: NaiveDate, shares: u64, price: f64, reason: ExitReason) {
        let shares = shares.min(self.shares);
        self.shares -= shares;
        self.exits.push(ExitFill {
            date,
            shares,
            price,
            reason,
        });
    }

    /// Archive a terminal position. Returns the position unchanged if it is
    /// still live.
    pub fn archive(self) -> Result<ClosedPosition, Position> {
        if !self.is_terminal() {
            return Err(self);
        }
        let closed_at = self
            .exits
            .last()
            .map(|f| f.date)
            .unwrap_or(self.opened_at);
        let realized_pnl = self.realized_pnl();
        Ok(ClosedPosition {
            realized_pnl,
            closed_at,
            position: self,
        })
    }
}

/// A fully closed position kept for the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedPosition {
    pub position: Position,
    pub closed_at: NaiveDate,
    pub realized_pnl: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn new_position_is_open() {
        let pos = Position::new("AAA", 100.0, 93.0, 100, date(1));
        assert_eq!(pos.state, PositionState::Open);
        assert_eq!(pos.shares, 100);
        assert!(!pos.partial_exit_taken);
        assert!((pos.gain_pct(120.0) - 0.20).abs() < 1e-12);
    }

    #[test]
    fn record_exit_reduces_shares_and_tracks_pnl() {
        let mut pos = Position::new("AAA", 100.0, 93.0, 100, date(1));
        pos.record_exit(date(5), 25, 120.0, ExitReason::ScaleOut);
        assert_eq!(pos.shares, 75);
        pos.record_exit(date(9), 500, 110.0, ExitReason::SwingLowBroken);
        assert_eq!(pos.shares, 0);
        assert_eq!(pos.exits[1].shares, 75);
        assert!((pos.realized_pnl() - (25.0 * 20.0 + 75.0 * 10.0)).abs() < 1e-9);
    }

    #[test]
    fn archive_requires_terminal_state() {
        let pos = Position::new("AAA", 100.0, 93.0, 10, date(1));
        let pos = pos.archive().unwrap_err();
        let mut pos = pos;
        pos.record_exit(date(2), 10, 92.0, ExitReason::StopLoss);
        pos.state = PositionState::StoppedOut;
        let closed = pos.archive().unwrap();
        assert_eq!(closed.closed_at, date(2));
        assert!((closed.realized_pnl + 80.0).abs() < 1e-9);
    }
}
