//! Bar-by-bar position monitoring.

use tracing::warn;

use super::machine::{BarSnapshot, ExitStateMachine, Transition};
use crate::config::EngineConfig;
use crate::domain::{ClosedPosition, Position, PriceBar, Series};
use crate::error::AnalysisError;
use crate::indicators::rolling_mean;
use crate::relative_strength::relative_strength;
use crate::swing::{SwingKind, SwingTracker};

const SMA_PERIOD: usize = 50;
const VOLUME_PERIOD: usize = 50;

/// Drives one position through new bars, keeping its own copy of the bar
/// history so moving averages, swings and RS stay current.
#[derive(Debug, Clone)]
pub struct PositionMonitor {
    position: Position,
    machine: ExitStateMachine,
    tracker: SwingTracker,
    bars: Vec<PriceBar>,
    benchmark: Option<Series>,
    transitions: Vec<Transition>,
}

impl PositionMonitor {
    /// `history` must end at or before the first bar passed to
    /// [`on_bar`](Self::on_bar).
    pub fn new(position: Position, history: &Series, benchmark: Option<Series>, config: &EngineConfig) -> Self {
        let mut tracker = SwingTracker::new(config.swing.window);
        for bar in history.bars() {
            tracker.push(*bar);
        }
        Self {
            machine: ExitStateMachine::new(config.exit.clone(), &position),
            position,
            tracker,
            bars: history.bars().to_vec(),
            benchmark,
            transitions: Vec::new(),
        }
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn is_terminal(&self) -> bool {
        self.position.is_terminal()
    }

    /// Apply the next daily bar.
    pub fn on_bar(&mut self, bar: PriceBar) -> Result<Transition, AnalysisError> {
        let index = self.bars.len();
        if let Some(reason) = bar.sanity_issue() {
            return Err(AnalysisError::MalformedBar { index, reason });
        }
        if let Some(last) = self.bars.last() {
            if bar.date <= last.date {
                warn!(symbol = %self.position.symbol, date = %bar.date, last = %last.date, "out-of-order bar rejected");
                return Err(AnalysisError::MalformedBar {
                    index,
                    reason: format!("date {} does not follow {}", bar.date, last.date),
                });
            }
        }

        let prev_close = self.bars.last().map(|b| b.close);
        let avg_volume_50 = self.average_volume_before(index);
        self.bars.push(bar);

        let new_swing_low = self
            .tracker
            .push(bar)
            .map(|u| u.point())
            .filter(|p| p.kind == SwingKind::Low)
            .map(|p| p.price);

        let snapshot = BarSnapshot {
            date: bar.date,
            close: bar.close,
            volume: bar.volume,
            prev_close,
            sma_50: self.sma_50(),
            avg_volume_50,
            rs_score: relative_strength(&self.bars, index, self.benchmark.as_ref())
                .ok()
                .map(|rs| rs.score),
            recent_swing_low: self.tracker.latest_low().map(|s| s.price),
            new_swing_low,
        };

        let transition = self.machine.step(&mut self.position, &snapshot);
        self.transitions.push(transition.clone());
        Ok(transition)
    }

    /// Archive the position once it is terminal.
    pub fn archive(self) -> Result<ClosedPosition, Position> {
        self.position.archive()
    }

    pub fn into_position(self) -> Position {
        self.position
    }

    fn sma_50(&self) -> Option<f64> {
        let closes: Vec<f64> = self.bars.iter().rev().take(SMA_PERIOD).map(|b| b.close).collect();
        rolling_mean(&closes, SMA_PERIOD).last().copied().filter(|v| !v.is_nan())
    }

    fn average_volume_before(&self, index: usize) -> Option<f64> {
        if index < VOLUME_PERIOD {
            return None;
        }
        let window = &self.bars[index - VOLUME_PERIOD..index];
        Some(window.iter().map(|b| b.volume as f64).sum::<f64>() / VOLUME_PERIOD as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Analyzer;
    use crate::data::FundamentalsLookup;
    use crate::domain::{ExitReason, PositionState};
    use crate::testutil::{bar, benchmark, day, vcp_series};

    fn open_vcp() -> PositionMonitor {
        let series = vcp_series();
        let bench = benchmark(300);
        let analyzer = Analyzer::new(EngineConfig::default()).unwrap();
        let decision = analyzer.analyze(&series, Some(&bench), &FundamentalsLookup::Unavailable);
        let plan = decision.risk.plan().unwrap();
        let rs = decision.relative_strength.as_ref().map(|r| r.score);
        let position = Position::from_plan("VCP", plan, day(299), rs);
        PositionMonitor::new(position, &series, None, analyzer.config())
    }

    #[test]
    fn close_below_stop_stops_out() {
        let mut monitor = open_vcp();
        let stop = monitor.position().stop_loss_price;
        assert!((stop - 89.70315).abs() < 1e-9);

        let t = monitor
            .on_bar(PriceBar::new(day(300), 95.0, 95.2, 88.8, 89.0, 1_500_000))
            .unwrap();
        assert_eq!(t.to, PositionState::StoppedOut);
        assert_eq!(t.reason, Some(ExitReason::StopLoss));
        assert_eq!(monitor.position().shares, 0);
        assert!(!monitor.position().partial_exit_taken);

        let closed = monitor.archive().unwrap();
        assert_eq!(closed.closed_at, day(300));
        assert!(closed.realized_pnl < 0.0);
    }

    #[test]
    fn steady_advance_scales_out_at_twenty_percent() {
        let mut monitor = open_vcp();
        let mut partial_bar = None;
        for k in 0..10 {
            let close = 97.5 + 2.0 * (k + 1) as f64;
            let t = monitor.on_bar(bar(300 + k, close, 0.5, 800_000)).unwrap();
            if t.to == PositionState::PartialExit {
                partial_bar = Some(k);
                assert_eq!(t.shares_sold, 48);
            } else {
                assert_eq!(t.to, PositionState::Open, "bar {k}");
            }
        }
        assert_eq!(partial_bar, Some(9));
        let position = monitor.position();
        assert_eq!(position.shares, 100);
        assert!((position.stop_loss_price - position.entry_price).abs() < 1e-9);

        let t = monitor.on_bar(bar(310, 118.0, 0.5, 800_000)).unwrap();
        assert_eq!(t.to, PositionState::Open);
        assert_eq!(monitor.transitions().len(), 11);
    }

    #[test]
    fn rejects_out_of_order_and_insane_bars() {
        let mut monitor = open_vcp();
        let stale = monitor.on_bar(bar(299, 97.0, 0.5, 800_000)).unwrap_err();
        assert!(matches!(stale, AnalysisError::MalformedBar { index: 300, .. }));

        let inverted = PriceBar::new(day(300), 97.0, 96.0, 98.0, 97.0, 800_000);
        assert!(matches!(
            monitor.on_bar(inverted),
            Err(AnalysisError::MalformedBar { .. })
        ));
        assert!(monitor.transitions().is_empty());
        assert_eq!(monitor.position().state, PositionState::Open);
    }
}
