//! Swing point detection.
//!
//! A bar is a swing HIGH when its high is the maximum of the highs within
//! `window` bars on each side, a swing LOW when its low is the minimum of the
//! lows. A swing at index `i` is therefore confirmed once bar `i + window`
//! arrives. Consecutive swings of the same kind are merged, keeping the more
//! extreme price (the earlier swing on ties), so the output alternates.
//!
//! A bar that is both the high and the low of its window is an outside bar
//! and takes the kind opposite to the previous swing. When another bar in the
//! window ties both extremes as well, no swing is emitted.

use std::collections::VecDeque;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::PriceBar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SwingKind {
    High,
    Low,
}

impl SwingKind {
    pub fn opposite(self) -> Self {
        match self {
            SwingKind::High => SwingKind::Low,
            SwingKind::Low => SwingKind::High,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwingPoint {
    pub index: usize,
    pub date: NaiveDate,
    pub price: f64,
    pub kind: SwingKind,
}

/// What a [`SwingTracker::push`] changed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SwingUpdate {
    /// A new swing was appended.
    Confirmed(SwingPoint),
    /// The last swing was replaced by a more extreme one of the same kind.
    Replaced(SwingPoint),
}

impl SwingUpdate {
    pub fn point(&self) -> SwingPoint {
        match *self {
            SwingUpdate::Confirmed(p) | SwingUpdate::Replaced(p) => p,
        }
    }
}

/// Incremental swing detector fed one bar at a time.
#[derive(Debug, Clone)]
pub struct SwingTracker {
    window: usize,
    buffer: VecDeque<PriceBar>,
    next_index: usize,
    swings: Vec<SwingPoint>,
}

impl SwingTracker {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            buffer: VecDeque::with_capacity(2 * window + 1),
            next_index: 0,
            swings: Vec::new(),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn swings(&self) -> &[SwingPoint] {
        &self.swings
    }

    pub fn into_swings(self) -> Vec<SwingPoint> {
        self.swings
    }

    pub fn bars_seen(&self) -> usize {
        self.next_index
    }

    pub fn latest_low(&self) -> Option<&SwingPoint> {
        self.swings.iter().rev().find(|s| s.kind == SwingKind::Low)
    }

    pub fn latest_high(&self) -> Option<&SwingPoint> {
        self.swings.iter().rev().find(|s| s.kind == SwingKind::High)
    }

    /// Feed the next bar. Returns the swing confirmed by this bar, if any.
    pub fn push(&mut self, bar: PriceBar) -> Option<SwingUpdate> {
        let span = 2 * self.window + 1;
        if self.buffer.len() == span {
            self.buffer.pop_front();
        }
        self.buffer.push_back(bar);
        self.next_index += 1;

        if self.buffer.len() < span {
            return None;
        }

        let center = self.buffer[self.window];
        let center_index = self.next_index - 1 - self.window;
        let max_high = self.buffer.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
        let min_low = self.buffer.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
        let is_high = center.high >= max_high;
        let is_low = center.low <= min_low;

        let kind = match (is_high, is_low) {
            (true, true) => {
                let window = self.window;
                let others: Vec<&PriceBar> = self
                    .buffer
                    .iter()
                    .enumerate()
                    .filter_map(|(i, b)| (i != window).then_some(b))
                    .collect();
                let ties_high = others.iter().any(|b| b.high >= max_high);
                let ties_low = others.iter().any(|b| b.low <= min_low);
                // Inside a flat range the bar marks no turn.
                if max_high <= min_low || (ties_high && ties_low) {
                    return None;
                }
                self.swings
                    .last()
                    .map(|s| s.kind.opposite())
                    .unwrap_or(SwingKind::High)
            }
            (true, false) => SwingKind::High,
            (false, true) => SwingKind::Low,
            (false, false) => return None,
        };

        let point = SwingPoint {
            index: center_index,
            date: center.date,
            price: match kind {
                SwingKind::High => center.high,
                SwingKind::Low => center.low,
            },
            kind,
        };
        self.merge(point)
    }

    fn merge(&mut self, point: SwingPoint) -> Option<SwingUpdate> {
        match self.swings.last_mut() {
            Some(last) if last.kind == point.kind => {
                let more_extreme = match point.kind {
                    SwingKind::High => point.price > last.price,
                    SwingKind::Low => point.price < last.price,
                };
                if more_extreme {
                    *last = point;
                    Some(SwingUpdate::Replaced(point))
                } else {
                    None
                }
            }
            _ => {
                self.swings.push(point);
                Some(SwingUpdate::Confirmed(point))
            }
        }
    }
}

/// Batch swing location over a full bar history.
#[derive(Debug, Clone)]
pub struct SwingLocator {
    window: usize,
}

impl SwingLocator {
    pub fn new(window: usize) -> Self {
        Self { window }
    }

    pub fn locate(&self, bars: &[PriceBar]) -> Vec<SwingPoint> {
        let mut tracker = SwingTracker::new(self.window);
        for bar in bars {
            tracker.push(*bar);
        }
        tracker.into_swings()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bars_from(points: &[(f64, f64)]) -> Vec<PriceBar> {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        points
            .iter()
            .enumerate()
            .map(|(i, &(high, low))| {
                let mid = (high + low) / 2.0;
                PriceBar::new(base + chrono::Duration::days(i as i64), mid, high, low, mid, 1000)
            })
            .collect()
    }

    /// Zig-zag closes with a fixed half-spread.
    fn zigzag(closes: &[f64]) -> Vec<PriceBar> {
        let pts: Vec<(f64, f64)> = closes.iter().map(|&c| (c + 0.5, c - 0.5)).collect();
        bars_from(&pts)
    }

    fn path(segments: &[(f64, usize)], start: f64) -> Vec<f64> {
        let mut out = vec![start];
        let mut last = start;
        for &(target, steps) in segments {
            for s in 1..=steps {
                out.push(last + (target - last) * s as f64 / steps as f64);
            }
            last = target;
        }
        out
    }

    #[test]
    fn detects_alternating_swings() {
        // Peak at 10, trough at 20, peak at 30, trough at 40.
        let closes = path(&[(110.0, 10), (90.0, 10), (105.0, 10), (95.0, 10), (100.0, 10)], 100.0);
        let swings = SwingLocator::new(5).locate(&zigzag(&closes));

        let summary: Vec<(usize, SwingKind)> = swings.iter().map(|s| (s.index, s.kind)).collect();
        assert_eq!(
            summary,
            vec![
                (10, SwingKind::High),
                (20, SwingKind::Low),
                (30, SwingKind::High),
                (40, SwingKind::Low),
            ]
        );
        assert!((swings[0].price - 110.5).abs() < 1e-9);
        assert!((swings[1].price - 89.5).abs() < 1e-9);
    }

    #[test]
    fn swing_confirmed_only_after_window_bars() {
        let closes = path(&[(110.0, 10), (100.0, 10)], 100.0);
        let bars = zigzag(&closes);
        let mut tracker = SwingTracker::new(5);
        for (i, bar) in bars.iter().enumerate() {
            let update = tracker.push(*bar);
            if i == 15 {
                assert_eq!(update.map(|u| u.point().index), Some(10));
            } else if i < 15 {
                assert!(update.is_none(), "unexpected swing at bar {i}");
            }
        }
    }

    #[test]
    fn same_kind_swings_merge_to_more_extreme() {
        let mut tracker = SwingTracker::new(2);
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let high = |i: usize, price: f64| SwingPoint {
            index: i,
            date: date + chrono::Duration::days(i as i64),
            price,
            kind: SwingKind::High,
        };
        assert!(matches!(tracker.merge(high(3, 10.0)), Some(SwingUpdate::Confirmed(_))));
        // Lower high is dropped.
        assert_eq!(tracker.merge(high(6, 9.0)), None);
        // Equal high keeps the earlier swing.
        assert_eq!(tracker.merge(high(8, 10.0)), None);
        assert!(matches!(tracker.merge(high(9, 11.0)), Some(SwingUpdate::Replaced(_))));
        assert_eq!(tracker.swings().len(), 1);
        assert_eq!(tracker.swings()[0].index, 9);
    }

    #[test]
    fn outside_bar_takes_opposite_of_previous() {
        // Bar 8 is an outside bar dominating its whole window.
        let mut pts = vec![(101.0, 99.0); 14];
        pts[2] = (100.5, 97.0);
        pts[5] = (103.0, 99.5);
        pts[8] = (105.0, 95.0);
        let swings = SwingLocator::new(2).locate(&bars_from(&pts));

        let summary: Vec<(usize, SwingKind)> = swings.iter().map(|s| (s.index, s.kind)).collect();
        assert_eq!(summary, vec![(2, SwingKind::Low), (5, SwingKind::High), (8, SwingKind::Low)]);
        assert!((swings[2].price - 95.0).abs() < 1e-9);
    }

    #[test]
    fn flat_bars_yield_no_swings() {
        let bars = bars_from(&[(101.0, 99.0); 30]);
        assert!(SwingLocator::new(5).locate(&bars).is_empty());

        let mut tracker = SwingTracker::new(5);
        assert!(bars.iter().all(|b| tracker.push(*b).is_none()));
    }

    #[test]
    fn flat_range_after_a_swing_adds_nothing() {
        // One spike high, then the range goes flat again.
        let mut pts = vec![(101.0, 99.0); 30];
        pts[10] = (104.0, 99.5);
        let swings = SwingLocator::new(3).locate(&bars_from(&pts));

        // Only windows that see the spike produce swings.
        let summary: Vec<(usize, SwingKind)> = swings.iter().map(|s| (s.index, s.kind)).collect();
        assert_eq!(summary, vec![(7, SwingKind::Low), (10, SwingKind::High), (11, SwingKind::Low)]);
    }

    #[test]
    fn too_few_bars_yield_nothing() {
        let bars = zigzag(&[100.0, 101.0, 102.0]);
        assert!(SwingLocator::new(5).locate(&bars).is_empty());
    }

    #[test]
    fn batch_equals_incremental() {
        let closes = path(&[(120.0, 15), (100.0, 12), (115.0, 9), (108.0, 7), (118.0, 8)], 100.0);
        let bars = zigzag(&closes);
        let batch = SwingLocator::new(3).locate(&bars);
        let mut tracker = SwingTracker::new(3);
        for bar in &bars {
            tracker.push(*bar);
        }
        assert_eq!(batch, tracker.swings());
        assert!(batch.windows(2).all(|w| w[0].kind != w[1].kind));
    }
}
