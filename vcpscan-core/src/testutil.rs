//! Shared synthetic fixtures for unit tests.

use chrono::{Duration, NaiveDate};

use crate::domain::{PriceBar, Series};

pub fn day(i: usize) -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 2).unwrap() + Duration::days(i as i64)
}

/// Piecewise-linear close path through `(index, close)` knots.
pub fn piecewise(knots: &[(usize, f64)]) -> Vec<f64> {
    let last = knots.last().map(|k| k.0).unwrap_or(0);
    let mut out = vec![0.0; last + 1];
    out[0] = knots[0].1;
    for pair in knots.windows(2) {
        let ((i0, v0), (i1, v1)) = (pair[0], pair[1]);
        for (i, slot) in out.iter_mut().enumerate().take(i1 + 1).skip(i0) {
            *slot = v0 + (v1 - v0) * (i - i0) as f64 / (i1 - i0) as f64;
        }
    }
    out
}

pub fn bar(i: usize, close: f64, spread: f64, volume: u64) -> PriceBar {
    PriceBar::new(day(i), close, close + spread, close - spread, close, volume)
}

/// 300 bars: a long advance, three tightening contractions (20.9%, 11.0%,
/// 4.2%) on drying volume, a quiet drift and a breakout bar on heavy volume.
/// Pivot 95.5, swing lows 79.5 / 85.9 / 91.5.
pub fn vcp_bars() -> Vec<PriceBar> {
    let closes = piecewise(&[
        (0, 50.0),
        (205, 100.0),
        (220, 80.0),
        (235, 96.0),
        (245, 86.4),
        (255, 95.0),
        (262, 92.0),
        (298, 94.8),
    ]);
    let mut bars: Vec<PriceBar> = closes
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let spread = if i <= 262 { 0.5 } else { 0.15 };
            let volume = match i {
                0..=204 => 1_000_000,
                205..=220 => 1_200_000,
                221..=234 => 1_000_000,
                235..=245 => 900_000,
                246..=254 => 1_000_000,
                255..=262 => 600_000,
                _ => 700_000,
            };
            bar(i, c, spread, volume)
        })
        .collect();
    bars.push(PriceBar::new(day(299), 95.0, 97.5, 94.9, 97.5, 2_500_000));
    bars
}

pub fn vcp_series() -> Series {
    Series::new("VCP", vcp_bars()).unwrap()
}

/// Slowly rising benchmark aligned with [`day`].
pub fn benchmark(n: usize) -> Series {
    let bars = (0..n).map(|i| bar(i, 100.0 + 0.01 * i as f64, 0.2, 5_000_000)).collect();
    Series::new("BENCH", bars).unwrap()
}
