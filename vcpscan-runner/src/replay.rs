//! Replay a held position through historical bars.
//!
//! Bars dated on or before `opened_at` seed the monitor's history; every
//! later bar goes through the exit state machine in date order until the
//! position reaches a terminal state or the bars run out.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;
use vcpscan_core::domain::{ClosedPosition, Position, Series};
use vcpscan_core::exit::{PositionMonitor, Transition};
use vcpscan_core::EngineConfig;

use crate::error::ScanError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayOutcome {
    pub position: Position,
    pub transitions: Vec<Transition>,
    pub bars_replayed: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed: Option<ClosedPosition>,
}

pub fn load_position(path: &Path) -> Result<Position, ScanError> {
    let text = std::fs::read_to_string(path).map_err(|e| ScanError::io(path, e))?;
    Ok(serde_json::from_str(&text)?)
}

pub fn replay_position(
    position: Position,
    series: &Series,
    benchmark: Option<Series>,
    config: &EngineConfig,
) -> Result<ReplayOutcome, ScanError> {
    let split = series.bars().partition_point(|b| b.date <= position.opened_at);
    if split == 0 {
        return Err(ScanError::Invalid(format!(
            "{}: no bars on or before entry date {}",
            position.symbol, position.opened_at
        )));
    }
    let history = Series::new(series.symbol(), series.bars()[..split].to_vec())?;
    let symbol = position.symbol.clone();
    let mut monitor = PositionMonitor::new(position, &history, benchmark, config);

    let mut bars_replayed = 0;
    for bar in &series.bars()[split..] {
        if monitor.is_terminal() {
            break;
        }
        monitor.on_bar(*bar)?;
        bars_replayed += 1;
    }

    let transitions = monitor.transitions().to_vec();
    let position = monitor.into_position();
    info!(
        symbol = %symbol,
        bars_replayed,
        state = ?position.state,
        shares = position.shares,
        "replay finished"
    );
    let closed = position.clone().archive().ok();
    Ok(ReplayOutcome {
        position,
        transitions,
        bars_replayed,
        closed,
    })
}
