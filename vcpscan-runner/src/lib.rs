//! vcpscan runner: scan orchestration on top of `vcpscan-core`.
//!
//! This crate provides:
//! - TOML scan configuration wrapping the engine configuration
//! - CSV market data and JSON fundamentals providers
//! - Parallel multi-symbol scanning with per-symbol failure isolation
//! - Position replay through the exit state machine
//! - JSON and CSV export

pub mod config;
pub mod data_loader;
pub mod error;
pub mod export;
pub mod replay;
pub mod scan;

#[cfg(test)]
mod testutil;

pub use config::ScanConfig;
pub use data_loader::{write_bars_csv, CsvProvider, JsonFundamentalsProvider};
pub use error::ScanError;
pub use export::{export_json, export_summary_csv, export_transitions_csv, import_json, save_report};
pub use replay::{load_position, replay_position, ReplayOutcome};
pub use scan::{run_scan, ScanOutcome, ScanReport, Scanner};
