//! vcpscan core: trend-template qualification, volatility-contraction base
//! detection, breakout validation, risk planning and position exits.
//!
//! This crate is pure computation:
//! - Domain types (bars, validated series, positions)
//! - Indicators and the per-series [`IndicatorSet`]
//! - Component analyzers (trend, swings, base, breakout, risk, anti-rules)
//! - Confidence aggregation into a [`Decision`]
//! - The exit state machine and [`exit::PositionMonitor`]
//!
//! Data arrives through the [`data::MarketDataProvider`] and
//! [`data::FundamentalsProvider`] traits; nothing here performs I/O.

pub mod analyzer;
pub mod anti_rules;
pub mod base;
pub mod breakout;
pub mod confidence;
pub mod config;
pub mod data;
pub mod decision;
pub mod domain;
pub mod error;
pub mod exit;
pub mod fundamentals;
pub mod indicator_set;
pub mod indicators;
pub mod relative_strength;
pub mod risk;
pub mod swing;
pub mod trend;

#[cfg(test)]
mod testutil;

pub use analyzer::Analyzer;
pub use confidence::Verdict;
pub use config::{ConfigError, EngineConfig};
pub use decision::Decision;
pub use domain::{Position, PositionState, PriceBar, Series};
pub use error::AnalysisError;
pub use indicator_set::IndicatorSet;
