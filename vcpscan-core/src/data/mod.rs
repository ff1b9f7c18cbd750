//! Collaborator contracts for market data and fundamentals.
//!
//! The engine never fetches anything itself. Callers supply a
//! [`MarketDataProvider`] (and optionally a [`FundamentalsProvider`]); any
//! provider error aborts that symbol's analysis. There is no fallback to
//! generated data.

pub mod provider;

pub use provider::{DataError, FundamentalsLookup, FundamentalsProvider, MarketDataProvider};
