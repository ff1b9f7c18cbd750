//! Position exit management.
//!
//! [`ExitStateMachine`] applies the per-bar transition rules to a
//! [`Position`](crate::domain::Position); [`PositionMonitor`] feeds it
//! snapshots built from the bar history in strict date order.

pub mod machine;
pub mod monitor;
pub mod ratchet;

pub use machine::{BarSnapshot, ExitStateMachine, Transition};
pub use monitor::PositionMonitor;
pub use ratchet::StopRatchet;
