//! Domain types: bars, validated series, positions.

pub mod bar;
pub mod position;
pub mod series;

pub use bar::PriceBar;
pub use position::{ClosedPosition, ExitFill, ExitReason, Position, PositionState};
pub use series::Series;
