//! Domain types for swingtrail.

pub mod action;
pub mod bar;
pub mod equity;
pub mod ids;
pub mod position;
pub mod trade;

pub use action::Action;
pub use bar::Bar;
pub use equity::EquityPoint;
pub use ids::RunId;
pub use position::{Position, PositionId, PositionSide, StopSource};
pub use trade::{ExitReason, Trade};
